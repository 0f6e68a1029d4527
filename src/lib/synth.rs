//Turns the flips of the 8 canonical data patterns into a per-bit, 12 phase
//alternation schedule for both aggressor rows
//Every victim bit gets a 4 bit flip signature (bit 3 - k set if merged base
//pattern k flipped it), which selects its alternation from ALTERNATION_TABLE:
//bits that already flip under some patterns get the other patterns, so
//hammering concentrates on the target bit. The target bit itself is forced to
//one pattern from TARGET_TABLE

use std::fmt;
use log::*;

use crate::config::*;
use crate::flip_checks::{BitPos, FlipMask};
use crate::patterns::{DataPattern, PatternTable};


//Which merged base patterns flipped one bit, pattern k has weight 2^(3-k)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlipSignature(u8);

impl FlipSignature {
  pub fn new(value: u8) -> FlipSignature {
    assert!(value < 16, "flip signature 0b{:b} has more than 4 bits", value);
    FlipSignature(value)
  }

  pub fn of(merged: &[FlipMask; BASE_PATTERNS], pos: BitPos) -> FlipSignature {
    let mut value = 0;
    for (k, mask) in merged.iter().enumerate() {
      if mask.is_set(pos) {
        value |= 1 << (BASE_PATTERNS - 1 - k);
      }
    }
    FlipSignature(value)
  }

  pub fn value(&self) -> u8 {
    self.0
  }

  pub fn flips_under(&self, pattern: usize) -> bool {
    (self.0 >> (BASE_PATTERNS - 1 - pattern)) & 1 == 1
  }
}

impl fmt::Display for FlipSignature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04b}", self.0)
  }
}

//The base patterns a bit cycles through over the 12 phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alternation {
  //phase i uses pattern i % 4
  Four,
  //groups of 3 phases
  Three([usize; 3]),
  Two([usize; 2]),
  One(usize),
}

impl Alternation {
  pub fn pattern_at(&self, phase: usize) -> usize {
    match self {
      Alternation::Four => phase % 4,
      Alternation::Three(p) => p[phase % 3],
      Alternation::Two(p) => p[phase % 2],
      Alternation::One(p) => *p,
    }
  }

  pub fn phases(&self) -> [usize; PHASES] {
    let mut phases = [0; PHASES];
    for (i, p) in phases.iter_mut().enumerate() {
      *p = self.pattern_at(i);
    }
    phases
  }
}

use Alternation::*;

//Indexed by the flip signature
//no or all patterns flip: cycle through all of them
//otherwise: cycle through the patterns that did NOT flip the bit
pub const ALTERNATION_TABLE: [Alternation; 16] = [
  /* 0000 */ Four,
  /* 0001 */ Three([0, 1, 2]),
  /* 0010 */ Three([0, 1, 3]),
  /* 0011 */ Two([0, 1]),
  /* 0100 */ Three([0, 2, 3]),
  /* 0101 */ Two([0, 2]),
  /* 0110 */ Two([0, 3]),
  /* 0111 */ One(0),
  /* 1000 */ Three([1, 2, 3]),
  /* 1001 */ Two([1, 2]),
  /* 1010 */ Two([1, 3]),
  /* 1011 */ One(1),
  /* 1100 */ Two([2, 3]),
  /* 1101 */ One(2),
  /* 1110 */ One(3),
  /* 1111 */ Four,
];

//Pattern dedicated to the target bit, indexed by its flip signature
//Among the patterns that flip it, P2 is preferred, then P0, P3 and P1
//None: use the default pattern of the pattern table
pub const TARGET_TABLE: [Option<usize>; 16] = [
  /* 0000 */ None,
  /* 0001 */ Some(3),
  /* 0010 */ Some(2),
  /* 0011 */ Some(2),
  /* 0100 */ Some(1),
  /* 0101 */ Some(3),
  /* 0110 */ Some(2),
  /* 0111 */ Some(2),
  /* 1000 */ Some(0),
  /* 1001 */ Some(0),
  /* 1010 */ Some(2),
  /* 1011 */ Some(2),
  /* 1100 */ Some(0),
  /* 1101 */ Some(0),
  /* 1110 */ Some(2),
  /* 1111 */ None,
];

pub fn alternation_for(signature: FlipSignature) -> Alternation {
  ALTERNATION_TABLE[signature.value() as usize]
}

pub fn target_pattern_for(signature: FlipSignature, table: &PatternTable) -> usize {
  TARGET_TABLE[signature.value() as usize].unwrap_or_else(|| table.default_index())
}

//Pattern i and i+4 only differ in the victim fill, OR them to get flips that
//do not depend on the victim content
pub fn merge_victim_agnostic(
  results: &[FlipMask; CANONICAL_PATTERNS]
) -> [FlipMask; BASE_PATTERNS] {
  [
    results[0].union(&results[4]),
    results[1].union(&results[5]),
    results[2].union(&results[6]),
    results[3].union(&results[7]),
  ]
}

//Aggressor fill values per phase and word
pub struct AlternationSchedule {
  aggressor1: Vec<[u64; ROW_WORDS]>,
  aggressor2: Vec<[u64; ROW_WORDS]>,
}

impl AlternationSchedule {
  pub fn new() -> AlternationSchedule {
    AlternationSchedule {
      aggressor1: vec![[0; ROW_WORDS]; PHASES],
      aggressor2: vec![[0; ROW_WORDS]; PHASES],
    }
  }

  //fill values of both aggressors in arg:phase
  pub fn phase(&self, phase: usize) -> (&[u64; ROW_WORDS], &[u64; ROW_WORDS]) {
    (&self.aggressor1[phase], &self.aggressor2[phase])
  }

  //bits of both aggressors at arg:pos in arg:phase
  pub fn bits_at(&self, phase: usize, pos: BitPos) -> (bool, bool) {
    (self.aggressor1[phase][pos.word] & pos.mask() != 0,
     self.aggressor2[phase][pos.word] & pos.mask() != 0)
  }

  //write the bit of arg:pattern at arg:pos into arg:phase, the other bits of
  //the word stay untouched
  fn set_bit(&mut self, phase: usize, pos: BitPos, pattern: &DataPattern) {
    let mask = pos.mask();
    let a1 = &mut self.aggressor1[phase][pos.word];
    *a1 = (*a1 & !mask) | (pattern.aggressor1 & mask);
    let a2 = &mut self.aggressor2[phase][pos.word];
    *a2 = (*a2 & !mask) | (pattern.aggressor2 & mask);
  }

  pub fn apply(&mut self, pos: BitPos, alternation: Alternation, table: &PatternTable) {
    for phase in 0..PHASES {
      self.set_bit(phase, pos, table.base(alternation.pattern_at(phase)));
    }
  }

  //all phases of both aggressors use arg:pattern at arg:pos
  pub fn force(&mut self, pos: BitPos, pattern: &DataPattern) {
    for phase in 0..PHASES {
      self.set_bit(phase, pos, pattern);
    }
  }
}

impl Default for AlternationSchedule {
  fn default() -> Self {
    AlternationSchedule::new()
  }
}

pub struct Synthesis {
  pub schedule: AlternationSchedule,
  pub target: BitPos,
  pub target_signature: FlipSignature,
  pub target_pattern: usize,
}

//Build the schedule from the flips of all canonical patterns (indexed like
//the pattern table) and dedicate the best known pattern to arg:target
pub fn synthesize(
  table: &PatternTable,
  results: &[FlipMask; CANONICAL_PATTERNS],
  target: BitPos
) -> Synthesis {
  let merged = merge_victim_agnostic(results);
  let mut schedule = AlternationSchedule::new();

  //every bit of every word gets all 12 phases written
  let mut histogram = [0u32; 16];
  for word in 0..ROW_WORDS {
    for bit in 0..64 {
      let pos = BitPos { word, bit };
      let signature = FlipSignature::of(&merged, pos);
      histogram[signature.value() as usize] += 1;
      schedule.apply(pos, alternation_for(signature), table);
    }
  }
  trace!("Flip signature histogram: {:?}", histogram);

  let target_signature = FlipSignature::of(&merged, target);
  let target_pattern = target_pattern_for(target_signature, table);
  schedule.force(target, table.base(target_pattern));
  debug!("Target {} has signature {}, dedicated pattern P{}",
    target, target_signature, target_pattern);

  Synthesis { schedule, target, target_signature, target_pattern }
}
