use std::fmt;

use crate::config::*;

const ZERO: u64 = 0x0000_0000_0000_0000;
const ONE: u64 = 0xffff_ffff_ffff_ffff;

//The three fill values used for one hammer run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataPattern {
  pub aggressor1: u64,
  pub victim: u64,
  pub aggressor2: u64,
}

impl fmt::Display for DataPattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "0x{:x}/0x{:x}/0x{:x}",
      self.aggressor1, self.victim, self.aggressor2)
  }
}

//The 8 canonical data patterns: index = victim polarity * 4 + base pattern
//Patterns i and i+4 only differ in the victim fill
//Built once and shared by reference between characterization and synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternTable {
  patterns: [DataPattern; CANONICAL_PATTERNS],
  default_pattern: usize,
}

impl PatternTable {
  pub fn canonical() -> PatternTable {
    let aggressor1 = [ZERO, ZERO, ONE, ONE, ZERO, ZERO, ONE, ONE];
    let victim = [ZERO, ZERO, ZERO, ZERO, ONE, ONE, ONE, ONE];
    let aggressor2 = [ZERO, ONE, ONE, ZERO, ZERO, ONE, ONE, ZERO];

    let mut patterns = [DataPattern {aggressor1: ZERO, victim: ZERO,
      aggressor2: ZERO}; CANONICAL_PATTERNS];
    for (i, p) in patterns.iter_mut().enumerate() {
      *p = DataPattern {
        aggressor1: aggressor1[i], victim: victim[i], aggressor2: aggressor2[i]
      };
    }

    PatternTable { patterns, default_pattern: 2 }
  }

  pub fn get(&self, index: usize) -> &DataPattern {
    &self.patterns[index]
  }

  //base pattern k, with the victim filled with zeros
  pub fn base(&self, k: usize) -> &DataPattern {
    assert!(k < BASE_PATTERNS, "base pattern {} does not exist", k);
    &self.patterns[k]
  }

  //pattern used for the baseline scan and as fallback target pattern
  pub fn default_index(&self) -> usize {
    self.default_pattern
  }

  pub fn default_pattern(&self) -> &DataPattern {
    &self.patterns[self.default_pattern]
  }

  pub fn iter(&self) -> impl Iterator<Item = &DataPattern> {
    self.patterns.iter()
  }
}
