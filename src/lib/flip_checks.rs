use std::fmt;
use log::*;

use crate::allocation::RowWindow;
use crate::config::*;
use crate::hammer::DramAccess;
use crate::utils;


//Position of one bit in a row window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BitPos {
  pub word: usize,
  pub bit: u32,
}

impl BitPos {
  pub fn new(word: usize, bit: u32) -> BitPos {
    assert!(word < ROW_WORDS && bit < 64, "bit {}:{} outside of row", word, bit);
    BitPos { word, bit }
  }

  pub fn mask(&self) -> u64 {
    1 << self.bit
  }
}

impl fmt::Display for BitPos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "word {} bit {}", self.word, self.bit)
  }
}

//One bit per victim bit, set where the victim differs from its fill value
#[derive(Clone, PartialEq, Eq)]
pub struct FlipMask {
  words: [u64; ROW_WORDS],
}

impl FlipMask {
  pub fn empty() -> FlipMask {
    FlipMask { words: [0; ROW_WORDS] }
  }

  pub fn words(&self) -> &[u64; ROW_WORDS] {
    &self.words
  }

  pub fn set(&mut self, pos: BitPos) {
    self.words[pos.word] |= pos.mask();
  }

  pub fn is_set(&self, pos: BitPos) -> bool {
    self.words[pos.word] & pos.mask() != 0
  }

  pub fn count(&self) -> u32 {
    utils::count_bits(&self.words)
  }

  pub fn is_empty(&self) -> bool {
    self.words.iter().all(|w| *w == 0)
  }

  //Target selection: the first flipped bit, scanning words in increasing
  //index and bits from 0 to 63
  pub fn first_flip(&self) -> Option<BitPos> {
    self.words.iter().enumerate()
      .find(|(_, w)| **w != 0)
      .map(|(word, w)| BitPos { word, bit: w.trailing_zeros() })
  }

  //all flipped positions in target selection order
  pub fn iter_flips(&self) -> impl Iterator<Item = BitPos> + '_ {
    self.words.iter().enumerate().flat_map(|(word, w)| {
      let w = *w;
      (0..64u32).filter(move |bit| (w >> bit) & 1 == 1)
        .map(move |bit| BitPos { word, bit })
    })
  }

  //bitwise OR of both masks
  pub fn union(&self, other: &FlipMask) -> FlipMask {
    let mut words = self.words;
    for (w, o) in words.iter_mut().zip(other.words.iter()) {
      *w |= *o;
    }
    FlipMask { words }
  }

  //true if every flip in arg:other is also in self
  pub fn contains(&self, other: &FlipMask) -> bool {
    self.words.iter().zip(other.words.iter()).all(|(s, o)| s & o == *o)
  }
}

impl fmt::Debug for FlipMask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.iter_flips()).finish()
  }
}

//Reads the victim row back and compares it with arg:fill_value
pub fn check_victim<A: DramAccess>(
  access: &mut A,
  victim: RowWindow,
  fill_value: u64
) -> FlipMask {
  debug!("Checking row V0x{:x} for flips", victim.addr());

  let mut words = [0u64; ROW_WORDS];
  for (word, result) in words.iter_mut().enumerate() {
    let content = access.load(victim, word);
    *result = content ^ fill_value;
    if *result != 0 {
      trace!("  - word {}: expected 0x{:x}, found 0x{:x}",
        word, fill_value, content);
    }
  }

  FlipMask { words }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::sim::SimDram;

  #[test]
  fn first_flip_scans_words_then_bits() {
    let mut mask = FlipMask::empty();
    assert_eq!(mask.first_flip(), None);
    mask.set(BitPos::new(700, 1));
    mask.set(BitPos::new(12, 40));
    mask.set(BitPos::new(12, 3));
    assert_eq!(mask.first_flip(), Some(BitPos::new(12, 3)));
    assert_eq!(mask.count(), 3);
    assert_eq!(mask.iter_flips().collect::<Vec<_>>(), vec![
      BitPos::new(12, 3), BitPos::new(12, 40), BitPos::new(700, 1)]);
  }

  #[test]
  fn union_is_commutative_idempotent_superset() {
    let mut a = FlipMask::empty();
    let mut b = FlipMask::empty();
    a.set(BitPos::new(0, 0));
    a.set(BitPos::new(5, 63));
    b.set(BitPos::new(5, 63));
    b.set(BitPos::new(1023, 7));

    let ab = a.union(&b);
    assert_eq!(ab, b.union(&a));
    assert_eq!(ab.union(&b), ab);
    assert_eq!(a.union(&a), a);
    assert!(ab.contains(&a) && ab.contains(&b));
    assert_eq!(ab.count(), 3);
  }

  #[test]
  fn check_victim_xors_with_fill() {
    let mut mem = vec![!0u64; ROW_WORDS];
    mem[3] = !0 ^ 0b1001;
    mem[1000] = 0;
    let mut sim = SimDram::new();
    let flips = check_victim(&mut sim, RowWindow::from_slice(&mut mem), !0);
    assert_eq!(flips.words()[3], 0b1001);
    assert_eq!(flips.words()[1000], !0);
    assert_eq!(flips.count(), 66);
    assert!(flips.words().iter().enumerate()
      .all(|(i, w)| i == 3 || i == 1000 || *w == 0));
  }
}
