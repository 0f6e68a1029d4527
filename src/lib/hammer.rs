use std::arch::asm;
use std::time::SystemTime;
use log::*;

use crate::allocation::RowWindow;
use crate::config::*;
use crate::error::{PinpointError, Result};
use crate::flip_checks::{self, FlipMask};
use crate::mem_init;
use crate::patterns::DataPattern;


//Forces accesses to be served from the DRAM instead of the caches
//Every load, store and flush targets one word of a row window
pub trait DramAccess {
  fn store(&mut self, row: RowWindow, word: usize, value: u64);
  fn load(&mut self, row: RowWindow, word: usize) -> u64;
  fn flush(&mut self, row: RowWindow, word: usize);
  //full memory fence, all earlier stores are globally visible afterwards
  fn fence(&mut self);

  //The hammer primitive: read the first word of both rows and flush them
  //again, arg:count times
  fn hammer_pair(&mut self, first: RowWindow, second: RowWindow, count: u64) {
    for _ in 0..count {
      self.load(first, 0);
      self.load(second, 0);
      self.flush(first, 0);
      self.flush(second, 0);
    }
  }
}

//DramAccess with volatile accesses, clflush and mfence
pub struct Clflush {
  _private: (),
}

impl Clflush {
  pub fn new() -> Result<Clflush> {
    //clflush is part of sse2
    if is_x86_feature_detected!("sse2") {
      Ok(Clflush { _private: () })
    } else {
      Err(PinpointError::Unsupported("clflush is not available on this cpu"))
    }
  }
}

impl DramAccess for Clflush {
  #[inline(always)]
  fn store(&mut self, row: RowWindow, word: usize, value: u64) {
    unsafe { std::ptr::write_volatile(row.word_ptr(word), value) }
  }

  #[inline(always)]
  fn load(&mut self, row: RowWindow, word: usize) -> u64 {
    unsafe { std::ptr::read_volatile(row.word_ptr(word)) }
  }

  #[inline(always)]
  fn flush(&mut self, row: RowWindow, word: usize) {
    unsafe { core::arch::x86_64::_mm_clflush(row.word_ptr(word) as *const u8) }
  }

  fn fence(&mut self) {
    unsafe { core::arch::x86_64::_mm_mfence() }
  }

  //same access sequence as the default, but in one asm loop so the compiler
  //cannot reorder or drop anything between two activations
  fn hammer_pair(&mut self, first: RowWindow, second: RowWindow, count: u64) {
    //otherwise, the loop counter wraps around
    if count == 0 {
      return;
    }

    //intel syntax!
    unsafe {asm!(
      "2:",
      "mov     {tmp}, [{first}]",
      "mov     {tmp}, [{second}]",
      "clflush [{first}]",
      "clflush [{second}]",
      "dec     {cnt}",
      "jnz     2b",
      first = in(reg) first.word_ptr(0),
      second = in(reg) second.word_ptr(0),
      cnt = inout(reg) count => _,
      tmp = out(reg) _,
      options(nostack),
    );}
  }
}

//The three row windows of one attempt
#[derive(Debug, Clone, Copy)]
pub struct HammerRows<'a> {
  pub aggressor1: RowWindow<'a>,
  pub victim: RowWindow<'a>,
  pub aggressor2: RowWindow<'a>,
}

//Runs double-sided and pinpoint rowhammer through a DramAccess
pub struct Hammerer<A: DramAccess> {
  access: A,
  number_of_reads: u64,
  flush_stride_words: usize,
}

impl<A: DramAccess> Hammerer<A> {
  pub fn new(access: A, config: &PinpointConfig) -> Hammerer<A> {
    Hammerer {
      access,
      number_of_reads: config.number_of_reads,
      flush_stride_words: config.flush_stride_words(),
    }
  }

  pub fn access(&self) -> &A {
    &self.access
  }

  pub(crate) fn access_mut(&mut self) -> &mut A {
    &mut self.access
  }

  pub fn number_of_reads(&self) -> u64 {
    self.number_of_reads
  }

  pub(crate) fn flush_stride_words(&self) -> usize {
    self.flush_stride_words
  }

  pub fn fence(&mut self) {
    self.access.fence();
  }

  //Double-sided rowhammer with one data pattern
  //Returns the victim words XORed with the victim fill value
  pub fn hammer(&mut self, rows: &HammerRows, pattern: &DataPattern) -> FlipMask {
    trace!("Hammering with pattern {}", pattern);
    mem_init::initialize_row(&mut self.access, rows.aggressor1, pattern.aggressor1);
    mem_init::initialize_row(&mut self.access, rows.aggressor2, pattern.aggressor2);
    mem_init::initialize_row(&mut self.access, rows.victim, pattern.victim);

    for row in &[rows.aggressor1, rows.aggressor2, rows.victim] {
      mem_init::evict_row(&mut self.access, *row, self.flush_stride_words);
    }

    let start_time = SystemTime::now();
    self.access.hammer_pair(rows.aggressor1, rows.aggressor2,
      self.number_of_reads);
    if let Ok(duration) = SystemTime::now().duration_since(start_time) {
      trace!("Hammering took {}ms", duration.as_millis());
    }

    flip_checks::check_victim(&mut self.access, rows.victim, pattern.victim)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::patterns::PatternTable;
  use crate::sim::{SimDram, WeakCell};

  fn config(reads: u64) -> PinpointConfig {
    PinpointConfig { number_of_reads: reads, ..Default::default() }
  }

  #[test]
  fn undisturbed_victim_has_no_flips() {
    let (mut a1, mut v, mut a2) =
      (vec![0; ROW_WORDS], vec![0; ROW_WORDS], vec![0; ROW_WORDS]);
    let rows = HammerRows {
      aggressor1: RowWindow::from_slice(&mut a1),
      victim: RowWindow::from_slice(&mut v),
      aggressor2: RowWindow::from_slice(&mut a2),
    };
    let table = PatternTable::canonical();
    let mut hammerer = Hammerer::new(SimDram::new(), &config(1000));

    for pattern in table.iter() {
      let flips = hammerer.hammer(&rows, pattern);
      assert_eq!(flips.count(), 0);
    }
    assert_eq!(hammerer.access().activations(), 8 * 1000);
    assert!(a1.iter().all(|w| *w == !0));
    assert!(a2.iter().all(|w| *w == 0));
    assert!(v.iter().all(|w| *w == !0));
  }

  #[test]
  fn flips_are_victim_content_xor_fill() {
    let (mut a1, mut v, mut a2) =
      (vec![0; ROW_WORDS], vec![0; ROW_WORDS], vec![0; ROW_WORDS]);
    let victim_addr = v.as_ptr() as u64;
    let rows = HammerRows {
      aggressor1: RowWindow::from_slice(&mut a1),
      victim: RowWindow::from_slice(&mut v),
      aggressor2: RowWindow::from_slice(&mut a2),
    };
    let table = PatternTable::canonical();

    //discharges to 1 under P2 (both aggressors 1), so it shows with a 0 victim
    let mut sim = SimDram::new();
    sim.add_cell(WeakCell::new(victim_addr, 17, 5, [false, false, true, false],
      true, 500));
    sim.add_cell(WeakCell::new(victim_addr, 900, 63, [true, true, true, true],
      false, 500));
    let mut hammerer = Hammerer::new(sim, &config(1000));

    let flips = hammerer.hammer(&rows, table.get(2));
    assert_eq!(flips.count(), 1);
    assert_eq!(flips.words()[17], 1 << 5);

    //victim filled with ones: the first cell is invisible, the second shows
    let flips = hammerer.hammer(&rows, table.get(6));
    assert_eq!(flips.count(), 1);
    assert_eq!(flips.words()[900], 1 << 63);

    //too few activations to discharge anything
    let mut sim = SimDram::new();
    sim.add_cell(WeakCell::new(victim_addr, 900, 63, [true, true, true, true],
      false, 500));
    let mut hammerer = Hammerer::new(sim, &config(100));
    assert_eq!(hammerer.hammer(&rows, table.get(6)).count(), 0);
  }
}
