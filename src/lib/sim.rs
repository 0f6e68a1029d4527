//Simulated DRAM for tests: plain memory plus weak victim cells that discharge
//after enough activations with the right aggressor bits around them

use crate::allocation::RowWindow;
use crate::hammer::DramAccess;


#[derive(Debug, Clone)]
pub struct WeakCell {
  victim: u64,
  word: usize,
  bit: u32,
  //indexed by base pattern: P0 (0,0), P1 (0,1), P2 (1,1), P3 (1,0)
  sensitive: [bool; 4],
  //value the bit takes once it discharged
  discharge_to: bool,
  threshold: u64,
  charge: u64,
  //only these aggressor rows disturb the cell, any rows if None
  aggressors: Option<(u64, u64)>,
}

impl WeakCell {
  pub fn new(
    victim: u64, word: usize, bit: u32, sensitive: [bool; 4],
    discharge_to: bool, threshold: u64
  ) -> WeakCell {
    WeakCell {
      victim, word, bit, sensitive, discharge_to, threshold,
      charge: 0, aggressors: None
    }
  }

  pub fn between(mut self, aggressor1: u64, aggressor2: u64) -> WeakCell {
    self.aggressors = Some((aggressor1, aggressor2));
    self
  }

  fn disturbed_by(&self, first: u64, second: u64) -> bool {
    match self.aggressors {
      None => true,
      Some((a, b)) => (a, b) == (first, second) || (b, a) == (first, second),
    }
  }
}

fn base_pattern(first: bool, second: bool) -> usize {
  match (first, second) {
    (false, false) => 0,
    (false, true) => 1,
    (true, true) => 2,
    (true, false) => 3,
  }
}

#[derive(Default)]
pub struct SimDram {
  cells: Vec<WeakCell>,
  activations: u64,
  flushes: u64,
  fences: u64,
}

impl SimDram {
  pub fn new() -> SimDram {
    SimDram::default()
  }

  pub fn add_cell(&mut self, cell: WeakCell) {
    self.cells.push(cell);
  }

  pub fn activations(&self) -> u64 {
    self.activations
  }

  pub fn flushes(&self) -> u64 {
    self.flushes
  }

  pub fn fences(&self) -> u64 {
    self.fences
  }
}

impl DramAccess for SimDram {
  fn store(&mut self, row: RowWindow, word: usize, value: u64) {
    unsafe { row.word_ptr(word).write(value) }
    //rewriting the victim recharges its cells
    for cell in self.cells.iter_mut()
      .filter(|c| c.victim == row.addr() && c.word == word)
    {
      cell.charge = 0;
    }
  }

  fn load(&mut self, row: RowWindow, word: usize) -> u64 {
    unsafe { row.word_ptr(word).read() }
  }

  fn flush(&mut self, _row: RowWindow, _word: usize) {
    self.flushes += 1;
  }

  fn fence(&mut self) {
    self.fences += 1;
  }

  fn hammer_pair(&mut self, first: RowWindow, second: RowWindow, count: u64) {
    self.activations += count;
    for cell in self.cells.iter_mut()
      .filter(|c| c.disturbed_by(first.addr(), second.addr()))
    {
      let mask = 1u64 << cell.bit;
      let a1 = unsafe { first.word_ptr(cell.word).read() } & mask != 0;
      let a2 = unsafe { second.word_ptr(cell.word).read() } & mask != 0;
      if !cell.sensitive[base_pattern(a1, a2)] {
        continue;
      }

      cell.charge += count;
      if cell.charge >= cell.threshold {
        //the victim of a cell is only hammered together with its aggressors,
        //tests never free it in between
        let victim = cell.victim as *mut u64;
        unsafe {
          let ptr = victim.add(cell.word);
          let value = ptr.read();
          ptr.write(if cell.discharge_to {value | mask} else {value & !mask});
        }
      }
    }
  }
}
