use log::*;

use crate::allocation::RowWindow;
use crate::config::*;
use crate::hammer::DramAccess;


//Fill every word of arg:row with arg:value
pub fn initialize_row<A: DramAccess>(access: &mut A, row: RowWindow, value: u64) {
  for word in 0..ROW_WORDS {
    access.store(row, word, value);
  }
  trace!("Initialized row V0x{:x} with 0x{:x}", row.addr(), value);
}

//Flush every cache line of arg:row, so the next access is served by DRAM
//arg:stride_words is the distance between two flushed words
pub fn evict_row<A: DramAccess>(access: &mut A, row: RowWindow, stride_words: usize) {
  for word in (0..ROW_WORDS).step_by(stride_words) {
    access.flush(row, word);
  }
}
