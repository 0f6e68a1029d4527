pub mod proc;
pub mod dram;
pub mod files;

use crate::config::*;

//physical address of the first byte in arg:frame_number
pub fn frame_to_phys(frame_number: u64) -> u64 {
  frame_number << PAGE_SIZE_BITS
}

//counts the set bits over all words in arg:words
pub fn count_bits(words: &[u64]) -> u32 {
  words.iter().map(|w| w.count_ones()).sum()
}
