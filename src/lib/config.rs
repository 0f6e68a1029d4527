use std::path::Path;
use serde::Deserialize;
use log::*;

use crate::error::{PinpointError, Result};
use crate::utils::files;


// --- GENERAL ---
//current commit
pub static GIT_HASH: &str = env!("GIT_HASH");
//hostnames that should not get rowhammered
pub static FORBIDDEN_HOSTNAMES: [&str; 2] = ["name1", "name2"];
//path to the tunables file, defaults are used when it does not exist
pub static PINPOINT_CONFIG_PATH: &str = "./pinpoint_config.toml";

// --- SYSTEM CONFIG ---
//2log of the page size
pub const PAGE_SIZE_BITS: u32 = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_SIZE_BITS;
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE as u64 - 1;
//bitmask for the present bit of an entry in the pagemap
pub const PRESENT_BITMASK: u64 = 1 << 63;
//bitmask for the swap bit of an entry in the pagemap
pub const SWAP_BITMASK: u64 = 1 << 62;
//bits 0-54 of a pagemap entry hold the page frame number
pub const PFN_MASK: u64 = (1 << 55) - 1;
pub const CACHE_LINE_SIZE: usize = 64;

// --- HAMMER GEOMETRY ---
//number of 64 bit words that are filled, hammered and checked per row
//(8KiB starting at the representative page of the row)
pub const ROW_WORDS: usize = 1024;
pub const ROW_WINDOW_SIZE: usize = ROW_WORDS * std::mem::size_of::<u64>();
//number of phases in an alternation schedule
pub const PHASES: usize = 12;
//number of base data patterns, canonical patterns add the victim polarity
pub const BASE_PATTERNS: usize = 4;
pub const CANONICAL_PATTERNS: usize = 2 * BASE_PATTERNS;

// --- TUNABLES ---
//main structure for pinpoint_config.toml, every field is optional
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PinpointConfig {
  //assumed size of one DRAM row in bytes (summed over all banks)
  pub presumed_row_size: u64,
  //number of aggressor read pairs per hammer run
  pub number_of_reads: u64,
  //distance in bytes between two flushes when evicting a whole row
  pub flush_stride: usize,
  //the fraction of physical memory that is mapped for testing
  pub fraction_of_physical_memory: f64,
  //the time to hammer before stopping
  pub seconds_to_hammer: u64,
  //each mask gives one bank bit: parity of (physical address & mask)
  pub bank_fns: Vec<u64>,
}

impl Default for PinpointConfig {
  fn default() -> Self {
    PinpointConfig {
      presumed_row_size: 64 * 1024,
      number_of_reads: 1_200_000,
      flush_stride: CACHE_LINE_SIZE,
      fraction_of_physical_memory: 0.3,
      seconds_to_hammer: 3600,
      //bank bits 14^17, 15^18, 16^19 (counting from 1)
      bank_fns: vec![0x12000, 0x24000, 0x48000],
    }
  }
}

impl PinpointConfig {
  //Reads arg:path if it exists, falls back to the defaults otherwise
  pub fn load(path: &str) -> Result<PinpointConfig> {
    let config = if Path::new(path).exists() {
      files::parse_toml::<PinpointConfig>(path)?
    } else {
      info!("{} not found, using default tunables", path);
      PinpointConfig::default()
    };
    config.validate()
  }

  pub fn validate(self) -> Result<PinpointConfig> {
    let invalid = |msg: String| Err(PinpointError::InvalidConfig(msg));

    if self.presumed_row_size == 0
      || self.presumed_row_size % PAGE_SIZE as u64 != 0
    {
      return invalid(format!("presumed_row_size 0x{:x} is not a multiple of \
        the page size", self.presumed_row_size));
    }
    if self.number_of_reads == 0 {
      return invalid("number_of_reads should not be 0".to_owned());
    }
    if self.flush_stride == 0 || self.flush_stride % 8 != 0
      || ROW_WINDOW_SIZE % self.flush_stride != 0
    {
      return invalid(format!("flush_stride {} does not divide the {} byte \
        hammer window in whole words", self.flush_stride, ROW_WINDOW_SIZE));
    }
    if !(self.fraction_of_physical_memory > 0.0
      && self.fraction_of_physical_memory <= 1.0)
    {
      return invalid(format!("fraction_of_physical_memory {} not in (0, 1]",
        self.fraction_of_physical_memory));
    }
    if self.bank_fns.is_empty() || self.bank_fns.len() > 8 {
      return invalid("bank_fns needs between 1 and 8 masks".to_owned());
    }
    if let Some(f) = self.bank_fns.iter().find(|f| f.count_ones() != 2) {
      return invalid(format!("bank function 0x{:x} does not have exactly 2 \
        bits set", f));
    }

    Ok(self)
  }

  pub fn pages_per_row(&self) -> usize {
    (self.presumed_row_size / PAGE_SIZE as u64) as usize
  }

  //flush stride expressed in words
  pub fn flush_stride_words(&self) -> usize {
    self.flush_stride / std::mem::size_of::<u64>()
  }
}
