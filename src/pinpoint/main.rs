use std::sync::atomic::Ordering;
use std::time::Duration;
use chrono::prelude::*;
use log::*;

use pinpoint::{configure, prepare_host};
use pinpoint::config::*;
use pinpoint::error::Result;
use pinpoint::allocation::MemoryRegion;
use pinpoint::attempt::{self, Budget};
use pinpoint::events::{Event, EventSink, LogSink};
use pinpoint::hammer::{Clflush, Hammerer};
use pinpoint::patterns::PatternTable;
use pinpoint::rows::RowMap;
use pinpoint::utils::{dram::XorBankFunction, proc::Pagemap};


//Pinpoint rowhammer over a big chunk of physical memory
//Tunables are read from pinpoint_config.toml (defaults if it does not exist)
//For every row triple and bank: double-sided rowhammer with the default
//pattern, and if anything flipped, characterize the flips with all 8 data
//patterns and pinpoint-hammer the first flipped bit
//Stops after `seconds_to_hammer` or on ctrl-c, always between two attempts
//USAGE: sudo ./pinpoint_hammer

pub fn main() {
  let mut logger_builder = configure();
  logger_builder.init();

  if let Err(e) = run() {
    error!("{}", e);
    std::process::exit(1);
  }
}

fn run() -> Result<()> {
  info!("[!] Starting the testing process... (commit {})", GIT_HASH);
  let start_time = Local::now();

  prepare_host()?;
  let config = PinpointConfig::load(PINPOINT_CONFIG_PATH)?;
  debug!("{:?}", config);
  let access = Clflush::new()?;
  let resolver = Pagemap::open()?;
  let bank_fn = XorBankFunction::new(config.bank_fns.clone());

  let region = MemoryRegion::allocate(config.fraction_of_physical_memory)?;
  let row_map = RowMap::classify(region.base(), region.len(), &resolver,
    &bank_fn, config.presumed_row_size);
  let mut sink = LogSink;
  sink.emit(Event::RowsClassified {
    pages: row_map.page_count(),
    excluded: row_map.excluded_count(),
    rows: row_map.row_count(),
  });

  //ctrl-c handler: stop hammering after the current attempt
  let budget = Budget::new(Duration::from_secs(config.seconds_to_hammer));
  let interrupted = budget.interrupt_flag();
  ctrlc::set_handler(move || {
    interrupted.store(true, Ordering::SeqCst);
  })?;

  let table = PatternTable::canonical();
  let mut hammerer = Hammerer::new(access, &config);
  let summary = attempt::hammer_all_reachable_pages(&mut hammerer, &table,
    &region, &row_map, &budget, &mut sink);
  sink.emit(Event::Finished(summary));

  let time_format = "%d/%m/%Y %H:%M";
  info!("Hammered from {} to {}", start_time.format(time_format),
    Local::now().format(time_format));
  Ok(())
}
