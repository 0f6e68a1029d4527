use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use log::*;

use crate::allocation::MemoryRegion;
use crate::config::*;
use crate::events::{Event, EventSink, RunSummary};
use crate::flip_checks::{BitPos, FlipMask};
use crate::hammer::{DramAccess, Hammerer, HammerRows};
use crate::patterns::PatternTable;
use crate::rows::{RowMap, RowTriple};
use crate::synth;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Idle,
  BaselineScan,
  Characterize,
  Synthesize,
  Pinpoint,
  Report,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  //the baseline scan found nothing, the attempt was abandoned
  NoFlip,
  Pinpointed {
    baseline_flips: u32,
    target: BitPos,
    target_pattern: usize,
    flips: u32,
    hit: bool,
  },
}

//One (row triple, bank) attempt
//IDLE -> BASELINE_SCAN -> (no flip: IDLE) -> CHARACTERIZE -> SYNTHESIZE
//  -> PINPOINT -> REPORT -> IDLE
pub struct Attempt<'a, A: DramAccess> {
  hammerer: &'a mut Hammerer<A>,
  table: &'a PatternTable,
  stage: Stage,
}

impl<'a, A: DramAccess> Attempt<'a, A> {
  pub fn new(hammerer: &'a mut Hammerer<A>, table: &'a PatternTable) -> Self {
    Attempt { hammerer, table, stage: Stage::Idle }
  }

  pub fn stage(&self) -> Stage {
    self.stage
  }

  fn enter(&mut self, stage: Stage) {
    debug!("{:?} -> {:?}", self.stage, stage);
    self.stage = stage;
  }

  pub fn run(&mut self, rows: &HammerRows, sink: &mut dyn EventSink) -> Outcome {
    self.enter(Stage::BaselineScan);
    let baseline = self.hammerer.hammer(rows, self.table.default_pattern());
    //in this code, pick up the first bit flip for simplicity
    let target = match baseline.first_flip() {
      Some(target) => target,
      None => {
        sink.emit(Event::NoVulnerability);
        self.enter(Stage::Idle);
        return Outcome::NoFlip;
      }
    };
    let baseline_flips = baseline.count();
    sink.emit(Event::DoubleSidedFlips { count: baseline_flips, target });

    //scan with all eight data patterns
    self.enter(Stage::Characterize);
    let mut results = [(); CANONICAL_PATTERNS].map(|_| FlipMask::empty());
    for (result, pattern) in results.iter_mut().zip(self.table.iter()) {
      *result = self.hammerer.hammer(rows, pattern);
    }

    self.enter(Stage::Synthesize);
    let synthesis = synth::synthesize(self.table, &results, target);
    //the whole schedule has to be visible before hammering starts
    self.hammerer.fence();

    self.enter(Stage::Pinpoint);
    let result = self.hammerer.pinpoint_hammer(rows,
      self.table.default_pattern().victim, &synthesis.schedule, target);

    self.enter(Stage::Report);
    let flips = result.flips.count();
    sink.emit(Event::PinpointFlips { count: flips, target, hit: result.hit });
    self.enter(Stage::Idle);

    Outcome::Pinpointed {
      baseline_flips,
      target,
      target_pattern: synthesis.target_pattern,
      flips,
      hit: result.hit,
    }
  }
}

//Ends the run after a fixed time or on ctrl-c, only checked between attempts
pub struct Budget {
  start: Instant,
  limit: Duration,
  interrupted: Arc<AtomicBool>,
}

impl Budget {
  pub fn new(limit: Duration) -> Budget {
    Budget {
      start: Instant::now(),
      limit,
      interrupted: Arc::new(AtomicBool::new(false)),
    }
  }

  //set to true (e.g. from a signal handler) to stop before the next attempt
  pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
    self.interrupted.clone()
  }

  pub fn exhausted(&self) -> Option<Event> {
    if self.interrupted.load(Ordering::SeqCst) {
      Some(Event::Interrupted)
    } else if self.start.elapsed() >= self.limit {
      Some(Event::BudgetExhausted { seconds: self.limit.as_secs() })
    } else {
      None
    }
  }
}

fn hammer_rows<'r>(region: &'r MemoryRegion, triple: &RowTriple)
  -> Option<HammerRows<'r>>
{
  Some(HammerRows {
    aggressor1: region.window(triple.aggressor1.virt)?,
    victim: region.window(triple.victim.virt)?,
    aggressor2: region.window(triple.aggressor2.virt)?,
  })
}

//Runs an attempt for every (row triple, bank) of arg:row_map until all are
//done or the budget ends the run
pub fn hammer_all_reachable_pages<A: DramAccess>(
  hammerer: &mut Hammerer<A>,
  table: &PatternTable,
  region: &MemoryRegion,
  row_map: &RowMap,
  budget: &Budget,
  sink: &mut dyn EventSink,
) -> RunSummary {
  let mut summary = RunSummary::default();

  for triple in row_map.triples() {
    if let Some(event) = budget.exhausted() {
      sink.emit(event);
      break;
    }

    let rows = match hammer_rows(region, &triple) {
      Some(rows) => rows,
      None => {
        warn!("Row triple at row {} bank {} is outside the region",
          triple.row, triple.bank);
        continue;
      }
    };

    sink.emit(Event::HammeringRows {
      aggressor1: triple.aggressor1.frame,
      victim: triple.victim.frame,
      aggressor2: triple.aggressor2.frame,
      bank: triple.bank,
    });
    summary.triples += 1;

    match Attempt::new(hammerer, table).run(&rows, sink) {
      Outcome::NoFlip => {},
      Outcome::Pinpointed { baseline_flips, flips, hit, .. } => {
        summary.vulnerable_triples += 1;
        summary.double_sided_flips += baseline_flips as u64;
        summary.pinpoint_flips += flips as u64;
        summary.pinpoint_hits += hit as u64;
      }
    }
  }

  summary
}
