use colored::Colorize;
use log::*;

use crate::flip_checks::BitPos;


//Totals over a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub triples: u64,
  pub vulnerable_triples: u64,
  pub double_sided_flips: u64,
  pub pinpoint_flips: u64,
  pub pinpoint_hits: u64,
}

//Progress and results, rendering is up to the EventSink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  RowsClassified { pages: usize, excluded: usize, rows: usize },
  //page frame numbers of the three rows
  HammeringRows { aggressor1: u64, victim: u64, aggressor2: u64, bank: u8 },
  DoubleSidedFlips { count: u32, target: BitPos },
  NoVulnerability,
  PinpointFlips { count: u32, target: BitPos, hit: bool },
  BudgetExhausted { seconds: u64 },
  Interrupted,
  Finished(RunSummary),
}

pub trait EventSink {
  fn emit(&mut self, event: Event);
}

//collects the events, e.g. for tests
impl EventSink for Vec<Event> {
  fn emit(&mut self, event: Event) {
    self.push(event);
  }
}

//Renders the events on the logger
pub struct LogSink;

impl EventSink for LogSink {
  fn emit(&mut self, event: Event) {
    match event {
      Event::RowsClassified { pages, excluded, rows } => {
        info!("[!] Identified {} rows for {} accessible pages ({} excluded)",
          rows, pages, excluded);
      },
      Event::HammeringRows { aggressor1, victim, aggressor2, bank } => {
        info!("[!] Hammering rows ({:x}/{:x}/{:x}) in bank {}",
          aggressor1, victim, aggressor2, bank);
      },
      Event::DoubleSidedFlips { count, target } => {
        warn!("{}", format!("[!] Double-sided Rowhammer: {} bit flips, target {}",
          count, target).yellow());
      },
      Event::NoVulnerability => {
        debug!("[!] Double-sided Rowhammer: no bit flips");
      },
      Event::PinpointFlips { count, target, hit: true } => {
        warn!("{}", format!("[!] Pinpoint Rowhammer: {} bit flips ({} flipped)",
          count, target).green());
      },
      Event::PinpointFlips { count, hit: false, .. } => {
        warn!("{}", format!("[!] Pinpoint Rowhammer: {} bit flips \
          (no target bit flip)", count).red());
      },
      Event::BudgetExhausted { seconds } => {
        info!("[!] Spent {} seconds hammering, exiting now.", seconds);
      },
      Event::Interrupted => {
        warn!("Exiting prematurely");
      },
      Event::Finished(summary) => {
        info!("[!] Hammered {} row triples, {} with bit flips",
          summary.triples, summary.vulnerable_triples);
        info!("[!] {} double-sided bit flips, {} pinpoint bit flips, \
          {} target bits reproduced", summary.double_sided_flips,
          summary.pinpoint_flips, summary.pinpoint_hits);
      },
    }
  }
}
