use log::*;

use crate::config::*;
use crate::flip_checks::{self, BitPos, FlipMask};
use crate::hammer::{DramAccess, Hammerer, HammerRows};
use crate::mem_init;
use crate::synth::AlternationSchedule;


pub struct PinpointResult {
  pub flips: FlipMask,
  pub target: BitPos,
  //the target bit flipped
  pub hit: bool,
}

impl<A: DramAccess> Hammerer<A> {
  //Pinpoint rowhammer: hammer phase by phase while the aggressors hold the
  //per-bit patterns of the schedule
  //The victim is filled once, it is not refreshed between phases
  pub fn pinpoint_hammer(
    &mut self,
    rows: &HammerRows,
    victim_fill: u64,
    schedule: &AlternationSchedule,
    target: BitPos
  ) -> PinpointResult {
    let stride = self.flush_stride_words();
    //writing the schedule costs about one activation per word
    let reads_per_phase =
      (self.number_of_reads() / PHASES as u64).saturating_sub(ROW_WORDS as u64);
    debug!("Pinpoint hammering {} phases of {} reads", PHASES, reads_per_phase);

    let access = self.access_mut();
    mem_init::initialize_row(access, rows.victim, victim_fill);
    mem_init::evict_row(access, rows.victim, stride);

    for phase in 0..PHASES {
      let (first, second) = schedule.phase(phase);
      for word in 0..ROW_WORDS {
        access.store(rows.aggressor1, word, first[word]);
        access.store(rows.aggressor2, word, second[word]);
        access.flush(rows.aggressor1, word);
        access.flush(rows.aggressor2, word);
      }
      access.hammer_pair(rows.aggressor1, rows.aggressor2, reads_per_phase);
    }

    let flips = flip_checks::check_victim(access, rows.victim, victim_fill);
    let hit = flips.is_set(target);
    PinpointResult { flips, target, hit }
  }
}
