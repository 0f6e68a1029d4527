use std::collections::BTreeMap;
use log::*;

use crate::config::*;
use crate::utils::{self, dram::BankFunction, proc::PageFrameResolver};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub virt: u64,
  pub frame: u64,
  //presumed row index and bank, derived from the physical address
  pub row: u64,
  pub bank: u8,
  //the full hammer window starting at this page lies inside the region
  pub window_fits: bool,
}

//aggressor1 in row N, victim in row N+1, aggressor2 in row N+2, all in the
//same presumed bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowTriple {
  pub row: u64,
  pub bank: u8,
  pub aggressor1: Page,
  pub victim: Page,
  pub aggressor2: Page,
}

//All pages of the region bucketed by presumed row index
pub struct RowMap {
  rows: BTreeMap<u64, Vec<Page>>,
  pages_per_row: usize,
  bank_count: u16,
  pages: usize,
  excluded: usize,
}

impl RowMap {
  //Resolves every page of the region [arg:base, arg:base + arg:len)
  //Pages that cannot be resolved are left out
  pub fn classify<R, B>(
    base: u64,
    len: usize,
    resolver: &R,
    bank_fn: &B,
    presumed_row_size: u64,
  ) -> RowMap
  where R: PageFrameResolver, B: BankFunction {
    info!("Identifying rows for accessible pages");
    let end = base + len as u64;
    let mut rows: BTreeMap<u64, Vec<Page>> = BTreeMap::new();
    let mut pages = 0;
    let mut excluded = 0;

    for virt in (base..end).step_by(PAGE_SIZE) {
      let frame = match resolver.frame_number(virt) {
        Ok(frame) => frame,
        Err(e) => {
          debug!("Excluding page V0x{:x}: {}", virt, e);
          excluded += 1;
          continue;
        }
      };
      let phys_addr = utils::frame_to_phys(frame);
      let page = Page {
        virt,
        frame,
        row: phys_addr / presumed_row_size,
        bank: bank_fn.bank_of(phys_addr),
        window_fits: virt + ROW_WINDOW_SIZE as u64 <= end,
      };
      rows.entry(page.row).or_insert_with(Vec::new).push(page);
      pages += 1;
    }

    info!("Classified {} pages into {} rows, excluded {} pages",
      pages, rows.len(), excluded);
    RowMap {
      rows,
      pages_per_row: (presumed_row_size / PAGE_SIZE as u64) as usize,
      bank_count: bank_fn.bank_count(),
      pages,
      excluded,
    }
  }

  pub fn row(&self, index: u64) -> &[Page] {
    self.rows.get(&index).map(|r| r.as_slice()).unwrap_or(&[])
  }

  pub fn row_count(&self) -> usize {
    self.rows.len()
  }

  pub fn page_count(&self) -> usize {
    self.pages
  }

  pub fn excluded_count(&self) -> usize {
    self.excluded
  }

  pub fn bank_count(&self) -> u16 {
    self.bank_count
  }

  fn is_complete(&self, index: u64) -> bool {
    self.row(index).len() == self.pages_per_row
  }

  //row indices N for which rows N and N+2 are complete and N+1 is non-empty
  pub fn candidate_rows(&self) -> impl Iterator<Item = u64> + '_ {
    self.rows.keys().copied().filter(move |n| {
      self.is_complete(*n) && self.is_complete(n + 2) && !self.row(n + 1).is_empty()
    })
  }

  //first page of arg:row in arg:bank that can hold a hammer window
  fn representative(&self, row: u64, bank: u8) -> Option<Page> {
    self.row(row).iter().find(|p| p.bank == bank && p.window_fits).copied()
  }

  pub fn triple(&self, row: u64, bank: u8) -> Option<RowTriple> {
    Some(RowTriple {
      row,
      bank,
      aggressor1: self.representative(row, bank)?,
      victim: self.representative(row + 1, bank)?,
      aggressor2: self.representative(row + 2, bank)?,
    })
  }

  //All (row triple, bank) combinations with a representative in every row,
  //ordered by row index, then bank
  pub fn triples(&self) -> impl Iterator<Item = RowTriple> + '_ {
    let bank_count = self.bank_count;
    self.candidate_rows().flat_map(move |row| {
      (0..bank_count).filter_map(move |bank| self.triple(row, bank as u8))
    })
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::{PinpointError, Result};
  use crate::utils::dram::XorBankFunction;
  use std::collections::HashMap;

  const ROW_SIZE: u64 = 64 * 1024;
  const BASE: u64 = 0x7f00_0000_0000;

  //maps page i of the region to a chosen frame
  struct FakePagemap(HashMap<u64, u64>);

  impl FakePagemap {
    fn linear(first_frame: u64, pages: u64) -> FakePagemap {
      FakePagemap((0..pages)
        .map(|i| (BASE + i * PAGE_SIZE as u64, first_frame + i)).collect())
    }
  }

  impl PageFrameResolver for FakePagemap {
    fn frame_number(&self, virt_addr: u64) -> Result<u64> {
      self.0.get(&virt_addr).copied()
        .ok_or(PinpointError::PageNotPresent(virt_addr))
    }
  }

  fn bank_fn() -> XorBankFunction {
    XorBankFunction::new(PinpointConfig::default().bank_fns)
  }

  #[test]
  fn buckets_pages_by_physical_row() {
    let resolver = FakePagemap::linear(0, 48);
    let map = RowMap::classify(BASE, 48 * PAGE_SIZE, &resolver, &bank_fn(),
      ROW_SIZE);
    assert_eq!(map.row_count(), 3);
    assert_eq!(map.page_count(), 48);
    assert!((0..3).all(|r| map.row(r).len() == 16));
    assert_eq!(map.candidate_rows().collect::<Vec<_>>(), vec![0]);
  }

  #[test]
  fn triples_share_one_bank() {
    let resolver = FakePagemap::linear(0, 48);
    let map = RowMap::classify(BASE, 48 * PAGE_SIZE, &resolver, &bank_fn(),
      ROW_SIZE);
    let triples: Vec<_> = map.triples().collect();
    assert!(!triples.is_empty());
    for t in &triples {
      assert_eq!(t.aggressor1.bank, t.bank);
      assert_eq!(t.victim.bank, t.bank);
      assert_eq!(t.aggressor2.bank, t.bank);
      assert_eq!((t.aggressor1.row, t.victim.row, t.aggressor2.row),
        (t.row, t.row + 1, t.row + 2));
      assert!(t.aggressor2.window_fits);
    }
    //banks in increasing order, each picked by first match
    let banks: Vec<u8> = triples.iter().map(|t| t.bank).collect();
    let mut sorted = banks.clone();
    sorted.sort();
    assert_eq!(banks, sorted);
    let t0 = triples[0];
    assert_eq!(t0.aggressor1, *map.row(0).iter()
      .find(|p| p.bank == t0.bank).unwrap());
  }

  #[test]
  fn unresolvable_pages_are_excluded() {
    let mut resolver = FakePagemap::linear(0, 48);
    //one page missing in row 2, the triple starting at row 0 is gone
    resolver.0.remove(&(BASE + 40 * PAGE_SIZE as u64));
    let map = RowMap::classify(BASE, 48 * PAGE_SIZE, &resolver, &bank_fn(),
      ROW_SIZE);
    assert_eq!(map.excluded_count(), 1);
    assert_eq!(map.page_count(), 47);
    assert_eq!(map.triples().count(), 0);
  }

  #[test]
  fn empty_victim_row_is_skipped() {
    //rows 0 and 2 complete, nothing in row 1
    let mut frames = HashMap::new();
    for i in 0..16u64 {
      frames.insert(BASE + i * PAGE_SIZE as u64, i);
      frames.insert(BASE + (16 + i) * PAGE_SIZE as u64, 32 + i);
    }
    let map = RowMap::classify(BASE, 32 * PAGE_SIZE, &FakePagemap(frames),
      &bank_fn(), ROW_SIZE);
    assert_eq!(map.row_count(), 2);
    assert_eq!(map.triples().count(), 0);
  }

  #[test]
  fn partial_trailing_row_is_never_used() {
    //3.5 rows: row 3 only has 8 pages
    let pages = 3 * 16 + 8;
    let resolver = FakePagemap::linear(0, pages);
    let map = RowMap::classify(BASE, pages as usize * PAGE_SIZE, &resolver,
      &bank_fn(), ROW_SIZE);
    assert_eq!(map.row(3).len(), 8);
    for t in map.triples() {
      assert!(t.aggressor1.row != 3 && t.victim.row != 3 && t.aggressor2.row != 3);
    }
    assert_eq!(map.candidate_rows().collect::<Vec<_>>(), vec![0]);
  }

  #[test]
  fn missing_bank_representative_skips_only_that_bank() {
    //victim row only has a single page
    let mut frames = HashMap::new();
    for i in 0..16u64 {
      frames.insert(BASE + i * PAGE_SIZE as u64, i);
      frames.insert(BASE + (16 + i) * PAGE_SIZE as u64, 32 + i);
    }
    frames.insert(BASE + 32 * PAGE_SIZE as u64, 16);
    let map = RowMap::classify(BASE, 40 * PAGE_SIZE, &FakePagemap(frames),
      &bank_fn(), ROW_SIZE);
    let victim_bank = bank_fn().bank_of(16 << PAGE_SIZE_BITS);
    let triples: Vec<_> = map.triples().collect();
    assert_eq!(triples.len(), 1);
    assert_eq!(triples[0].bank, victim_bank);
    assert_eq!(triples[0].victim.frame, 16);
  }
}
