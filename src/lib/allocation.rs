use std::marker::PhantomData;
use std::ptr::NonNull;
use memmap2::{MmapMut, MmapOptions};
use nix::sys::sysinfo;
use log::*;

use crate::config::*;
use crate::error::{PinpointError, Result};


//// REGION ////////////////////////////////////////////////////////////////////

//The big anonymous mapping all rows are picked from
//Owned by the hammering process for the whole run
pub struct MemoryRegion {
  map: MmapMut,
  base: NonNull<u8>,
  len: usize,
}

//Obtain the size of the physical memory of the system
pub fn physical_memory_size() -> Result<u64> {
  Ok(sysinfo::sysinfo()?.ram_total())
}

impl MemoryRegion {
  //Maps arg:fraction of the physical memory
  pub fn allocate(fraction: f64) -> Result<MemoryRegion> {
    let total = physical_memory_size()?;
    let size = (total as f64 * fraction) as usize;
    info!("Physical memory: {} MiB, mapping {} MiB for testing",
      total >> 20, size >> 20);
    MemoryRegion::with_size(size)
  }

  //Maps arg:size bytes (rounded down to whole pages) and initializes the
  //mapping so that the pages are non-empty
  pub fn with_size(size: usize) -> Result<MemoryRegion> {
    let len = size & !(PAGE_SIZE - 1);
    if len == 0 {
      return Err(PinpointError::Allocation(size));
    }

    let mut map = MmapOptions::new().len(len).populate().map_anon()?;
    let base = NonNull::new(map.as_mut_ptr())
      .ok_or(PinpointError::Allocation(len))?;
    let region = MemoryRegion { map, base, len };

    info!("Initializing large memory mapping of {} pages", len / PAGE_SIZE);
    region.touch_pages();
    Ok(region)
  }

  //write the page offset into the first word of every page
  fn touch_pages(&self) {
    for offset in (0..self.len).step_by(PAGE_SIZE) {
      unsafe {
        let word = self.base.as_ptr().add(offset) as *mut u64;
        std::ptr::write_volatile(word, offset as u64);
      }
    }
  }

  pub fn base(&self) -> u64 {
    self.base.as_ptr() as u64
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  //true if arg:len bytes from arg:virt_addr are inside the region
  pub fn contains(&self, virt_addr: u64, len: usize) -> bool {
    virt_addr >= self.base()
      && virt_addr + len as u64 <= self.base() + self.len as u64
  }

  //The hammer window starting at arg:virt_addr, None if it does not fit
  pub fn window(&self, virt_addr: u64) -> Option<RowWindow<'_>> {
    if !self.contains(virt_addr, ROW_WINDOW_SIZE) || virt_addr % 8 != 0 {
      return None;
    }
    NonNull::new(virt_addr as *mut u64).map(|ptr| RowWindow {
      ptr, _memory: PhantomData
    })
  }
}

impl Drop for MemoryRegion {
  fn drop(&mut self) {
    debug!("Unmapping {} bytes at V0x{:x}", self.map.len(), self.base());
  }
}


//// WINDOW ////////////////////////////////////////////////////////////////////

//ROW_WORDS words of memory starting at the representative page of a row
//All accesses go through a `DramAccess`, the window never hands out references
#[derive(Clone, Copy)]
pub struct RowWindow<'a> {
  ptr: NonNull<u64>,
  _memory: PhantomData<&'a mut [u64]>,
}

impl<'a> RowWindow<'a> {
  //window over ordinary memory, used by tests and simulations
  pub fn from_slice(words: &'a mut [u64]) -> RowWindow<'a> {
    assert!(words.len() >= ROW_WORDS,
      "a row window needs at least {} words", ROW_WORDS);
    RowWindow {
      ptr: NonNull::from(words).cast(),
      _memory: PhantomData
    }
  }

  pub fn word_ptr(&self, word: usize) -> *mut u64 {
    assert!(word < ROW_WORDS, "word {} outside of row window", word);
    unsafe { self.ptr.as_ptr().add(word) }
  }

  pub fn addr(&self) -> u64 {
    self.ptr.as_ptr() as u64
  }
}

impl std::fmt::Debug for RowWindow<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "RowWindow(V0x{:x})", self.addr())
  }
}
