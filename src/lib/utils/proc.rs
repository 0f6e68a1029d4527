use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;
use byteorder::{ByteOrder, LittleEndian};

use crate::config::*;
use crate::error::{PinpointError, Result};


//Translates virtual addresses of this process to physical page frame numbers
pub trait PageFrameResolver {
  fn frame_number(&self, virt_addr: u64) -> Result<u64>;

  fn virt_to_phys(&self, virt_addr: u64) -> Result<u64> {
    let frame_number = self.frame_number(virt_addr)?;
    Ok((frame_number << PAGE_SIZE_BITS) + (virt_addr & PAGE_OFFSET_MASK))
  }
}

//Resolver backed by /proc/self/pagemap, the file stays open for the whole run
pub struct Pagemap {
  file: File,
}

impl Pagemap {
  pub fn open() -> Result<Pagemap> {
    let path = Path::new("/proc/self/pagemap");
    Ok(Pagemap { file: File::open(path)? })
  }
}

impl PageFrameResolver for Pagemap {
  fn frame_number(&self, virt_addr: u64) -> Result<u64> {
    let pagemap_offset: u64 = (virt_addr >> PAGE_SIZE_BITS) * 8;

    //read may fail if page is not present
    let mut buf: [u8; 8] = [0; 8];
    self.file.read_exact_at(&mut buf, pagemap_offset)?;
    decode_entry(virt_addr, LittleEndian::read_u64(&buf))
  }
}

fn decode_entry(virt_addr: u64, entry: u64) -> Result<u64> {
  if entry & PRESENT_BITMASK == 0 {
    return Err(PinpointError::PageNotPresent(virt_addr));
  }
  //pages should be locked in memory or swap disabled
  if entry & SWAP_BITMASK != 0 {
    return Err(PinpointError::PageSwapped(virt_addr));
  }
  //without CAP_SYS_ADMIN the kernel reports frame number 0
  match entry & PFN_MASK {
    0 => Err(PinpointError::PfnHidden(virt_addr)),
    pfn => Ok(pfn),
  }
}
