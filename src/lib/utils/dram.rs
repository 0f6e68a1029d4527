/*
 * The bank mapping is module specific! The default masks match DRAM modules
 * whose bank address bits are the XOR of physical address bits
 *   14th xor 17th, 15th xor 18th and 16th xor 19th (counting from 1)
 * For other modules the masks have to be reverse engineered first, e.g. as in
 * Xiao et al., "One Bit Flips, One Cloud Flops: Cross-VM Row Hammer Attacks
 * and Privilege Escalation", USENIX Security 2016
 */

//Maps a physical address to its presumed DRAM bank
pub trait BankFunction {
  fn bank_of(&self, phys_addr: u64) -> u8;
  fn bank_count(&self) -> u16;
}

//Each mask is associated with one bit in the bank number, that bit is the
//parity of the masked physical address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorBankFunction {
  bank_fns: Vec<u64>,
}

impl XorBankFunction {
  pub fn new(bank_fns: Vec<u64>) -> XorBankFunction {
    assert!(!bank_fns.is_empty() && bank_fns.len() <= 8,
      "between 1 and 8 bank functions are supported");
    XorBankFunction { bank_fns }
  }
}

impl BankFunction for XorBankFunction {
  fn bank_of(&self, phys_addr: u64) -> u8 {
    let mut bank: u8 = 0;
    for (i, bank_fn) in self.bank_fns.iter().enumerate() {
      bank |= (((phys_addr & bank_fn).count_ones() % 2) as u8) << i;
    }
    bank
  }

  fn bank_count(&self) -> u16 {
    1 << self.bank_fns.len()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::PinpointConfig;

  fn reference_bank(pa: u64) -> u8 {
    (((pa >> 13) & 7) ^ ((pa >> 16) & 7)) as u8
  }

  #[test]
  fn default_masks_match_xor_formula() {
    let f = XorBankFunction::new(PinpointConfig::default().bank_fns);
    assert_eq!(f.bank_count(), 8);
    for pa in (0..0x40_0000u64).step_by(0x1000) {
      assert_eq!(f.bank_of(pa), reference_bank(pa), "pa 0x{:x}", pa);
    }
  }

  #[test]
  fn other_modules_use_other_masks() {
    let f = XorBankFunction::new(vec![0x2040, 0x44000]);
    assert_eq!(f.bank_count(), 4);
    assert_eq!(f.bank_of(0x2000), 1);
    assert_eq!(f.bank_of(0x2040), 0);
    assert_eq!(f.bank_of(0x40000), 2);
    assert_eq!(f.bank_of(0x42040), 2);
  }
}
