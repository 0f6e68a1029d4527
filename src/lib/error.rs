use thiserror::Error;

pub type Result<T> = std::result::Result<T, PinpointError>;

#[derive(Debug, Error)]
pub enum PinpointError {
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("system call failed: {0}")]
  Sys(#[from] nix::Error),
  #[error("cannot install the ctrl-c handler: {0}")]
  Signal(#[from] ctrlc::Error),
  #[error("cannot parse config: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("invalid config: {0}")]
  InvalidConfig(String),
  #[error("virtual address 0x{0:x} is not present in physical memory")]
  PageNotPresent(u64),
  #[error("virtual address 0x{0:x} is swapped out")]
  PageSwapped(u64),
  #[error("page frame number of 0x{0:x} is hidden, run as root")]
  PfnHidden(u64),
  #[error("memory allocation of {0} bytes failed")]
  Allocation(usize),
  #[error("unsupported platform: {0}")]
  Unsupported(&'static str),
}
