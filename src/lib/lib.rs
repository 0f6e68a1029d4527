use std::ffi::OsStr;
use env_logger::Env;
use nix::unistd::getuid;
use nix::sys::mman;


//Pinpoint rowhammer: find double-sided bit flips, then reproduce one chosen
//flip with a per-bit alternating aggressor pattern
pub mod config;
pub mod error;
pub mod utils;
pub mod allocation;
pub mod mem_init;
pub mod flip_checks;
pub mod hammer;
pub mod patterns;
pub mod rows;
pub mod synth;
pub mod pinpoint;
pub mod events;
pub mod attempt;
#[cfg(test)]
mod sim;

use config::*;
use error::{PinpointError, Result};

//Returns an env_logger::Builder instance for further tool-specific logger
//configurations, call `init()` on it to finish the creation of the instance
pub fn configure() -> env_logger::Builder {
  let mut logger_builder =
    env_logger::Builder::from_env(Env::default().default_filter_or("info"));
  logger_builder.format_timestamp(None);
  logger_builder
}

//Some basic checks every run should perform before touching memory
pub fn prepare_host() -> Result<()> {
  let hostname = hostname::get()?;
  if FORBIDDEN_HOSTNAMES.iter().any(|name| hostname == OsStr::new(name)) {
    return Err(PinpointError::Unsupported(
      "this host is on the list of machines that should not get rowhammered"));
  }

  //the pagemap only reveals frame numbers to root
  if !getuid().is_root() {
    return Err(PinpointError::Unsupported(
      "program should run with root privileges"));
  }

  //lock all pages of this process in physical memory (= prevent swapping)
  mman::mlockall(mman::MlockAllFlags::all())?;
  Ok(())
}
