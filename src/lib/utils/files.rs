use serde::de::DeserializeOwned;
use std::fs;
use log::*;

use crate::error::Result;


pub fn parse_toml<T: DeserializeOwned>(path: &str) -> Result<T> {
  info!("Parsing toml file: {}", path);
  let config_string = fs::read_to_string(path)?;
  Ok(toml::from_str::<T>(&config_string)?)
}
