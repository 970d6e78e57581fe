use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not open config file {0}")]
    Open(PathBuf, #[source] io::Error),
    #[error("Could not parse config file")]
    Parse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_database_path() -> PathBuf {
    PathBuf::from("temperature_log.db")
}

/// Startup settings. A missing file or field is fatal.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub serial_port: String,
    pub baudrate: u32,
    pub heat_led_pin: u8,
    pub cool_led_pin: u8,
    pub state_button_pin: u8,
    pub increase_button_pin: u8,
    pub decrease_button_pin: u8,
    pub default_set_point: i32,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let file = File::open(path).map_err(|e| ConfigError::Open(path.to_path_buf(), e))?;
        Ok(serde_json::from_reader(file)?)
    }
}
