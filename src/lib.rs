#[macro_use]
extern crate log;

use thiserror::Error;

pub mod buttons;
pub mod config;
pub mod indicator;
pub mod lcd;
pub mod led;
pub mod reporter;
pub mod sensor;
pub mod serial;
pub mod status;
pub mod storage;
pub mod thermostat;

#[derive(Error, Clone, Debug)]
pub enum GpioError {
    #[error("Could not initialize gpio")]
    Initialization,
    #[error("Could not get pin {0}")]
    Pin(u8),
}

#[derive(Error, Clone, Debug)]
pub enum I2cError {
    #[error("Could not initialize i2c")]
    Initialization,
    #[error("Could not set slave address to {0}")]
    SlaveAddr(u16),
}

/// Stringified rppal error.
#[derive(Error, Clone, Debug)]
#[error("{0}")]
pub struct RppalError(String);

impl From<rppal::gpio::Error> for RppalError {
    fn from(e: rppal::gpio::Error) -> Self {
        RppalError(e.to_string())
    }
}

impl From<rppal::i2c::Error> for RppalError {
    fn from(e: rppal::i2c::Error) -> Self {
        RppalError(e.to_string())
    }
}

impl From<rppal::uart::Error> for RppalError {
    fn from(e: rppal::uart::Error) -> Self {
        RppalError(e.to_string())
    }
}
