use rppal::uart::{Parity, Uart};
use thiserror::Error;

use crate::RppalError;

const DATA_BITS: u8 = 8;
const STOP_BITS: u8 = 1;

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("Could not open serial port {0}")]
    Open(String, #[source] RppalError),
    #[error("Could not write to serial port")]
    Write(#[source] RppalError),
}

pub type Result<T> = std::result::Result<T, SerialError>;

/// 8N1 serial link for the periodic status record.
pub struct SerialLink {
    uart: Uart,
}

impl SerialLink {
    pub fn new(port: &str, baud_rate: u32) -> Result<SerialLink> {
        let mut uart = Uart::with_path(port, baud_rate, Parity::None, DATA_BITS, STOP_BITS)
            .map_err(|e| SerialError::Open(port.to_string(), RppalError::from(e)))?;
        uart.set_write_mode(true)
            .map_err(|e| SerialError::Open(port.to_string(), RppalError::from(e)))?;
        Ok(SerialLink { uart })
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let written = self
            .uart
            .write(bytes)
            .map_err(|e| SerialError::Write(RppalError::from(e)))?;
        trace!("wrote {} of {} bytes to serial port", written, bytes.len());
        Ok(())
    }
}
