use std::thread::sleep;
use std::time::Duration;

use rppal::i2c::I2c;
use thiserror::Error;

use crate::{I2cError, RppalError};

const AHT20_ADDR: u16 = 0x38;

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

const RESET_DELAY: Duration = Duration::from_millis(20);
const INIT_DELAY: Duration = Duration::from_millis(10);
const MEASUREMENT_DELAY: Duration = Duration::from_millis(80);
const MEASUREMENT_RETRIES: usize = 3;

#[derive(Clone, Copy, Debug)]
pub enum Command {
    Initialize,
    TriggerMeasurement,
    SoftReset,
}

impl Command {
    fn bytes(self) -> &'static [u8] {
        match self {
            Command::Initialize => &[0xbe, 0x08, 0x00],
            Command::TriggerMeasurement => &[0xac, 0x33, 0x00],
            Command::SoftReset => &[0xba],
        }
    }
}

#[derive(Error, Clone, Debug)]
pub enum Aht20Error {
    #[error(transparent)]
    I2c(#[from] I2cError),
    #[error("Could not send {0:?} command")]
    Command(Command, #[source] RppalError),
    #[error("Could not read from sensor")]
    Read(#[source] RppalError),
    #[error("Sensor did not calibrate")]
    Calibration,
    #[error("Measurement did not finish in time")]
    Busy,
}

pub type Result<T> = std::result::Result<T, Aht20Error>;

pub struct Aht20 {
    i2c: I2c,
}

impl Aht20 {
    pub fn new(addr: u16) -> Result<Aht20> {
        let mut i2c = I2c::new().map_err(|_| I2cError::Initialization)?;
        i2c.set_slave_address(addr)
            .map_err(|_| I2cError::SlaveAddr(addr))?;
        let mut sensor = Aht20 { i2c };
        sensor.reset()?;
        sensor.ensure_calibrated()?;
        Ok(sensor)
    }

    pub fn default_addr() -> Result<Aht20> {
        Self::new(AHT20_ADDR)
    }

    /// Triggered measurement; temperature in celsius.
    pub fn read_temperature(&mut self) -> Result<f32> {
        self.send(Command::TriggerMeasurement)?;
        for _ in 0..MEASUREMENT_RETRIES {
            sleep(MEASUREMENT_DELAY);
            let mut buf = [0u8; 7];
            self.i2c
                .read(&mut buf)
                .map_err(|e| Aht20Error::Read(RppalError::from(e)))?;
            if buf[0] & STATUS_BUSY == 0 {
                return Ok(convert(&buf));
            }
            trace!("sensor busy, retrying measurement read");
        }
        Err(Aht20Error::Busy)
    }

    fn send(&mut self, command: Command) -> Result<()> {
        self.i2c
            .write(command.bytes())
            .map_err(|e| Aht20Error::Command(command, RppalError::from(e)))?;
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.send(Command::SoftReset)?;
        sleep(RESET_DELAY);
        Ok(())
    }

    fn ensure_calibrated(&mut self) -> Result<()> {
        if self.status()? & STATUS_CALIBRATED == 0 {
            self.send(Command::Initialize)?;
            sleep(INIT_DELAY);
            if self.status()? & STATUS_CALIBRATED == 0 {
                return Err(Aht20Error::Calibration);
            }
        }
        Ok(())
    }

    fn status(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .read(&mut buf)
            .map_err(|e| Aht20Error::Read(RppalError::from(e)))?;
        Ok(buf[0])
    }
}

/// The temperature sits in the low 4 bits of byte 3 plus bytes 4 and 5,
/// a 20 bit value spanning -50..150 degrees.
fn convert(buf: &[u8; 7]) -> f32 {
    let raw = ((buf[3] as u32 & 0x0f) << 16) | ((buf[4] as u32) << 8) | buf[5] as u32;
    (raw as f32 / (1 << 20) as f32) * 200.0 - 50.0
}
