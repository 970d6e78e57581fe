use rppal::gpio::{Gpio, OutputPin};
use thiserror::Error;

use crate::indicator::IndicatorSignal;
use crate::GpioError;

const PULSE_FREQUENCY: f64 = 2.0;
const PULSE_DUTY_CYCLE: f64 = 0.5;

#[derive(Error, Debug)]
pub enum LedError {
    #[error(transparent)]
    Gpio(#[from] GpioError),
}

pub type Result<T> = std::result::Result<T, LedError>;

pub struct Led {
    pin: OutputPin,
    pulsing: bool,
}

impl Led {
    pub fn new(pin: u8) -> Result<Led> {
        let pin = Gpio::new()
            .map_err(|_| GpioError::Initialization)?
            .get(pin)
            .map_err(|_| GpioError::Pin(pin))?
            .into_output();
        Ok(Led {
            pin,
            pulsing: false,
        })
    }

    pub fn on(&mut self) {
        self.stop_pulse();
        self.pin.set_high();
    }

    pub fn off(&mut self) {
        self.stop_pulse();
        self.pin.set_low();
    }

    /// Software pwm blink. Kept running until the next `on`/`off` write.
    pub fn pulse(&mut self) {
        if let Err(e) = self.pin.set_pwm_frequency(PULSE_FREQUENCY, PULSE_DUTY_CYCLE) {
            error!("could not start pwm on pin {}: {}", self.pin.pin(), e);
            return;
        }
        self.pulsing = true;
    }

    pub fn apply(&mut self, signal: IndicatorSignal) {
        match signal {
            IndicatorSignal::Off => self.off(),
            IndicatorSignal::On => self.on(),
            IndicatorSignal::Pulse => self.pulse(),
        }
    }

    pub fn is_on(&self) -> bool {
        self.pin.is_set_high()
    }

    fn stop_pulse(&mut self) {
        if self.pulsing {
            if let Err(e) = self.pin.clear_pwm() {
                error!("could not stop pwm on pin {}: {}", self.pin.pin(), e);
            }
            self.pulsing = false;
        }
    }
}
