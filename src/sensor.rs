use std::collections::VecDeque;

use thiserror::Error;

mod aht20;

pub use aht20::{Aht20, Aht20Error};

/// Rolling window size for temperature smoothing.
pub const WINDOW_SIZE: usize = 5;

#[derive(Error, Debug)]
pub enum SensorError {
    #[error(transparent)]
    Read(#[from] Aht20Error),
    #[error("Could not acquire sensor mutex")]
    Mutex,
}

pub type Result<T> = std::result::Result<T, SensorError>;

pub fn fahrenheit(celsius: f32) -> f32 {
    (9.0 / 5.0) * celsius + 32.0
}

/// Bounded ring of the most recent samples, oldest evicted first.
#[derive(Clone, Debug, Default)]
pub struct SmoothingWindow {
    samples: VecDeque<f32>,
}

impl SmoothingWindow {
    pub fn new() -> SmoothingWindow {
        SmoothingWindow {
            samples: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean of the window, `None` until the first sample lands.
    pub fn smoothed(&self) -> Option<f32> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.samples.iter().sum::<f32>() / self.samples.len() as f32)
        }
    }
}

pub struct SmoothedSensor {
    sensor: Aht20,
    window: SmoothingWindow,
}

impl SmoothedSensor {
    pub fn new(sensor: Aht20) -> SmoothedSensor {
        SmoothedSensor {
            sensor,
            window: SmoothingWindow::new(),
        }
    }

    /// One raw read pushed through the window; the floor of the rolling mean
    /// in fahrenheit. Callers fall back to 0 for the cycle on failure.
    pub fn read_smoothed(&mut self) -> Result<i32> {
        let celsius = self.sensor.read_temperature()?;
        self.window.push(fahrenheit(celsius));
        let smoothed = self.window.smoothed().map(|s| s.floor() as i32).unwrap_or(0);
        trace!("smoothed temperature: {}", smoothed);
        Ok(smoothed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_exceeds_capacity() {
        let mut window = SmoothingWindow::new();
        for i in 0..20 {
            window.push(i as f32);
            assert!(window.len() <= WINDOW_SIZE);
        }
        assert_eq!(window.len(), WINDOW_SIZE);
    }

    #[test]
    fn window_evicts_oldest_first() {
        let mut window = SmoothingWindow::new();
        for sample in [60.0, 61.0, 62.0, 63.0, 64.0, 100.0] {
            window.push(sample);
        }
        // 60.0 is gone: mean of [61, 62, 63, 64, 100]
        assert_eq!(window.smoothed(), Some(78.0));
    }

    #[test]
    fn smoothed_is_none_until_first_sample() {
        let mut window = SmoothingWindow::new();
        assert_eq!(window.smoothed(), None);
        window.push(70.0);
        assert_eq!(window.smoothed(), Some(70.0));
    }

    #[test]
    fn floor_of_mean_matches_documented_scenario() {
        let mut window = SmoothingWindow::new();
        for sample in [70.0, 72.0, 71.0, 73.0, 75.0] {
            window.push(sample);
        }
        let smoothed = window.smoothed().map(|s| s.floor() as i32);
        assert_eq!(smoothed, Some(72));
    }

    #[test]
    fn fahrenheit_conversion() {
        assert_eq!(fahrenheit(0.0), 32.0);
        assert_eq!(fahrenheit(100.0), 212.0);
        assert_eq!(fahrenheit(-40.0), -40.0);
    }
}
