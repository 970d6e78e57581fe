use itertools::Itertools;

use crate::thermostat::Mode;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Emitted in place of the whole serial record when the temperature could
/// not be read.
pub const SERIAL_ERROR_RECORD: &str = "error,error,error";

/// Ticks 1-5 of the alternation cycle show the temperature, 6-10 the mode.
const TEMPERATURE_TICKS: u8 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayPayload {
    pub line1: String,
    pub line2: String,
}

impl DisplayPayload {
    pub fn to_text(&self) -> String {
        format!("{}\n{}", self.line1, self.line2)
    }
}

pub fn render_display(
    timestamp: &str,
    mode: Mode,
    temperature: i32,
    set_point: i32,
    alternation: u8,
) -> DisplayPayload {
    let line2 = if alternation <= TEMPERATURE_TICKS {
        format!("Temp: {}°F", temperature)
    } else {
        format!("{} {}°F", mode, set_point)
    };
    DisplayPayload {
        line1: timestamp.to_string(),
        line2,
    }
}

pub fn render_serial(mode: Mode, temperature: Option<i32>, set_point: i32) -> String {
    match temperature {
        Some(temperature) => [
            mode.to_string(),
            temperature.to_string(),
            set_point.to_string(),
        ]
        .iter()
        .join(","),
        None => SERIAL_ERROR_RECORD.to_string(),
    }
}
