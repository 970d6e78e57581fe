use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use strum_macros::EnumIter;
use thiserror::Error;

use crate::indicator::{IndicatorOutputs, IndicatorPlan, IndicatorSignal};
use crate::sensor;

/// Operating modes form a strict cycle: Off -> Heat -> Cool -> Off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter)]
pub enum Mode {
    Off,
    Heat,
    Cool,
}

impl Mode {
    pub fn next(self) -> Mode {
        match self {
            Mode::Off => Mode::Heat,
            Mode::Heat => Mode::Cool,
            Mode::Cool => Mode::Off,
        }
    }

    /// The label persisted to storage and emitted over serial.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::Heat => "heat",
            Mode::Cool => "cool",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Error, Debug)]
#[error("Invalid mode name")]
pub struct ParseModeError {}

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" => Ok(Mode::Off),
            "heat" => Ok(Mode::Heat),
            "cool" => Ok(Mode::Cool),
            _ => Err(ParseModeError {}),
        }
    }
}

/// The thermostat state machine. Owns the indicator outputs; every mode
/// transition and set-point change updates them before the call returns.
pub struct Thermostat<O> {
    mode: Mode,
    set_point: i32,
    indicators: O,
}

impl<O: IndicatorOutputs> Thermostat<O> {
    pub fn new(indicators: O, set_point: i32) -> Thermostat<O> {
        let mut thermostat = Thermostat {
            mode: Mode::Off,
            set_point,
            indicators,
        };
        thermostat.enter(Mode::Off);
        thermostat
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_point(&self) -> i32 {
        self.set_point
    }

    /// Advance one step along the mode cycle, dispatching the exit hook of
    /// the old mode and the enter hook of the new one.
    pub fn cycle(&mut self) {
        let next = self.mode.next();
        self.exit(self.mode);
        self.mode = next;
        self.enter(next);
    }

    pub fn increase_set_point(&mut self, temperature: sensor::Result<i32>) {
        self.set_point += 1;
        info!("increased set point to {}", self.set_point);
        self.refresh_indicators(temperature);
    }

    pub fn decrease_set_point(&mut self, temperature: sensor::Result<i32>) {
        self.set_point -= 1;
        info!("decreased set point to {}", self.set_point);
        self.refresh_indicators(temperature);
    }

    /// Reapply the indicator policy for the current conditions. A failed
    /// temperature read leaves the outputs in their previous physical state.
    pub fn refresh_indicators(&mut self, temperature: sensor::Result<i32>) {
        let temperature = match temperature {
            Ok(temperature) => temperature,
            Err(e) => {
                error!("temperature read failed, leaving indicators untouched: {}", e);
                return;
            }
        };
        self.indicators
            .apply(IndicatorPlan::for_conditions(self.mode, temperature, self.set_point));
        debug!(
            "state: {}, temp: {}, set point: {}",
            self.mode, temperature, self.set_point
        );
    }

    fn enter(&mut self, mode: Mode) {
        match mode {
            Mode::Heat => {
                self.indicators.set_heat(IndicatorSignal::On);
                self.indicators.set_cool(IndicatorSignal::Off);
            }
            Mode::Cool => {
                self.indicators.set_cool(IndicatorSignal::On);
                self.indicators.set_heat(IndicatorSignal::Off);
            }
            Mode::Off => {
                self.indicators.set_heat(IndicatorSignal::Off);
                self.indicators.set_cool(IndicatorSignal::Off);
            }
        }
        info!("state changed to {}", mode);
    }

    fn exit(&mut self, mode: Mode) {
        match mode {
            Mode::Heat => self.indicators.set_heat(IndicatorSignal::Off),
            Mode::Cool => self.indicators.set_cool(IndicatorSignal::Off),
            Mode::Off => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;
    use crate::sensor::SensorError;

    #[derive(Default)]
    struct FakeOutputs {
        heat: Vec<IndicatorSignal>,
        cool: Vec<IndicatorSignal>,
    }

    impl FakeOutputs {
        fn current(&self) -> (Option<IndicatorSignal>, Option<IndicatorSignal>) {
            (self.heat.last().copied(), self.cool.last().copied())
        }

        fn writes(&self) -> usize {
            self.heat.len() + self.cool.len()
        }
    }

    impl IndicatorOutputs for FakeOutputs {
        fn set_heat(&mut self, signal: IndicatorSignal) {
            self.heat.push(signal);
        }

        fn set_cool(&mut self, signal: IndicatorSignal) {
            self.cool.push(signal);
        }
    }

    fn machine(set_point: i32) -> Thermostat<FakeOutputs> {
        Thermostat::new(FakeOutputs::default(), set_point)
    }

    #[test]
    fn starts_off() {
        let tsm = machine(70);
        assert_eq!(tsm.mode(), Mode::Off);
        assert_eq!(
            tsm.indicators.current(),
            (Some(IndicatorSignal::Off), Some(IndicatorSignal::Off))
        );
    }

    #[test]
    fn cycle_walks_the_mode_graph_with_period_three() {
        let mut tsm = machine(70);
        let mut seen = Vec::new();
        for _ in 0..9 {
            tsm.cycle();
            seen.push(tsm.mode());
        }
        assert_eq!(
            seen,
            vec![
                Mode::Heat,
                Mode::Cool,
                Mode::Off,
                Mode::Heat,
                Mode::Cool,
                Mode::Off,
                Mode::Heat,
                Mode::Cool,
                Mode::Off,
            ]
        );
    }

    #[test]
    fn every_mode_has_a_distinct_successor() {
        let mut successors: Vec<_> = Mode::iter().map(Mode::next).collect();
        successors.sort_by_key(|m| m.label());
        successors.dedup();
        assert_eq!(successors.len(), 3);
    }

    #[test]
    fn entering_heat_turns_heat_on_and_cool_off() {
        let mut tsm = machine(70);
        tsm.cycle();
        assert_eq!(tsm.mode(), Mode::Heat);
        assert_eq!(
            tsm.indicators.current(),
            (Some(IndicatorSignal::On), Some(IndicatorSignal::Off))
        );
    }

    #[test]
    fn entering_cool_turns_cool_on_and_heat_off() {
        let mut tsm = machine(70);
        tsm.cycle();
        tsm.cycle();
        assert_eq!(tsm.mode(), Mode::Cool);
        assert_eq!(
            tsm.indicators.current(),
            (Some(IndicatorSignal::Off), Some(IndicatorSignal::On))
        );
    }

    #[test]
    fn returning_to_off_clears_both() {
        let mut tsm = machine(70);
        tsm.cycle();
        tsm.cycle();
        tsm.cycle();
        assert_eq!(tsm.mode(), Mode::Off);
        assert_eq!(
            tsm.indicators.current(),
            (Some(IndicatorSignal::Off), Some(IndicatorSignal::Off))
        );
    }

    #[test]
    fn set_point_adjustments_are_inverse() {
        let mut tsm = machine(70);
        tsm.increase_set_point(Ok(68));
        tsm.decrease_set_point(Ok(68));
        assert_eq!(tsm.set_point(), 70);
        tsm.decrease_set_point(Ok(68));
        tsm.increase_set_point(Ok(68));
        assert_eq!(tsm.set_point(), 70);
    }

    #[test]
    fn set_point_is_unbounded_below() {
        let mut tsm = machine(0);
        for _ in 0..80 {
            tsm.decrease_set_point(Ok(68));
        }
        assert_eq!(tsm.set_point(), -80);
    }

    #[test]
    fn adjustment_reapplies_the_pulse_policy() {
        let mut tsm = machine(64);
        tsm.cycle();
        tsm.increase_set_point(Ok(60));
        // 60 < 65 while heating
        assert_eq!(
            tsm.indicators.current(),
            (Some(IndicatorSignal::Pulse), Some(IndicatorSignal::Off))
        );
    }

    #[test]
    fn failed_read_leaves_indicators_untouched() {
        let mut tsm = machine(70);
        tsm.cycle();
        let writes = tsm.indicators.writes();
        tsm.refresh_indicators(Err(SensorError::Mutex));
        assert_eq!(tsm.indicators.writes(), writes);
        assert_eq!(
            tsm.indicators.current(),
            (Some(IndicatorSignal::On), Some(IndicatorSignal::Off))
        );
    }

    #[test]
    fn labels_round_trip_through_from_str() {
        for mode in Mode::iter() {
            assert_eq!(mode.label().parse::<Mode>().unwrap(), mode);
        }
        assert!("fan".parse::<Mode>().is_err());
    }
}
