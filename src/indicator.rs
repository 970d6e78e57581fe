use crate::led::Led;
use crate::thermostat::Mode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndicatorSignal {
    Off,
    On,
    Pulse,
}

/// What both indicators should show for one set of conditions. Holds no
/// state of its own; the same arguments always produce the same plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndicatorPlan {
    pub heat: IndicatorSignal,
    pub cool: IndicatorSignal,
}

impl IndicatorPlan {
    pub fn for_conditions(mode: Mode, temperature: i32, set_point: i32) -> IndicatorPlan {
        match mode {
            Mode::Off => IndicatorPlan {
                heat: IndicatorSignal::Off,
                cool: IndicatorSignal::Off,
            },
            Mode::Heat => IndicatorPlan {
                heat: if temperature < set_point {
                    IndicatorSignal::Pulse
                } else {
                    IndicatorSignal::On
                },
                cool: IndicatorSignal::Off,
            },
            Mode::Cool => IndicatorPlan {
                heat: IndicatorSignal::Off,
                cool: if temperature > set_point {
                    IndicatorSignal::Pulse
                } else {
                    IndicatorSignal::On
                },
            },
        }
    }
}

pub trait IndicatorOutputs {
    fn set_heat(&mut self, signal: IndicatorSignal);
    fn set_cool(&mut self, signal: IndicatorSignal);

    /// Writes both outputs, even when a side is `Off`; no stale signal
    /// survives a mode change.
    fn apply(&mut self, plan: IndicatorPlan) {
        self.set_heat(plan.heat);
        self.set_cool(plan.cool);
    }
}

pub struct LedPair {
    heat: Led,
    cool: Led,
}

impl LedPair {
    pub fn new(heat: Led, cool: Led) -> LedPair {
        LedPair { heat, cool }
    }
}

impl IndicatorOutputs for LedPair {
    fn set_heat(&mut self, signal: IndicatorSignal) {
        self.heat.apply(signal);
    }

    fn set_cool(&mut self, signal: IndicatorSignal) {
        self.cool.apply(signal);
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn heat_below_set_point_pulses() {
        let plan = IndicatorPlan::for_conditions(Mode::Heat, 65, 70);
        assert_eq!(plan.heat, IndicatorSignal::Pulse);
        assert_eq!(plan.cool, IndicatorSignal::Off);
    }

    #[test]
    fn heat_at_set_point_holds_steady() {
        let plan = IndicatorPlan::for_conditions(Mode::Heat, 70, 70);
        assert_eq!(plan.heat, IndicatorSignal::On);
        assert_eq!(plan.cool, IndicatorSignal::Off);
    }

    #[test]
    fn cool_above_set_point_pulses() {
        let plan = IndicatorPlan::for_conditions(Mode::Cool, 75, 70);
        assert_eq!(plan.cool, IndicatorSignal::Pulse);
        assert_eq!(plan.heat, IndicatorSignal::Off);
    }

    #[test]
    fn cool_at_set_point_holds_steady() {
        let plan = IndicatorPlan::for_conditions(Mode::Cool, 70, 70);
        assert_eq!(plan.cool, IndicatorSignal::On);
        assert_eq!(plan.heat, IndicatorSignal::Off);
    }

    #[test]
    fn off_clears_both() {
        let plan = IndicatorPlan::for_conditions(Mode::Off, 65, 70);
        assert_eq!(plan.heat, IndicatorSignal::Off);
        assert_eq!(plan.cool, IndicatorSignal::Off);
    }

    #[test]
    fn plan_is_a_pure_function_of_its_arguments() {
        for mode in Mode::iter() {
            for temperature in [-10, 65, 70, 75] {
                for set_point in [60, 70, 80] {
                    let first = IndicatorPlan::for_conditions(mode, temperature, set_point);
                    let second = IndicatorPlan::for_conditions(mode, temperature, set_point);
                    assert_eq!(first, second);
                }
            }
        }
    }
}
