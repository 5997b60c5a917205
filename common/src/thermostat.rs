use crate::{
    config::Settings,
    display::{FixedStatus, StatusEncoder},
    protection::ProtectionTimer,
    types::{Mode, RelayAction, SampleReading},
};

/// Outcome of one sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub action: Option<RelayAction>,
    pub sensor_fault: bool,
}

#[derive(Debug, Clone)]
pub struct ThermostatController {
    relay_energized: bool,
    protection_active: bool,
    protection: ProtectionTimer,
    last_valid_temp: Option<f32>,
    sensor_fault: bool,
}

impl ThermostatController {
    /// Relay off, lock engaged.
    pub fn new(now_ms: u64) -> Self {
        Self {
            relay_energized: false,
            protection_active: true,
            protection: ProtectionTimer::new(now_ms),
            last_valid_temp: None,
            sensor_fault: false,
        }
    }

    pub fn relay_energized(&self) -> bool {
        self.relay_energized
    }

    pub fn protection_active(&self) -> bool {
        self.protection_active
    }

    pub fn protection_remaining_ms(&self, now_ms: u64, settings: &Settings) -> u64 {
        self.protection
            .remaining_ms(now_ms, settings.mode, settings.protection_time_s)
    }

    pub fn last_valid_temp(&self) -> Option<f32> {
        self.last_valid_temp
    }

    pub fn sensor_fault(&self) -> bool {
        self.sensor_fault
    }

    /// Runs on every scheduler pass, independent of the sampling cadence.
    pub fn refresh_protection(&mut self, now_ms: u64, settings: &Settings) -> bool {
        self.protection_active =
            self.protection
                .is_active(now_ms, settings.mode, settings.protection_time_s);
        self.protection_active
    }

    pub fn tick(
        &mut self,
        reading: SampleReading,
        settings: &Settings,
        now_ms: u64,
    ) -> TickOutcome {
        self.refresh_protection(now_ms, settings);

        let SampleReading::Valid(temperature) = reading else {
            self.sensor_fault = true;
            return TickOutcome {
                action: None,
                sensor_fault: true,
            };
        };
        self.sensor_fault = false;
        self.last_valid_temp = Some(temperature);

        let action = self
            .command_for(temperature, settings)
            .and_then(|energize| self.apply(energize, settings, now_ms));

        TickOutcome {
            action,
            sensor_fault: false,
        }
    }

    pub fn status(&self, settings: &Settings) -> FixedStatus {
        match self.last_valid_temp {
            Some(temperature) if !self.sensor_fault => StatusEncoder::encode(
                settings.mode,
                self.protection_active,
                settings.setpoint,
                temperature,
            ),
            _ => StatusEncoder::encode_error(
                settings.mode,
                self.protection_active,
                settings.setpoint,
            ),
        }
    }

    /// Desired relay state, or `None` inside the dead zone or under lock.
    fn command_for(&self, temperature: f32, settings: &Settings) -> Option<bool> {
        let lower = settings.lower_bound();
        let upper = settings.upper_bound();

        match settings.mode {
            Mode::Heat => {
                if temperature < lower {
                    Some(true)
                } else if temperature > upper {
                    Some(false)
                } else {
                    None
                }
            }
            Mode::Cool => {
                if self.protection_active {
                    None
                } else if temperature > upper {
                    Some(true)
                } else if temperature < lower {
                    Some(false)
                } else {
                    None
                }
            }
        }
    }

    fn apply(&mut self, energize: bool, settings: &Settings, now_ms: u64) -> Option<RelayAction> {
        if energize == self.relay_energized {
            return None;
        }

        self.relay_energized = energize;
        self.protection.record_transition(now_ms);
        self.refresh_protection(now_ms, settings);
        Some(RelayAction::for_state(energize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: Mode) -> Settings {
        Settings {
            setpoint: 4.0,
            hysteresis: 1.0,
            mode,
            protection_time_s: 30,
        }
    }

    fn unlocked(mode: Mode) -> (ThermostatController, Settings, u64) {
        let settings = settings(mode);
        let mut controller = ThermostatController::new(0);
        let now = 31_000;
        controller.refresh_protection(now, &settings);
        (controller, settings, now)
    }

    #[test]
    fn starts_off_and_locked() {
        let controller = ThermostatController::new(0);
        assert!(!controller.relay_energized());
        assert!(controller.protection_active());
    }

    #[test]
    fn heat_turns_on_below_band_and_off_above() {
        let settings = settings(Mode::Heat);
        let mut controller = ThermostatController::new(0);

        let outcome = controller.tick(SampleReading::Valid(2.9), &settings, 10);
        assert_eq!(outcome.action, Some(RelayAction::Energize));
        assert!(controller.relay_energized());

        let outcome = controller.tick(SampleReading::Valid(5.1), &settings, 20);
        assert_eq!(outcome.action, Some(RelayAction::DeEnergize));
        assert!(!controller.relay_energized());
    }

    #[test]
    fn heat_ignores_protection_entirely() {
        let mut settings = settings(Mode::Heat);
        settings.protection_time_s = 999;
        let mut controller = ThermostatController::new(0);

        controller.tick(SampleReading::Valid(0.0), &settings, 1);
        let outcome = controller.tick(SampleReading::Valid(9.0), &settings, 2);

        assert_eq!(outcome.action, Some(RelayAction::DeEnergize));
        assert!(!controller.protection_active());
    }

    #[test]
    fn dead_zone_holds_either_state() {
        for mode in [Mode::Heat, Mode::Cool] {
            for setpoint in [-18.0, -2.5, 0.0, 4.0, 21.5] {
                for hysteresis in [0.0, 0.5, 2.0] {
                    // No lock, so only the band decides.
                    let settings = Settings {
                        setpoint,
                        hysteresis,
                        mode,
                        protection_time_s: 0,
                    };
                    let lower = settings.lower_bound();
                    let upper = settings.upper_bound();
                    let inside: Vec<f32> = (0..=8)
                        .map(|step| match step {
                            0 => lower,
                            8 => upper,
                            _ => lower + (upper - lower) * step as f32 / 8.0,
                        })
                        .collect();
                    let outside_on = match mode {
                        Mode::Heat => lower - 1.0,
                        Mode::Cool => upper + 1.0,
                    };

                    let mut controller = ThermostatController::new(0);
                    for &temperature in &inside {
                        let outcome =
                            controller.tick(SampleReading::Valid(temperature), &settings, 1);
                        assert_eq!(outcome.action, None, "{settings:?} at {temperature}");
                        assert!(!controller.relay_energized());
                    }

                    let outcome =
                        controller.tick(SampleReading::Valid(outside_on), &settings, 2);
                    assert_eq!(outcome.action, Some(RelayAction::Energize), "{settings:?}");
                    for &temperature in &inside {
                        let outcome =
                            controller.tick(SampleReading::Valid(temperature), &settings, 3);
                        assert_eq!(outcome.action, None, "{settings:?} at {temperature}");
                        assert!(controller.relay_energized());
                    }
                }
            }
        }
    }

    #[test]
    fn cool_is_mirrored() {
        let (mut controller, settings, now) = unlocked(Mode::Cool);

        let outcome = controller.tick(SampleReading::Valid(5.5), &settings, now);
        assert_eq!(outcome.action, Some(RelayAction::Energize));

        let later = now + 30_000;
        let outcome = controller.tick(SampleReading::Valid(2.5), &settings, later);
        assert_eq!(outcome.action, Some(RelayAction::DeEnergize));
    }

    #[test]
    fn cool_never_transitions_while_locked() {
        let settings = settings(Mode::Cool);
        let mut controller = ThermostatController::new(0);

        let mut temperature = -60.0f32;
        let mut now = 0;
        while temperature < 60.0 {
            let outcome = controller.tick(SampleReading::Valid(temperature), &settings, now);
            assert_eq!(outcome.action, None, "transition at {temperature}");
            assert!(!controller.relay_energized());
            temperature += 0.37;
            now += 250;
            if now >= 29_999 {
                now = 0;
            }
        }
    }

    #[test]
    fn transition_re_engages_the_lock() {
        let (mut controller, settings, now) = unlocked(Mode::Cool);

        controller.tick(SampleReading::Valid(6.0), &settings, now);
        assert!(controller.relay_energized());
        assert!(controller.protection_active());

        let outcome = controller.tick(SampleReading::Valid(-10.0), &settings, now + 29_999);
        assert_eq!(outcome.action, None);
        assert!(controller.relay_energized());
    }

    #[test]
    fn repeated_command_does_not_reset_timer() {
        let settings = settings(Mode::Heat);
        let mut controller = ThermostatController::new(0);

        controller.tick(SampleReading::Valid(0.0), &settings, 1_000);
        assert_eq!(controller.protection.last_transition_ms(), 1_000);

        let outcome = controller.tick(SampleReading::Valid(0.0), &settings, 2_000);
        assert_eq!(outcome.action, None);
        assert_eq!(controller.protection.last_transition_ms(), 1_000);
    }

    #[test]
    fn zero_hysteresis_is_a_point_band() {
        let mut settings = settings(Mode::Heat);
        settings.hysteresis = 0.0;
        let mut controller = ThermostatController::new(0);

        assert_eq!(controller.tick(SampleReading::Valid(4.0), &settings, 1).action, None);
        assert_eq!(
            controller.tick(SampleReading::Valid(3.9), &settings, 2).action,
            Some(RelayAction::Energize)
        );
        assert_eq!(
            controller.tick(SampleReading::Valid(4.1), &settings, 3).action,
            Some(RelayAction::DeEnergize)
        );
    }

    #[test]
    fn sensor_failure_holds_relay_and_reports_error() {
        let settings = settings(Mode::Heat);
        let mut controller = ThermostatController::new(0);
        controller.tick(SampleReading::Valid(0.0), &settings, 1);

        let outcome = controller.tick(SampleReading::SensorFailure, &settings, 2);

        assert_eq!(
            outcome,
            TickOutcome {
                action: None,
                sensor_fault: true
            }
        );
        assert!(controller.relay_energized());
        assert_eq!(controller.last_valid_temp(), Some(0.0));
        assert_eq!(controller.status(&settings).render(), "H 4.0  Er.");
    }
}
