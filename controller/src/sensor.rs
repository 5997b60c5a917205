use relay_thermostat_common::{SampleReading, ThermostatConfig};

/// Latest temperature pushed by the sensor node, turned into one
/// [`SampleReading`] per sampling tick.
#[derive(Debug, Default)]
pub struct SensorFeed {
    latest: Option<Sample>,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    temp_c: f32,
    received_ms: u64,
}

impl SensorFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the payload was a failure report or implausible.
    /// Such a payload also invalidates the previous sample.
    pub fn record_payload(
        &mut self,
        payload: &str,
        now_ms: u64,
        config: &ThermostatConfig,
    ) -> bool {
        match payload.trim().parse::<f32>() {
            Ok(temp_c) if config.is_plausible(temp_c) => {
                self.latest = Some(Sample {
                    temp_c,
                    received_ms: now_ms,
                });
                true
            }
            _ => {
                self.latest = None;
                false
            }
        }
    }

    pub fn sample(&self, now_ms: u64, config: &ThermostatConfig) -> SampleReading {
        match self.latest {
            Some(sample)
                if now_ms.saturating_sub(sample.received_ms) < config.sensor_stale_timeout_ms =>
            {
                SampleReading::from_celsius(sample.temp_c)
            }
            _ => SampleReading::SensorFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sample_yet_is_a_failure() {
        let feed = SensorFeed::new();
        assert_eq!(
            feed.sample(0, &ThermostatConfig::default()),
            SampleReading::SensorFailure
        );
    }

    #[test]
    fn fresh_sample_is_valid_until_stale() {
        let config = ThermostatConfig::default();
        let mut feed = SensorFeed::new();
        assert!(feed.record_payload("5.25", 1_000, &config));

        assert_eq!(feed.sample(1_000, &config), SampleReading::Valid(5.25));
        assert_eq!(
            feed.sample(1_000 + config.sensor_stale_timeout_ms - 1, &config),
            SampleReading::Valid(5.25)
        );
        assert_eq!(
            feed.sample(1_000 + config.sensor_stale_timeout_ms, &config),
            SampleReading::SensorFailure
        );
    }

    #[test]
    fn error_payload_clears_the_last_sample() {
        let config = ThermostatConfig::default();
        let mut feed = SensorFeed::new();
        feed.record_payload("4.0", 0, &config);

        assert!(!feed.record_payload("err", 10, &config));
        assert_eq!(feed.sample(10, &config), SampleReading::SensorFailure);
    }

    #[test]
    fn implausible_values_are_failures() {
        let config = ThermostatConfig::default();
        let mut feed = SensorFeed::new();

        assert!(!feed.record_payload("nan", 0, &config));
        assert!(!feed.record_payload("-127", 0, &config));
        assert!(!feed.record_payload("850", 0, &config));
    }
}
