use serde::{Deserialize, Serialize};

use crate::types::Mode;

pub const MAX_PROTECTION_TIME_S: u32 = 999;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThermostatConfig {
    pub sample_interval_ms: u64,
    pub scheduler_pass_ms: u64,
    pub sensor_stale_timeout_ms: u64,
    pub state_publish_interval_ms: u64,
    pub min_valid_temp_c: f32,
    pub max_valid_temp_c: f32,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 5_000,
            scheduler_pass_ms: 100,
            sensor_stale_timeout_ms: 15_000,
            state_publish_interval_ms: 10_000,
            min_valid_temp_c: -55.0,
            max_valid_temp_c: 125.0,
        }
    }
}

impl ThermostatConfig {
    pub fn sanitize(&mut self) {
        self.sample_interval_ms = self.sample_interval_ms.clamp(1_000, 60_000);
        // A pass must fit inside a tick or protection would only refresh per sample.
        self.scheduler_pass_ms = self.scheduler_pass_ms.clamp(10, self.sample_interval_ms);
        self.sensor_stale_timeout_ms = self
            .sensor_stale_timeout_ms
            .max(self.sample_interval_ms);
        self.state_publish_interval_ms = self.state_publish_interval_ms.clamp(1_000, 600_000);

        if !self.min_valid_temp_c.is_finite() || !self.max_valid_temp_c.is_finite() {
            let defaults = Self::default();
            self.min_valid_temp_c = defaults.min_valid_temp_c;
            self.max_valid_temp_c = defaults.max_valid_temp_c;
        }
        if self.min_valid_temp_c > self.max_valid_temp_c {
            std::mem::swap(&mut self.min_valid_temp_c, &mut self.max_valid_temp_c);
        }
    }

    pub fn is_plausible(&self, temp_c: f32) -> bool {
        temp_c.is_finite() && (self.min_valid_temp_c..=self.max_valid_temp_c).contains(&temp_c)
    }
}

/// The four tunables that survive power loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub setpoint: f32,
    pub hysteresis: f32,
    pub mode: Mode,
    pub protection_time_s: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            setpoint: 4.0,
            hysteresis: 1.0,
            mode: Mode::Cool,
            protection_time_s: 30,
        }
    }
}

impl Settings {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !self.setpoint.is_finite() {
            self.setpoint = defaults.setpoint;
        }
        if !self.hysteresis.is_finite() {
            self.hysteresis = defaults.hysteresis;
        }
        self.hysteresis = clamp_hysteresis(self.hysteresis);
        self.protection_time_s = self.protection_time_s.min(MAX_PROTECTION_TIME_S);
    }

    pub fn lower_bound(&self) -> f32 {
        self.setpoint - self.hysteresis
    }

    pub fn upper_bound(&self) -> f32 {
        self.setpoint + self.hysteresis
    }
}

pub fn clamp_protection_time(seconds: i64) -> u32 {
    // Lossless: the clamped value always fits in u32.
    seconds.clamp(0, i64::from(MAX_PROTECTION_TIME_S)) as u32
}

pub fn clamp_hysteresis(hysteresis: f32) -> f32 {
    hysteresis.max(0.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub mqtt_client_id: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            mqtt_client_id: "relay-thermostat".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub thermostat: ThermostatConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_http_port() -> u16 {
    8080
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thermostat: ThermostatConfig::default(),
            network: NetworkConfig::default(),
            http_port: default_http_port(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_slice(raw)?;
        config.sanitize();
        Ok(config)
    }

    pub fn sanitize(&mut self) {
        self.thermostat.sanitize();
        if self.network.mqtt_port == 0 {
            self.network.mqtt_port = NetworkConfig::default().mqtt_port;
        }
        if self.network.mqtt_client_id.trim().is_empty() {
            self.network.mqtt_client_id = NetworkConfig::default().mqtt_client_id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_first_boot_values() {
        let settings = Settings::default();
        assert_eq!(settings.setpoint, 4.0);
        assert_eq!(settings.hysteresis, 1.0);
        assert_eq!(settings.mode, Mode::Cool);
        assert_eq!(settings.protection_time_s, 30);
    }

    #[test]
    fn protection_time_clamps_to_range() {
        assert_eq!(clamp_protection_time(-5), 0);
        assert_eq!(clamp_protection_time(5_000), 999);
        assert_eq!(clamp_protection_time(999), 999);
        assert_eq!(clamp_protection_time(i64::MIN), 0);
    }

    #[test]
    fn sanitize_replaces_corrupt_fields() {
        let mut settings = Settings {
            setpoint: f32::NAN,
            hysteresis: -2.0,
            mode: Mode::Heat,
            protection_time_s: 70_000,
        };
        settings.sanitize();

        assert_eq!(
            settings,
            Settings {
                setpoint: 4.0,
                hysteresis: 0.0,
                mode: Mode::Heat,
                protection_time_s: 999,
            }
        );
    }

    #[test]
    fn runtime_config_fills_missing_sections() {
        let config = RuntimeConfig::from_json(br#"{"http_port": 9090}"#).unwrap();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.thermostat.sample_interval_ms, 5_000);
        assert_eq!(config.network.mqtt_port, 1883);
    }

    #[test]
    fn scheduler_pass_never_exceeds_sample_interval() {
        let mut config = ThermostatConfig {
            scheduler_pass_ms: 30_000,
            sample_interval_ms: 5_000,
            ..ThermostatConfig::default()
        };
        config.sanitize();
        assert_eq!(config.scheduler_pass_ms, 5_000);
    }

    #[test]
    fn plausibility_window_is_inclusive() {
        let config = ThermostatConfig::default();
        assert!(config.is_plausible(-55.0));
        assert!(config.is_plausible(125.0));
        assert!(!config.is_plausible(125.5));
        assert!(!config.is_plausible(f32::NAN));
    }
}
