use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    Heat,
    Cool,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heat => "HEAT",
            Self::Cool => "COOL",
        }
    }

    /// Byte stored at the mode offset of the settings layout.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Cool => 0,
            Self::Heat => 1,
        }
    }

    /// Anything other than `1` decodes as `Cool`, the protected mode.
    pub fn from_byte(byte: u8) -> Self {
        if byte == 1 {
            Self::Heat
        } else {
            Self::Cool
        }
    }

    /// The remote surface models mode as a flag where `true` means heating.
    pub fn from_heat_flag(heat: bool) -> Self {
        if heat {
            Self::Heat
        } else {
            Self::Cool
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleReading {
    Valid(f32),
    SensorFailure,
}

impl SampleReading {
    /// Non-finite values are what a failed conversion looks like on most
    /// probes, so they fold into the failure sentinel.
    pub fn from_celsius(value: f32) -> Self {
        if value.is_finite() {
            Self::Valid(value)
        } else {
            Self::SensorFailure
        }
    }

    pub fn temperature(self) -> Option<f32> {
        match self {
            Self::Valid(value) => Some(value),
            Self::SensorFailure => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayAction {
    Energize,
    DeEnergize,
}

impl RelayAction {
    pub fn for_state(energized: bool) -> Self {
        if energized {
            Self::Energize
        } else {
            Self::DeEnergize
        }
    }

    pub fn energized(self) -> bool {
        self == Self::Energize
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    #[serde(rename = "currentTemp")]
    pub current_temp: Option<f32>,
    #[serde(rename = "sensorValid")]
    pub sensor_valid: bool,
    pub setpoint: f32,
    pub hysteresis: f32,
    pub mode: &'static str,
    #[serde(rename = "protectionTime")]
    pub protection_time_s: u32,
    #[serde(rename = "protectionActive")]
    pub protection_active: bool,
    #[serde(rename = "protectionRemainingMs")]
    pub protection_remaining_ms: u64,
    #[serde(rename = "relayEnergized")]
    pub relay_energized: bool,
    pub display: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_byte_encoding_matches_layout() {
        assert_eq!(Mode::Cool.to_byte(), 0);
        assert_eq!(Mode::Heat.to_byte(), 1);
        assert_eq!(Mode::from_byte(1), Mode::Heat);
        assert_eq!(Mode::from_byte(0), Mode::Cool);
        assert_eq!(Mode::from_byte(0xFF), Mode::Cool);
    }

    #[test]
    fn non_finite_sample_is_a_sensor_failure() {
        assert_eq!(SampleReading::from_celsius(f32::NAN), SampleReading::SensorFailure);
        assert_eq!(
            SampleReading::from_celsius(f32::NEG_INFINITY),
            SampleReading::SensorFailure
        );
        assert_eq!(SampleReading::from_celsius(-3.5).temperature(), Some(-3.5));
    }

    #[test]
    fn status_serializes_with_remote_names() {
        let status = ControllerStatus {
            current_temp: Some(5.5),
            sensor_valid: true,
            setpoint: 4.0,
            hysteresis: 1.0,
            mode: Mode::Cool.as_str(),
            protection_time_s: 30,
            protection_active: false,
            protection_remaining_ms: 0,
            relay_energized: true,
            display: "C. 4.0  5.5".to_string(),
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["currentTemp"], 5.5);
        assert_eq!(value["mode"], "COOL");
        assert_eq!(value["protectionTime"], 30);
        assert_eq!(value["relayEnergized"], true);
    }
}
