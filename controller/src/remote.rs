use relay_thermostat_common::{
    Appliance, ByteStore, Clock, Mode, SettingsError, TOPIC_CMD_HYSTERESIS, TOPIC_CMD_MODE,
    TOPIC_CMD_PROTECTION_TIME, TOPIC_CMD_SETPOINT,
};
use thiserror::Error;

/// One write to the remote configuration surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemoteCommand {
    SetSetpoint(f32),
    SetHysteresis(f32),
    SetMode(Mode),
    SetProtectionTime(i64),
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("invalid {field} value '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

impl RemoteCommand {
    /// `Ok(None)` for topics that are not configuration commands.
    pub fn from_topic(topic: &str, payload: &str) -> Result<Option<Self>, CommandError> {
        let command = match topic {
            TOPIC_CMD_SETPOINT => Self::setpoint(payload)?,
            TOPIC_CMD_HYSTERESIS => Self::hysteresis(payload)?,
            TOPIC_CMD_MODE => Self::mode(payload)?,
            TOPIC_CMD_PROTECTION_TIME => Self::protection_time(payload)?,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    pub fn setpoint(raw: &str) -> Result<Self, CommandError> {
        parse_finite(raw, "setpoint").map(Self::SetSetpoint)
    }

    pub fn hysteresis(raw: &str) -> Result<Self, CommandError> {
        parse_finite(raw, "hysteresis").map(Self::SetHysteresis)
    }

    pub fn mode(raw: &str) -> Result<Self, CommandError> {
        let heat = match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "heat" => true,
            "false" | "0" | "cool" => false,
            _ => return Err(invalid("mode", raw)),
        };
        Ok(Self::SetMode(Mode::from_heat_flag(heat)))
    }

    /// Out-of-range integers are accepted here; the store clamps them.
    pub fn protection_time(raw: &str) -> Result<Self, CommandError> {
        let trimmed = raw.trim();
        if let Ok(seconds) = trimmed.parse::<i64>() {
            return Ok(Self::SetProtectionTime(seconds));
        }
        // Sync layers that only speak floats send "30.0".
        match trimmed.parse::<f64>() {
            Ok(seconds) if seconds.is_finite() => Ok(Self::SetProtectionTime(seconds as i64)),
            _ => Err(invalid("protectionTime", raw)),
        }
    }

    pub fn apply<B: ByteStore, C: Clock>(
        self,
        appliance: &mut Appliance<B, C>,
    ) -> Result<(), SettingsError> {
        match self {
            Self::SetSetpoint(value) => appliance.set_setpoint(value),
            Self::SetHysteresis(value) => appliance.set_hysteresis(value),
            Self::SetMode(mode) => appliance.set_mode(mode),
            Self::SetProtectionTime(seconds) => appliance.set_protection_time(seconds),
        }
    }
}

fn parse_finite(raw: &str, field: &'static str) -> Result<f32, CommandError> {
    match raw.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(field, raw)),
    }
}

fn invalid(field: &'static str, raw: &str) -> CommandError {
    CommandError::InvalidValue {
        field,
        value: raw.to_string(),
    }
}
