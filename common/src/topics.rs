pub const TOPIC_SENSOR_TEMP: &str = "thermostat/sensor/temperature";

pub const TOPIC_STATE: &str = "thermostat/state";
pub const TOPIC_STATE_CURRENT_TEMP: &str = "thermostat/state/currentTemp";

pub const TOPIC_CMD_SETPOINT: &str = "thermostat/cmnd/setpoint";
pub const TOPIC_CMD_HYSTERESIS: &str = "thermostat/cmnd/hysteresis";
pub const TOPIC_CMD_MODE: &str = "thermostat/cmnd/mode";
pub const TOPIC_CMD_PROTECTION_TIME: &str = "thermostat/cmnd/protectionTime";
