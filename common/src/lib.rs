pub mod appliance;
pub mod clock;
pub mod config;
pub mod display;
pub mod protection;
pub mod store;
pub mod thermostat;
pub mod topics;
pub mod types;

pub use appliance::{Appliance, TickReport};
pub use clock::{Clock, ManualClock};
pub use config::{NetworkConfig, RuntimeConfig, Settings, ThermostatConfig};
pub use display::{FixedStatus, StatusEncoder};
pub use protection::ProtectionTimer;
pub use store::{ByteStore, MemoryByteStore, SettingsError, SettingsStore, StoreError};
pub use thermostat::{ThermostatController, TickOutcome};
pub use topics::*;
pub use types::{ControllerStatus, Mode, RelayAction, SampleReading};
