use crate::{
    clock::Clock,
    config::Settings,
    display::FixedStatus,
    store::{ByteStore, SettingsError, SettingsStore, StoreError},
    thermostat::ThermostatController,
    types::{ControllerStatus, Mode, RelayAction, SampleReading},
};

/// What one sampling tick produced for the host to act on.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub action: Option<RelayAction>,
    pub status: FixedStatus,
    /// Set only on ticks that carried a valid sample.
    pub current_temp: Option<f32>,
}

/// The controller, its settings and its clock, driven by one scheduler.
///
/// Nothing in here blocks; the host calls [`Appliance::poll`] on every pass
/// of its loop and [`Appliance::tick`] on every sampling period.
pub struct Appliance<B, C> {
    store: SettingsStore<B>,
    controller: ThermostatController,
    clock: C,
}

impl<B: ByteStore, C: Clock> Appliance<B, C> {
    /// Loads persisted settings and seeds the compressor lock. A storage
    /// fault is handed back alongside a working appliance running on
    /// compiled-in defaults.
    pub fn start(backend: B, clock: C) -> (Self, Option<StoreError>) {
        let mut store = SettingsStore::new(backend);
        let fault = store.initialize().err();
        let controller = ThermostatController::new(clock.now_ms());

        let appliance = Self {
            store,
            controller,
            clock,
        };
        (appliance, fault)
    }

    pub fn settings(&self) -> Settings {
        self.store.settings()
    }

    pub fn controller(&self) -> &ThermostatController {
        &self.controller
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn poll(&mut self) -> bool {
        let settings = self.store.settings();
        self.controller
            .refresh_protection(self.clock.now_ms(), &settings)
    }

    pub fn tick(&mut self, reading: SampleReading) -> TickReport {
        let settings = self.store.settings();
        let outcome = self
            .controller
            .tick(reading, &settings, self.clock.now_ms());

        TickReport {
            action: outcome.action,
            status: self.controller.status(&settings),
            current_temp: reading.temperature(),
        }
    }

    pub fn status_line(&self) -> FixedStatus {
        self.controller.status(&self.store.settings())
    }

    pub fn status(&self) -> ControllerStatus {
        let settings = self.store.settings();
        let now_ms = self.clock.now_ms();
        ControllerStatus {
            current_temp: self.controller.last_valid_temp(),
            sensor_valid: !self.controller.sensor_fault()
                && self.controller.last_valid_temp().is_some(),
            setpoint: settings.setpoint,
            hysteresis: settings.hysteresis,
            mode: settings.mode.as_str(),
            protection_time_s: settings.protection_time_s,
            protection_active: self.controller.protection_active(),
            protection_remaining_ms: self.controller.protection_remaining_ms(now_ms, &settings),
            relay_energized: self.controller.relay_energized(),
            display: self.status_line().render(),
        }
    }

    // Every setter refreshes the lock at once so a mode or window change is
    // visible before the next sample arrives.

    pub fn set_setpoint(&mut self, setpoint: f32) -> Result<(), SettingsError> {
        let result = self.store.set_setpoint(setpoint);
        self.poll();
        result
    }

    pub fn set_hysteresis(&mut self, hysteresis: f32) -> Result<(), SettingsError> {
        let result = self.store.set_hysteresis(hysteresis);
        self.poll();
        result
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SettingsError> {
        let result = self.store.set_mode(mode);
        self.poll();
        result
    }

    pub fn set_protection_time(&mut self, seconds: i64) -> Result<(), SettingsError> {
        let result = self.store.set_protection_time(seconds);
        self.poll();
        result
    }
}
