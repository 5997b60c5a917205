//! Durable settings over a byte-addressable store.
//!
//! The layout is fixed and field-granular so a setter only rewrites the bytes
//! of the field it owns:
//!
//! | offset | field                | width |
//! |--------|----------------------|-------|
//! | 0      | validity marker      | 1     |
//! | 1      | setpoint (`f32` LE)  | 4     |
//! | 5      | mode (0 cool, 1 heat)| 1     |
//! | 6      | hysteresis (`f32` LE)| 4     |
//! | 10     | protection time (`u32` LE) | 4 |

use thiserror::Error;

use crate::{
    config::{clamp_hysteresis, clamp_protection_time, Settings},
    types::Mode,
};

pub const LAYOUT_MARKER: u8 = 0xA5;
pub const LAYOUT_LEN: usize = 14;

const MARKER_OFFSET: usize = 0;
const SETPOINT_OFFSET: usize = 1;
const MODE_OFFSET: usize = 5;
const HYSTERESIS_OFFSET: usize = 6;
const PROTECTION_OFFSET: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("access of {len} bytes at offset {offset} exceeds store capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
}

/// Byte-addressable persistence, the shape of an EEPROM or a small flash page.
///
/// A successful `write` must be durable by the time it returns.
pub trait ByteStore {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError>;
    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct MemoryByteStore {
    bytes: Vec<u8>,
    writes: usize,
}

impl MemoryByteStore {
    /// A blank part reads as erased flash.
    pub fn new() -> Self {
        Self::with_contents(vec![0xFF; LAYOUT_LEN])
    }

    pub fn with_contents(bytes: Vec<u8>) -> Self {
        Self { bytes, writes: 0 }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl Default for MemoryByteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteStore for MemoryByteStore {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        let range = checked_range(offset, buf.len(), self.bytes.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) -> Result<(), StoreError> {
        let range = checked_range(offset, bytes.len(), self.bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }
}

pub fn checked_range(
    offset: usize,
    len: usize,
    capacity: usize,
) -> Result<std::ops::Range<usize>, StoreError> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(offset..end),
        _ => Err(StoreError::OutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}

/// Owns the persisted settings and keeps an in-memory copy that is always
/// the value the controller should act on, even when the backend is failing.
#[derive(Debug)]
pub struct SettingsStore<B> {
    backend: B,
    settings: Settings,
}

impl<B: ByteStore> SettingsStore<B> {
    /// Starts from compiled-in defaults; call [`SettingsStore::initialize`]
    /// to bring the persisted values in.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            settings: Settings::default(),
        }
    }

    /// First access: a missing or foreign marker means the part has never
    /// held our layout, so defaults are written out before being returned.
    ///
    /// On error the cached settings stay at their defaults.
    pub fn initialize(&mut self) -> Result<Settings, StoreError> {
        let mut marker = [0u8; 1];
        self.backend.read(MARKER_OFFSET, &mut marker)?;

        if marker[0] != LAYOUT_MARKER {
            let defaults = Settings::default();
            self.settings = defaults;
            self.save(&defaults)?;
            self.backend.write(MARKER_OFFSET, &[LAYOUT_MARKER])?;
            return Ok(defaults);
        }

        self.load()
    }

    /// Reads every field back from the backend and refreshes the cache.
    pub fn load(&mut self) -> Result<Settings, StoreError> {
        let mut settings = Settings {
            setpoint: self.read_f32(SETPOINT_OFFSET)?,
            hysteresis: self.read_f32(HYSTERESIS_OFFSET)?,
            mode: Mode::from_byte(self.read_u8(MODE_OFFSET)?),
            protection_time_s: self.read_u32(PROTECTION_OFFSET)?,
        };
        settings.sanitize();
        self.settings = settings;
        Ok(settings)
    }

    /// Writes all four fields. The marker is left alone.
    pub fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        let mut settings = *settings;
        settings.sanitize();
        self.settings = settings;

        self.backend
            .write(SETPOINT_OFFSET, &settings.setpoint.to_le_bytes())?;
        self.backend.write(MODE_OFFSET, &[settings.mode.to_byte()])?;
        self.backend
            .write(HYSTERESIS_OFFSET, &settings.hysteresis.to_le_bytes())?;
        self.backend
            .write(PROTECTION_OFFSET, &settings.protection_time_s.to_le_bytes())?;
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn set_setpoint(&mut self, setpoint: f32) -> Result<(), SettingsError> {
        if !setpoint.is_finite() {
            return Err(SettingsError::NonFinite("setpoint"));
        }
        self.settings.setpoint = setpoint;
        self.backend
            .write(SETPOINT_OFFSET, &setpoint.to_le_bytes())?;
        Ok(())
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SettingsError> {
        self.settings.mode = mode;
        self.backend.write(MODE_OFFSET, &[mode.to_byte()])?;
        Ok(())
    }

    /// Negative input clamps to zero.
    pub fn set_hysteresis(&mut self, hysteresis: f32) -> Result<(), SettingsError> {
        if !hysteresis.is_finite() {
            return Err(SettingsError::NonFinite("hysteresis"));
        }
        let hysteresis = clamp_hysteresis(hysteresis);
        self.settings.hysteresis = hysteresis;
        self.backend
            .write(HYSTERESIS_OFFSET, &hysteresis.to_le_bytes())?;
        Ok(())
    }

    /// Clamps to `0..=999` seconds before storing.
    pub fn set_protection_time(&mut self, seconds: i64) -> Result<(), SettingsError> {
        let seconds = clamp_protection_time(seconds);
        self.settings.protection_time_s = seconds;
        self.backend
            .write(PROTECTION_OFFSET, &seconds.to_le_bytes())?;
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn read_u8(&self, offset: usize) -> Result<u8, StoreError> {
        let mut buf = [0u8; 1];
        self.backend.read(offset, &mut buf)?;
        Ok(buf[0])
    }

    fn read_f32(&self, offset: usize) -> Result<f32, StoreError> {
        let mut buf = [0u8; 4];
        self.backend.read(offset, &mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    fn read_u32(&self, offset: usize) -> Result<u32, StoreError> {
        let mut buf = [0u8; 4];
        self.backend.read(offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}
