//! Configuration and capture errors.

use core::fmt;

use pico_dvp_hal::EngineId;

/// A configuration value the capture hardware cannot represent.
///
/// Raised synchronously while building a session; nothing after activation
/// produces one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Pin index does not fit the 5-bit operand field.
    PinOutOfRange { pin: u8 },
    /// Data pin count outside 1..=8.
    DataPinCount(u8),
    /// Data bus runs past the last addressable pin.
    DataPinsOutOfRange { base: u8, count: u8 },
    /// Pin used for two different signals.
    PinConflict { pin: u8 },
    /// Width or height of zero.
    EmptyGeometry,
    /// Bytes per pixel outside 1..=4.
    BytesPerPixel(u8),
    /// Frame buffer smaller than one frame.
    BufferTooSmall { needed: u32, available: u32 },
    /// Frame word count exceeds the transfer counter.
    TransferTooLong { words: u32 },
    /// Frame transfer of zero words.
    EmptyTransfer,
    /// Drain step allowed to discard nothing, so any stale word stalls.
    ZeroDrainLimit,
    /// Engine index beyond the available state machines.
    EngineOutOfRange(EngineId),
    /// Master clock frequency not reachable from the system clock.
    ClockOutOfRange { hz: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PinOutOfRange { pin } => write!(f, "pin {pin} out of range 0-31"),
            ConfigError::DataPinCount(count) => {
                write!(f, "data pin count {count} out of range 1-8")
            }
            ConfigError::DataPinsOutOfRange { base, count } => {
                write!(f, "data pins {base}..{} run past pin 31", *base as u16 + *count as u16)
            }
            ConfigError::PinConflict { pin } => write!(f, "pin {pin} assigned twice"),
            ConfigError::EmptyGeometry => write!(f, "frame width and height must be non-zero"),
            ConfigError::BytesPerPixel(bpp) => {
                write!(f, "{bpp} bytes per pixel not supported (1-4)")
            }
            ConfigError::BufferTooSmall { needed, available } => write!(
                f,
                "frame buffer holds {available} words, one frame needs {needed}"
            ),
            ConfigError::TransferTooLong { words } => {
                write!(f, "{words} words per frame exceed the transfer counter")
            }
            ConfigError::EmptyTransfer => write!(f, "frame transfer must move at least one word"),
            ConfigError::ZeroDrainLimit => write!(f, "drain limit must be at least one word"),
            ConfigError::EngineOutOfRange(engine) => {
                write!(f, "sampling engine {engine} does not exist")
            }
            ConfigError::ClockOutOfRange { hz } => {
                write!(f, "master clock {hz} Hz not reachable")
            }
        }
    }
}

impl core::error::Error for ConfigError {}

/// Errors surfaced by a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureError {
    /// Invalid configuration, rejected at construction.
    Config(ConfigError),
    /// Sampling engine already claimed by another session.
    EngineUnavailable(EngineId),
    /// A resync could not drain the FIFO; the engines are halted until the
    /// session is deactivated and activated again.
    Stalled,
}

impl From<ConfigError> for CaptureError {
    fn from(e: ConfigError) -> Self {
        CaptureError::Config(e)
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Config(e) => write!(f, "invalid configuration: {e}"),
            CaptureError::EngineUnavailable(engine) => {
                write!(f, "sampling engine {engine} unavailable")
            }
            CaptureError::Stalled => write!(f, "capture stalled"),
        }
    }
}

impl core::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            CaptureError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Error from a camera: either the sensor collaborator or the capture path.
#[derive(Debug)]
pub enum CameraError<E: fmt::Debug> {
    Sensor(E),
    Capture(CaptureError),
}

impl<E: fmt::Debug> From<CaptureError> for CameraError<E> {
    fn from(e: CaptureError) -> Self {
        CameraError::Capture(e)
    }
}

#[cfg(feature = "defmt")]
impl<E: fmt::Debug> defmt::Format for CameraError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            CameraError::Sensor(e) => defmt::write!(f, "sensor: {}", defmt::Debug2Format(e)),
            CameraError::Capture(e) => defmt::write!(f, "capture: {}", e),
        }
    }
}
