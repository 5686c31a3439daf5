//! Reference clock for sensors that need one driven (XCLK), generated by a
//! PWM slice.

use crate::error::ConfigError;

/// Default sensor reference clock.
pub const DEFAULT_XCLK_HZ: u32 = 25_000_000;

/// Duty cycle as a 16-bit fraction of the period.
pub const HALF_DUTY: u16 = 32768;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterClock {
    pub freq_hz: u32,
    pub duty_u16: u16,
}

impl Default for MasterClock {
    fn default() -> Self {
        Self {
            freq_hz: DEFAULT_XCLK_HZ,
            duty_u16: HALF_DUTY,
        }
    }
}

/// PWM slice register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmSettings {
    /// Integer part of the 8.4 clock divider.
    pub div_int: u8,
    /// Fractional part of the 8.4 clock divider.
    pub div_frac: u8,
    /// Counter wraps after `top`, period is `top + 1` divided clocks.
    pub top: u16,
    /// Output high while the counter is below `compare`.
    pub compare: u16,
    /// Frequency actually produced.
    pub actual_hz: u32,
}

/// Smallest divider that keeps `top` within 16 bits.
pub fn pwm_settings(sys_hz: u32, clock: MasterClock) -> Result<PwmSettings, ConfigError> {
    let out_of_range = ConfigError::ClockOutOfRange { hz: clock.freq_hz };
    if clock.freq_hz == 0 || sys_hz / clock.freq_hz < 2 {
        return Err(out_of_range);
    }

    // Period in sixteenths of a system clock: div16 * (top + 1).
    let period16 = sys_hz as u64 * 16 / clock.freq_hz as u64;
    let div16 = period16.div_ceil(1 << 16).max(16);
    if div16 > 0xFFF {
        return Err(out_of_range);
    }
    let top = period16 / div16 - 1;
    let compare = (top + 1) * clock.duty_u16 as u64 / (1 << 16);
    let actual_hz = (sys_hz as u64 * 16 / (div16 * (top + 1))) as u32;

    Ok(PwmSettings {
        div_int: (div16 >> 4) as u8,
        div_frac: (div16 & 0xF) as u8,
        top: top as u16,
        compare: compare as u16,
        actual_hz,
    })
}
