//! Bus pin assignment and validation.

use crate::error::ConfigError;

/// Highest GPIO index a 5-bit instruction operand can address.
pub const MAX_PIN: u8 = 31;

/// Widest supported data bus.
pub const MAX_DATA_PINS: u8 = 8;

/// Pins of one DVP bus.
///
/// Validated on construction; the data bus is `data_base..data_base + data_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinAssignment {
    data_base: u8,
    data_count: u8,
    hsync: u8,
    pclk: u8,
    vsync: u8,
    xclk: Option<u8>,
}

impl PinAssignment {
    /// Validate a pin assignment without a driven reference clock.
    pub fn new(
        data_base: u8,
        data_count: u8,
        hsync: u8,
        pclk: u8,
        vsync: u8,
    ) -> Result<Self, ConfigError> {
        if data_count == 0 || data_count > MAX_DATA_PINS {
            return Err(ConfigError::DataPinCount(data_count));
        }
        for pin in [data_base, hsync, pclk, vsync] {
            check_range(pin)?;
        }
        if data_base as u16 + data_count as u16 - 1 > MAX_PIN as u16 {
            return Err(ConfigError::DataPinsOutOfRange {
                base: data_base,
                count: data_count,
            });
        }

        let pins = Self {
            data_base,
            data_count,
            hsync,
            pclk,
            vsync,
            xclk: None,
        };
        pins.check_control_pin(hsync, &[])?;
        pins.check_control_pin(pclk, &[hsync])?;
        pins.check_control_pin(vsync, &[hsync, pclk])?;
        Ok(pins)
    }

    /// Add a pin that drives the sensor's reference clock.
    pub fn with_xclk(mut self, xclk: u8) -> Result<Self, ConfigError> {
        check_range(xclk)?;
        self.check_control_pin(xclk, &[self.hsync, self.pclk, self.vsync])?;
        self.xclk = Some(xclk);
        Ok(self)
    }

    pub fn data_base(&self) -> u8 {
        self.data_base
    }

    /// Bits latched per pixel clock.
    pub fn data_count(&self) -> u8 {
        self.data_count
    }

    pub fn hsync(&self) -> u8 {
        self.hsync
    }

    pub fn pclk(&self) -> u8 {
        self.pclk
    }

    pub fn vsync(&self) -> u8 {
        self.vsync
    }

    pub fn xclk(&self) -> Option<u8> {
        self.xclk
    }

    /// Bit mask of the data bus within a GPIO snapshot.
    pub fn data_mask(&self) -> u32 {
        (((1u64 << self.data_count) - 1) << self.data_base) as u32
    }

    fn in_data_bus(&self, pin: u8) -> bool {
        pin >= self.data_base && pin < self.data_base + self.data_count
    }

    fn check_control_pin(&self, pin: u8, taken: &[u8]) -> Result<(), ConfigError> {
        if self.in_data_bus(pin) || taken.contains(&pin) {
            return Err(ConfigError::PinConflict { pin });
        }
        Ok(())
    }
}

fn check_range(pin: u8) -> Result<(), ConfigError> {
    if pin > MAX_PIN {
        return Err(ConfigError::PinOutOfRange { pin });
    }
    Ok(())
}
