//! HM01B0 control over I2C: identity probe and the streaming switch.
//!
//! Register configuration is left at the sensor's power-on defaults.

use embedded_hal::i2c::I2c;
use pico_dvp_hal::SensorControl;

/// 7-bit I2C address.
pub const ADDRESS: u8 = 0x24;

/// Expected value of the model ID registers.
pub const MODEL_ID: u16 = 0x01B0;

const REG_MODEL_ID_H: u16 = 0x0000;
const REG_MODEL_ID_L: u16 = 0x0001;
const REG_MODE_SELECT: u16 = 0x0100;

const MODE_STANDBY: u8 = 0x00;
const MODE_STREAMING: u8 = 0x01;

#[derive(Debug)]
pub enum SensorError<E> {
    /// I2C transaction failed.
    Bus(E),
    /// Something answered at the address but is not an HM01B0.
    WrongModel(u16),
}

pub struct Hm01b0<I> {
    i2c: I,
}

impl<I: I2c> Hm01b0<I> {
    pub fn new(i2c: I) -> Self {
        Self { i2c }
    }

    /// Read the model ID and check it.
    pub fn probe(&mut self) -> Result<u16, SensorError<I::Error>> {
        let hi = self.read(REG_MODEL_ID_H)?;
        let lo = self.read(REG_MODEL_ID_L)?;
        let id = u16::from_be_bytes([hi, lo]);
        if id != MODEL_ID {
            return Err(SensorError::WrongModel(id));
        }
        Ok(id)
    }

    fn read(&mut self, reg: u16) -> Result<u8, SensorError<I::Error>> {
        let mut buf = [0u8];
        self.i2c
            .write_read(ADDRESS, &reg.to_be_bytes(), &mut buf)
            .map_err(SensorError::Bus)?;
        Ok(buf[0])
    }

    fn write(&mut self, reg: u16, value: u8) -> Result<(), SensorError<I::Error>> {
        let [hi, lo] = reg.to_be_bytes();
        self.i2c
            .write(ADDRESS, &[hi, lo, value])
            .map_err(SensorError::Bus)
    }
}

impl<I: I2c> SensorControl for Hm01b0<I> {
    type Error = SensorError<I::Error>;

    fn start_streaming(&mut self) -> Result<(), Self::Error> {
        self.write(REG_MODE_SELECT, MODE_STREAMING)
    }

    fn stop_streaming(&mut self) -> Result<(), Self::Error> {
        self.write(REG_MODE_SELECT, MODE_STANDBY)
    }
}
