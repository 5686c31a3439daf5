//! Camera: a sensor control collaborator composed with a capture path.
//!
//! Neither side knows the other's type. The camera only sequences them:
//! capture is armed before the sensor starts streaming, and disarmed before
//! it stops.

use pico_dvp_hal::{FrameRegion, SensorControl};

use crate::error::CameraError;
use crate::session::Capture;

/// Capability interface offered to applications.
pub trait FrameSource {
    type Error;

    /// Start streaming and capturing.
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Stop capturing and streaming.
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Newest completed frame, if one arrived since the last call.
    fn read_frame(&mut self) -> Result<Option<FrameRegion>, Self::Error>;

    /// Done with the frame returned by `read_frame`.
    fn frame_done(&mut self);
}

pub struct Camera<C, D> {
    sensor: C,
    capture: D,
}

impl<C: SensorControl, D: Capture> Camera<C, D> {
    pub fn new(sensor: C, capture: D) -> Self {
        Self { sensor, capture }
    }

    pub fn is_open(&self) -> bool {
        self.capture.is_active()
    }

    pub fn sensor_mut(&mut self) -> &mut C {
        &mut self.sensor
    }

    pub fn capture(&self) -> &D {
        &self.capture
    }

    pub fn capture_mut(&mut self) -> &mut D {
        &mut self.capture
    }

    pub fn into_parts(self) -> (C, D) {
        (self.sensor, self.capture)
    }
}

impl<C: SensorControl, D: Capture> FrameSource for Camera<C, D> {
    type Error = CameraError<C::Error>;

    fn open(&mut self) -> Result<(), Self::Error> {
        self.capture.activate(true)?;
        if let Err(e) = self.sensor.start_streaming() {
            let _ = self.capture.activate(false);
            return Err(CameraError::Sensor(e));
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.capture.activate(false)?;
        self.sensor.stop_streaming().map_err(CameraError::Sensor)
    }

    fn read_frame(&mut self) -> Result<Option<FrameRegion>, Self::Error> {
        Ok(self.capture.latest_frame()?)
    }

    fn frame_done(&mut self) {
        self.capture.frame_done();
    }
}
