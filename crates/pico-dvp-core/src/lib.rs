#![no_std]

//! Platform-agnostic DVP capture on a PIO state machine and a DMA channel.
//!
//! The hardware is reached only through the `pico-dvp-hal` traits, so the
//! same session code runs on the RP2350 and against the host twin.

pub mod camera;
pub mod clock;
pub mod error;
pub mod exchange;
pub mod geometry;
pub mod pins;
pub mod program;
pub mod registry;
pub mod session;
pub mod transfer;

pub use camera::{Camera, FrameSource};
pub use error::{CameraError, CaptureError, ConfigError};
pub use exchange::{Buffering, FrameExchange, Publish};
pub use geometry::{FrameFormat, FrameGeometry};
pub use pins::PinAssignment;
pub use program::{Protocol, TimingProgram};
pub use registry::{EngineClaim, EngineRegistry};
pub use session::{
    ArmMode, Capture, CaptureConfig, CaptureSession, CaptureStats, ResyncOutcome, SessionState,
};
