#![no_std]

//! Hardware seams of the DVP capture path.
//!
//! The capture core drives three independent pieces of hardware through these
//! traits: a bus sampling engine (a PIO state machine), a stream transfer
//! engine (a DMA channel) and the frame-boundary input (the VSYNC pin
//! interrupt). None of them is scheduled by software; implementations only
//! arm, disarm and reconfigure them.

/// Index of a sampling engine across all PIO blocks: `block * 4 + sm`.
pub type EngineId = u8;

/// Opaque handle an interrupt dispatcher uses to find the session that
/// registered a frame-boundary listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionToken(pub u8);

/// Edge of the frame-boundary signal that triggers resynchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncEdge {
    Falling,
    Rising,
}

/// A loadable sampling program plus the state machine settings it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProgramImage<'a> {
    pub code: &'a [u16],
    /// Instruction the program wraps back to (and restarts at).
    pub wrap_target: u8,
    /// Last instruction before wrapping.
    pub wrap_source: u8,
    /// First GPIO sampled by `in pins`.
    pub in_pin_base: u8,
    /// Number of consecutive input pins used by `in pins`.
    pub in_pin_count: u8,
    /// Autopush threshold in bits (32 = full word).
    pub push_threshold: u8,
    /// ISR shifts left, so the first sample ends up most significant.
    pub shift_left: bool,
}

/// Stream transfer configuration: FIFO to memory, 32-bit units,
/// fixed read address, incrementing write address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferConfig {
    /// Address of the sampling engine's RX FIFO register.
    pub read_addr: u32,
    /// Frame buffer base address.
    pub write_addr: u32,
    /// Words moved per trigger: exactly one frame.
    pub word_count: u32,
    /// Data request line paced by FIFO occupancy.
    pub dreq: u8,
    /// Reverse the byte order of each transferred word.
    pub byte_swap: bool,
}

/// A contiguous frame buffer described by address and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameRegion {
    pub base: u32,
    /// Capacity in 32-bit words.
    pub words: u32,
}

impl FrameRegion {
    pub const fn new(base: u32, words: u32) -> Self {
        Self { base, words }
    }

    /// Capacity in bytes.
    pub const fn byte_len(&self) -> usize {
        self.words as usize * 4
    }
}

/// A free-running bus sampling engine with an output FIFO.
pub trait SamplingEngine {
    /// Install the program and apply its state machine settings.
    /// The engine stays disabled.
    fn load(&mut self, image: &ProgramImage<'_>);

    /// Start or stop instruction execution.
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Jump back to the wrap target and clear any partially shifted word.
    /// The FIFO is left untouched.
    fn restart(&mut self);

    /// Number of words waiting in the RX FIFO.
    fn rx_level(&self) -> usize;

    /// Pop one word from the RX FIFO.
    fn pop(&mut self) -> Option<u32>;

    /// Bus address of the RX FIFO register (the transfer read address).
    fn rx_fifo_addr(&self) -> u32;
}

/// A DMA-class engine streaming the FIFO into memory.
pub trait TransferEngine {
    /// Program the channel without starting it.
    fn configure(&mut self, config: &TransferConfig);

    /// `true` triggers a transfer of the configured word count starting at
    /// the current write address. `false` halts the channel, abandoning any
    /// transfer in flight.
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// A transfer is in flight (enabled and count not yet reached).
    fn is_busy(&self) -> bool;

    /// Move the write cursor. Only valid while the channel is halted.
    fn set_write_addr(&mut self, addr: u32);

    fn write_addr(&self) -> u32;

    /// Words left before the current transfer completes.
    fn remaining(&self) -> u32;
}

/// The frame-boundary (VSYNC) interrupt source.
pub trait FrameSyncInput {
    /// Bind the interrupt on `edge`. The platform dispatcher hands `token`
    /// back when the edge fires.
    fn listen(&mut self, edge: SyncEdge, token: SessionToken);

    /// Remove the interrupt binding.
    fn unlisten(&mut self);

    fn is_listening(&self) -> bool;
}

/// Sensor-side control collaborator (register configuration over a control
/// bus). Only the streaming switch is needed by the capture path.
pub trait SensorControl {
    type Error: core::fmt::Debug;

    fn start_streaming(&mut self) -> Result<(), Self::Error>;

    fn stop_streaming(&mut self) -> Result<(), Self::Error>;
}
