//! Capture session: arming, disarming and per-frame resynchronization.
//!
//! Once active, the sampling engine and the transfer engine run on their own.
//! The only code on the data path is [`CaptureSession::on_frame_boundary`],
//! called from the frame-boundary interrupt. It puts both engines back into
//! a known state so every frame starts writing at a buffer base address:
//!
//! 1. halt the transfer engine
//! 2. restart the sampling engine (drops any partial sample word)
//! 3. drain the FIFO
//! 4. point the transfer engine at the frame buffer base
//! 5. re-trigger the transfer engine
//!
//! The write address is only changed between steps 1 and 5, and nothing
//! else in the session writes it.
//!
//! Dropping a session that is still armed disarms it before the engine
//! claim is released.

use core::mem::ManuallyDrop;

use pico_dvp_hal::{
    EngineId, FrameRegion, FrameSyncInput, SamplingEngine, SessionToken, SyncEdge,
    TransferConfig, TransferEngine,
};

use crate::error::{CaptureError, ConfigError};
use crate::exchange::{Buffering, FrameExchange, Publish};
use crate::geometry::FrameFormat;
use crate::pins::PinAssignment;
use crate::program::{self, Protocol, TimingProgram};
use crate::registry::{EngineClaim, EngineRegistry};
use crate::transfer;

/// Words the drain step may discard before declaring the FIFO stuck.
pub const DEFAULT_DRAIN_LIMIT: u32 = 64;

/// How activation starts the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArmMode {
    /// Resynchronize during activation; the transfer starts right away.
    Immediate,
    /// Leave the transfer engine idle until the first frame boundary, so the
    /// first captured frame is a whole one.
    AwaitFrameBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    Stopped,
    Running,
    /// A resync could not empty the FIFO. Both engines are halted and the
    /// frame-boundary listener removed.
    Stalled,
}

/// Result of one frame-boundary trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResyncOutcome {
    /// Session not running; nothing touched.
    Ignored,
    /// Engines restarted at the frame buffer base.
    Rearmed,
    /// FIFO did not drain; session is now stalled.
    Stalled,
}

/// Counters maintained by the resync path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureStats {
    /// Frame-boundary triggers handled while running.
    pub resyncs: u32,
    /// Transfers that reached their word count before the boundary.
    pub frames_completed: u32,
    /// Boundaries that arrived before the word count was reached.
    pub short_frames: u32,
    /// Completed frames discarded by the exchange.
    pub frames_dropped: u32,
    /// Stale FIFO words thrown away by the drain step.
    pub discarded_words: u32,
    pub stalls: u32,
}

/// Everything a session needs besides the hardware handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CaptureConfig {
    pub pins: PinAssignment,
    pub engine: EngineId,
    pub format: FrameFormat,
    pub protocol: Protocol,
    pub vsync_edge: SyncEdge,
    pub arm: ArmMode,
    pub drain_limit: u32,
    transfer_words: Option<u32>,
}

impl CaptureConfig {
    /// Defaults: standard DVP polarities, falling VSYNC edge, immediate arm.
    pub fn new(pins: PinAssignment, engine: EngineId, format: FrameFormat) -> Self {
        Self {
            pins,
            engine,
            format,
            protocol: Protocol::DVP,
            vsync_edge: SyncEdge::Falling,
            arm: ArmMode::Immediate,
            drain_limit: DEFAULT_DRAIN_LIMIT,
            transfer_words: None,
        }
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn with_vsync_edge(mut self, edge: SyncEdge) -> Self {
        self.vsync_edge = edge;
        self
    }

    pub fn with_arm_mode(mut self, arm: ArmMode) -> Self {
        self.arm = arm;
        self
    }

    pub fn with_drain_limit(mut self, limit: u32) -> Self {
        self.drain_limit = limit;
        self
    }

    /// Transfer a fixed number of words per frame instead of the geometry's
    /// word count. A smaller count truncates every frame.
    pub fn with_transfer_words(mut self, words: u32) -> Self {
        self.transfer_words = Some(words);
        self
    }

    /// Words moved per frame.
    pub fn transfer_words(&self) -> u32 {
        self.transfer_words
            .unwrap_or_else(|| self.format.geometry.word_count())
    }
}

/// Operations a camera needs from a capture path.
pub trait Capture {
    fn activate(&mut self, active: bool) -> Result<(), CaptureError>;

    fn is_active(&self) -> bool;

    /// Acquire the newest completed frame, if one is ready.
    fn latest_frame(&mut self) -> Result<Option<FrameRegion>, CaptureError>;

    /// Hand the acquired frame back.
    fn frame_done(&mut self);
}

/// One sampling engine, one transfer engine and their frame-boundary input.
pub struct CaptureSession<'r, S, T, F>
where
    S: SamplingEngine,
    T: TransferEngine,
    F: FrameSyncInput,
{
    config: CaptureConfig,
    program: TimingProgram,
    transfer_config: TransferConfig,
    claim: EngineClaim<'r>,
    // Dropped by hand in `Drop`, or moved out by `into_parts`.
    sampler: ManuallyDrop<S>,
    transfer: ManuallyDrop<T>,
    sync: ManuallyDrop<F>,
    parts_taken: bool,
    exchange: FrameExchange,
    state: SessionState,
    stats: CaptureStats,
    frame_in_flight: bool,
}

impl<'r, S, T, F> CaptureSession<'r, S, T, F>
where
    S: SamplingEngine,
    T: TransferEngine,
    F: FrameSyncInput,
{
    /// Validate `config`, claim its engine, load the timing program and
    /// configure the transfer. Both engines are left disabled.
    pub fn new(
        registry: &'r EngineRegistry,
        config: CaptureConfig,
        mut sampler: S,
        mut transfer: T,
        sync: F,
        buffering: Buffering,
    ) -> Result<Self, CaptureError> {
        if config.drain_limit == 0 {
            return Err(ConfigError::ZeroDrainLimit.into());
        }
        let words = config.transfer_words();
        if words == 0 {
            return Err(ConfigError::EmptyTransfer.into());
        }
        let needed = words.max(config.format.geometry.word_count());
        let available = buffering.min_words();
        if available < needed {
            return Err(ConfigError::BufferTooSmall { needed, available }.into());
        }

        let claim = registry.claim(config.engine)?;
        let exchange = FrameExchange::new(buffering);
        let program = program::assemble(config.protocol, &config.pins);

        sampler.set_enabled(false);
        sampler.load(&program.image());

        let transfer_config = transfer::frame_transfer(
            config.engine,
            sampler.rx_fifo_addr(),
            exchange.write_target().base,
            words,
            config.format.byte_swap,
        )?;
        transfer.set_enabled(false);
        transfer.configure(&transfer_config);

        Ok(Self {
            config,
            program,
            transfer_config,
            claim,
            sampler: ManuallyDrop::new(sampler),
            transfer: ManuallyDrop::new(transfer),
            sync: ManuallyDrop::new(sync),
            parts_taken: false,
            exchange,
            state: SessionState::Stopped,
            stats: CaptureStats::default(),
            frame_in_flight: false,
        })
    }

    /// Arm or disarm the session.
    ///
    /// Arming enables the sampling engine, binds the frame-boundary
    /// interrupt and, with [`ArmMode::Immediate`], runs one resync so the
    /// transfer starts at the buffer base. Disarming removes the binding
    /// first, then halts both engines without waiting for the transfer.
    /// Arming a stalled session recovers it.
    pub fn activate(&mut self, active: bool) -> Result<(), CaptureError> {
        if active {
            if self.state == SessionState::Running {
                return Ok(());
            }
            self.exchange.reset();
            self.frame_in_flight = false;
            self.sampler.restart();
            self.sampler.set_enabled(true);
            let token = self.token();
            self.sync.listen(self.config.vsync_edge, token);
            self.state = SessionState::Running;
            if self.config.arm == ArmMode::Immediate
                && self.resync() == ResyncOutcome::Stalled
            {
                return Err(CaptureError::Stalled);
            }
        } else if self.state != SessionState::Stopped {
            self.halt();
            self.state = SessionState::Stopped;
        }
        Ok(())
    }

    /// Frame-boundary interrupt handler body.
    ///
    /// No allocation and no unbounded waits: the drain step gives up after
    /// `drain_limit` words and stalls the session instead.
    pub fn on_frame_boundary(&mut self) -> ResyncOutcome {
        if self.state != SessionState::Running {
            return ResyncOutcome::Ignored;
        }
        self.resync()
    }

    fn resync(&mut self) -> ResyncOutcome {
        self.stats.resyncs = self.stats.resyncs.wrapping_add(1);
        if self.frame_in_flight {
            self.account_finished_frame();
        }

        // 1. No transfer may be in flight while the write address moves.
        self.transfer.set_enabled(false);

        // 2. Back to the line-active wait with an empty shift register.
        self.sampler.restart();

        // 3. The restart leaves FIFO contents alone.
        let mut drained = 0u32;
        while self.sampler.rx_level() > 0 {
            if drained >= self.config.drain_limit {
                self.stats.discarded_words = self.stats.discarded_words.wrapping_add(drained);
                return self.stall();
            }
            let _ = self.sampler.pop();
            drained += 1;
        }
        self.stats.discarded_words = self.stats.discarded_words.wrapping_add(drained);

        // 4.
        let base = self.exchange.write_target().base;
        self.transfer.set_write_addr(base);

        // 5.
        self.transfer.set_enabled(true);
        self.frame_in_flight = true;
        ResyncOutcome::Rearmed
    }

    fn account_finished_frame(&mut self) {
        if self.transfer.remaining() != 0 {
            self.stats.short_frames = self.stats.short_frames.wrapping_add(1);
            return;
        }
        self.stats.frames_completed = self.stats.frames_completed.wrapping_add(1);
        match self.exchange.publish() {
            Publish::Published => {}
            Publish::Replaced | Publish::Held => {
                self.stats.frames_dropped = self.stats.frames_dropped.wrapping_add(1);
            }
        }
    }

    fn stall(&mut self) -> ResyncOutcome {
        self.halt();
        self.state = SessionState::Stalled;
        self.stats.stalls = self.stats.stalls.wrapping_add(1);
        ResyncOutcome::Stalled
    }

    fn halt(&mut self) {
        self.sync.unlisten();
        self.transfer.set_enabled(false);
        self.sampler.set_enabled(false);
        self.frame_in_flight = false;
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn program(&self) -> &TimingProgram {
        &self.program
    }

    pub fn transfer_config(&self) -> &TransferConfig {
        &self.transfer_config
    }

    pub fn engine(&self) -> EngineId {
        self.claim.engine()
    }

    /// Handle the frame-boundary interrupt is registered with.
    pub fn token(&self) -> SessionToken {
        SessionToken(self.claim.engine())
    }

    /// Buffer holding the newest frame.
    ///
    /// Single-buffered sessions return the region the transfer engine is
    /// writing; reading it while running may observe two frames at once.
    pub fn frame(&self) -> FrameRegion {
        self.exchange.front()
    }

    /// A completed frame is waiting.
    pub fn frame_ready(&self) -> bool {
        self.exchange.is_ready()
    }

    /// Take the newest completed frame. With two buffers it is protected
    /// from the transfer engine until [`release_frame`](Self::release_frame).
    pub fn acquire_frame(&mut self) -> Option<FrameRegion> {
        self.exchange.acquire()
    }

    pub fn release_frame(&mut self) {
        self.exchange.release();
    }

    /// Disarm and hand the hardware back. The engine claim is released.
    pub fn into_parts(mut self) -> (S, T, F) {
        let _ = self.activate(false);
        self.parts_taken = true;
        // Safety: `parts_taken` keeps `Drop` away from the handles, and
        // `self` is dropped right after.
        unsafe {
            (
                ManuallyDrop::take(&mut self.sampler),
                ManuallyDrop::take(&mut self.transfer),
                ManuallyDrop::take(&mut self.sync),
            )
        }
    }
}

impl<S, T, F> Drop for CaptureSession<'_, S, T, F>
where
    S: SamplingEngine,
    T: TransferEngine,
    F: FrameSyncInput,
{
    fn drop(&mut self) {
        if self.parts_taken {
            return;
        }
        if self.state != SessionState::Stopped {
            self.halt();
            self.state = SessionState::Stopped;
        }
        // Safety: the handles are still in place and never touched again.
        unsafe {
            ManuallyDrop::drop(&mut self.sampler);
            ManuallyDrop::drop(&mut self.transfer);
            ManuallyDrop::drop(&mut self.sync);
        }
    }
}

impl<S, T, F> Capture for CaptureSession<'_, S, T, F>
where
    S: SamplingEngine,
    T: TransferEngine,
    F: FrameSyncInput,
{
    fn activate(&mut self, active: bool) -> Result<(), CaptureError> {
        CaptureSession::activate(self, active)
    }

    fn is_active(&self) -> bool {
        CaptureSession::is_active(self)
    }

    fn latest_frame(&mut self) -> Result<Option<FrameRegion>, CaptureError> {
        if self.state == SessionState::Stalled {
            return Err(CaptureError::Stalled);
        }
        Ok(self.acquire_frame())
    }

    fn frame_done(&mut self) {
        self.release_frame();
    }
}
