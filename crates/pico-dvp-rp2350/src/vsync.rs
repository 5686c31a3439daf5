//! VSYNC edge interrupt on GP13.
//!
//! The session enables the edge through [`VsyncInput`]. `IO_IRQ_BANK0`
//! calls [`take_edge`], which acknowledges the edge and returns the token of
//! the listening session.

use core::sync::atomic::{AtomicU8, Ordering};

use pico_dvp_hal::{FrameSyncInput, SessionToken, SyncEdge};
use rp235x_hal as hal;

use hal::gpio::{bank0::Gpio13, FunctionSioInput, Interrupt, Pin, PullNone};

pub type VsyncPin = Pin<Gpio13, FunctionSioInput, PullNone>;

/// GPIO number of [`VsyncPin`].
pub const VSYNC_GPIO: u8 = 13;

const NO_LISTENER: u8 = u8::MAX;

// Bits per pin in the INTR and PROC0_INTS registers.
const EDGE_LOW: u32 = 1 << 2;
const EDGE_HIGH: u32 = 1 << 3;

static LISTENER: AtomicU8 = AtomicU8::new(NO_LISTENER);

pub struct VsyncInput {
    pin: VsyncPin,
    edge: Option<Interrupt>,
}

impl VsyncInput {
    pub fn new(pin: VsyncPin) -> Self {
        Self { pin, edge: None }
    }
}

impl FrameSyncInput for VsyncInput {
    fn listen(&mut self, edge: SyncEdge, token: SessionToken) {
        self.unlisten();
        let irq = match edge {
            SyncEdge::Falling => Interrupt::EdgeLow,
            SyncEdge::Rising => Interrupt::EdgeHigh,
        };
        self.pin.clear_interrupt(irq);
        LISTENER.store(token.0, Ordering::Release);
        self.pin.set_interrupt_enabled(irq, true);
        self.edge = Some(irq);
    }

    fn unlisten(&mut self) {
        if let Some(irq) = self.edge.take() {
            self.pin.set_interrupt_enabled(irq, false);
            self.pin.clear_interrupt(irq);
        }
        LISTENER.store(NO_LISTENER, Ordering::Release);
    }

    fn is_listening(&self) -> bool {
        self.edge.is_some()
    }
}

/// Acknowledge a pending VSYNC edge. Returns the listener's token, or `None`
/// when the edge was not ours or nobody is listening.
pub fn take_edge() -> Option<SessionToken> {
    let io = unsafe { &*hal::pac::IO_BANK0::ptr() };
    let reg = (VSYNC_GPIO / 8) as usize;
    let shift = 4 * (VSYNC_GPIO % 8) as u32;
    let mask = (EDGE_LOW | EDGE_HIGH) << shift;

    let pending = io.proc0_ints(reg).read().bits() & mask;
    if pending == 0 {
        return None;
    }
    io.intr(reg).write(|w| unsafe { w.bits(pending) });

    match LISTENER.load(Ordering::Acquire) {
        NO_LISTENER => None,
        token => Some(SessionToken(token)),
    }
}
