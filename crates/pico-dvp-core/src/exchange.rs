//! Hand-off of completed frames from the transfer engine to consumers.
//!
//! With a single buffer the transfer engine writes the same region every
//! frame, so a consumer reading it while a transfer runs sees a mix of two
//! frames (tearing). The ready flag still tells it a frame completed, but
//! nothing stops the next frame from overwriting it.
//!
//! With two buffers the engine always writes the back buffer. A completed
//! back buffer becomes the front, flagged ready; the consumer acquires it and
//! the engine never targets the front while it is held.

use pico_dvp_hal::FrameRegion;

/// Frame buffer arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Buffering {
    Single(FrameRegion),
    Double(FrameRegion, FrameRegion),
}

impl Buffering {
    /// Smallest region, in words.
    pub fn min_words(&self) -> u32 {
        match self {
            Buffering::Single(region) => region.words,
            Buffering::Double(a, b) => a.words.min(b.words),
        }
    }
}

/// What happened to a completed frame at publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Publish {
    /// Now the ready frame.
    Published,
    /// Now the ready frame; an older unconsumed frame was discarded.
    Replaced,
    /// Consumer still holds the front buffer; the new frame was discarded
    /// and its buffer is written again.
    Held,
}

/// Ready/held bookkeeping shared by the resync handler and the consumer.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameExchange {
    regions: [FrameRegion; 2],
    double: bool,
    back: usize,
    ready: bool,
    held: bool,
}

impl FrameExchange {
    pub fn new(buffering: Buffering) -> Self {
        let (regions, double) = match buffering {
            Buffering::Single(region) => ([region, region], false),
            Buffering::Double(a, b) => ([a, b], true),
        };
        Self {
            regions,
            double,
            back: 0,
            ready: false,
            held: false,
        }
    }

    pub fn is_double(&self) -> bool {
        self.double
    }

    /// Region the transfer engine writes next.
    pub fn write_target(&self) -> FrameRegion {
        self.regions[self.back]
    }

    /// Region holding the newest completed frame. With a single buffer this
    /// is also the region being written.
    pub fn front(&self) -> FrameRegion {
        if self.double {
            self.regions[self.back ^ 1]
        } else {
            self.regions[0]
        }
    }

    /// A completed frame is waiting to be acquired.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Consumer holds the front buffer.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Mark the back buffer complete. Called between frames, with the
    /// transfer engine idle.
    pub fn publish(&mut self) -> Publish {
        if self.double && self.held {
            return Publish::Held;
        }
        let replaced = self.ready;
        if self.double {
            self.back ^= 1;
        }
        self.ready = true;
        if replaced {
            Publish::Replaced
        } else {
            Publish::Published
        }
    }

    /// Take the ready frame, clearing the ready flag.
    pub fn acquire(&mut self) -> Option<FrameRegion> {
        if !self.ready || self.held {
            return None;
        }
        self.ready = false;
        self.held = true;
        Some(self.front())
    }

    /// Give the acquired frame back.
    pub fn release(&mut self) {
        self.held = false;
    }

    /// Forget any pending or held frame.
    pub fn reset(&mut self) {
        self.ready = false;
        self.held = false;
    }
}
