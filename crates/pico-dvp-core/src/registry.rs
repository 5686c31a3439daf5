//! Ownership of sampling engine instances across capture sessions.

use core::sync::atomic::{AtomicU16, Ordering};

use pico_dvp_hal::EngineId;

use crate::error::CaptureError;
use crate::transfer;

/// Tracks which sampling engines are held by a live session.
///
/// Meant to live in a `static` so every session on the chip shares it.
pub struct EngineRegistry {
    claimed: AtomicU16,
}

impl EngineRegistry {
    pub const fn new() -> Self {
        Self {
            claimed: AtomicU16::new(0),
        }
    }

    /// Claim `engine` for exclusive use until the returned guard drops.
    pub fn claim(&self, engine: EngineId) -> Result<EngineClaim<'_>, CaptureError> {
        transfer::check_engine(engine)?;
        let bit = 1u16 << engine;
        let previous = self.claimed.fetch_or(bit, Ordering::AcqRel);
        if previous & bit != 0 {
            return Err(CaptureError::EngineUnavailable(engine));
        }
        Ok(EngineClaim {
            registry: self,
            engine,
        })
    }

    pub fn is_claimed(&self, engine: EngineId) -> bool {
        engine < transfer::ENGINE_COUNT && self.claimed.load(Ordering::Acquire) & (1 << engine) != 0
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive hold on one sampling engine. Released on drop.
#[derive(Debug)]
pub struct EngineClaim<'r> {
    registry: &'r EngineRegistry,
    engine: EngineId,
}

impl EngineClaim<'_> {
    pub fn engine(&self) -> EngineId {
        self.engine
    }
}

impl Drop for EngineClaim<'_> {
    fn drop(&mut self) {
        self.registry
            .claimed
            .fetch_and(!(1u16 << self.engine), Ordering::AcqRel);
    }
}

impl core::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "EngineRegistry({:#06x})", self.claimed.load(Ordering::Relaxed))
    }
}
