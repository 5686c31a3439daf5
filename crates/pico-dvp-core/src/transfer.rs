//! Stream transfer setup: DREQ routing and the RP2350 DMA control word.

use pico_dvp_hal::{EngineId, TransferConfig};

use crate::error::ConfigError;

/// State machines per PIO block.
pub const ENGINES_PER_BLOCK: u8 = 4;

/// PIO blocks on the RP2350.
pub const PIO_BLOCKS: u8 = 3;

/// Sampling engines available across all blocks.
pub const ENGINE_COUNT: u8 = ENGINES_PER_BLOCK * PIO_BLOCKS;

/// Largest value the 28-bit transfer counter accepts.
pub const MAX_TRANSFER_COUNT: u32 = 0x0FFF_FFFF;

// CH_CTRL_TRIG fields.
pub const CTRL_EN: u32 = 1 << 0;
pub const CTRL_HIGH_PRIORITY: u32 = 1 << 1;
pub const CTRL_DATA_SIZE_SHIFT: u32 = 2;
pub const CTRL_INCR_READ: u32 = 1 << 4;
pub const CTRL_INCR_WRITE: u32 = 1 << 6;
pub const CTRL_CHAIN_TO_SHIFT: u32 = 13;
pub const CTRL_TREQ_SEL_SHIFT: u32 = 17;
pub const CTRL_IRQ_QUIET: u32 = 1 << 23;
pub const CTRL_BSWAP: u32 = 1 << 24;
pub const CTRL_BUSY: u32 = 1 << 26;

/// DATA_SIZE encoding for 32-bit transfers.
pub const DATA_SIZE_WORD: u32 = 2;

/// Data request line of a sampling engine's RX FIFO.
///
/// Each PIO block owns eight DREQs starting at 0, 8, 16: four TX followed by
/// four RX.
pub const fn dreq_for_engine(engine: EngineId) -> u8 {
    ((engine / ENGINES_PER_BLOCK) << 3) + (engine % ENGINES_PER_BLOCK) + 4
}

/// Check an engine index against the available state machines.
pub fn check_engine(engine: EngineId) -> Result<(), ConfigError> {
    if engine >= ENGINE_COUNT {
        return Err(ConfigError::EngineOutOfRange(engine));
    }
    Ok(())
}

/// Transfer from an engine's FIFO into a frame buffer.
pub fn frame_transfer(
    engine: EngineId,
    fifo_addr: u32,
    write_addr: u32,
    word_count: u32,
    byte_swap: bool,
) -> Result<TransferConfig, ConfigError> {
    check_engine(engine)?;
    if word_count > MAX_TRANSFER_COUNT {
        return Err(ConfigError::TransferTooLong { words: word_count });
    }
    Ok(TransferConfig {
        read_addr: fifo_addr,
        write_addr,
        word_count,
        dreq: dreq_for_engine(engine),
        byte_swap,
    })
}

/// Pack `CH_CTRL_TRIG` for `config` on DMA `channel`.
///
/// Word-sized, fixed read, incrementing write, chained to itself (no
/// chaining), quiet. EN is left clear; enabling is a separate trigger.
pub fn ctrl_word(config: &TransferConfig, channel: u8) -> u32 {
    let mut ctrl = (DATA_SIZE_WORD << CTRL_DATA_SIZE_SHIFT)
        | CTRL_INCR_WRITE
        | ((channel as u32 & 0xF) << CTRL_CHAIN_TO_SHIFT)
        | ((config.dreq as u32 & 0x3F) << CTRL_TREQ_SEL_SHIFT)
        | CTRL_IRQ_QUIET;
    if config.byte_swap {
        ctrl |= CTRL_BSWAP;
    }
    ctrl
}
