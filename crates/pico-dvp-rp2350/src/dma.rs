//! DMA channel 0 streaming the sampler FIFO into the frame buffer.

use pico_dvp_core::transfer::{ctrl_word, CTRL_BUSY, CTRL_EN, MAX_TRANSFER_COUNT};
use pico_dvp_hal::{TransferConfig, TransferEngine};
use rp235x_hal as hal;

use hal::dma::{Channel, CH0};
use hal::pac::DMA;

const CHANNEL: u8 = 0;

/// Transfer engine on one DMA channel, programmed through its registers.
pub struct DmaStream {
    // Held so nothing else in the firmware claims the channel.
    _channel: Channel<CH0>,
    config: Option<TransferConfig>,
    ctrl: u32,
    enabled: bool,
}

impl DmaStream {
    pub fn new(channel: Channel<CH0>) -> Self {
        Self {
            _channel: channel,
            config: None,
            ctrl: 0,
            enabled: false,
        }
    }

    fn dma() -> &'static hal::pac::dma::RegisterBlock {
        unsafe { &*DMA::ptr() }
    }

    fn abort() {
        let dma = Self::dma();
        dma.chan_abort().write(|w| unsafe { w.bits(1 << CHANNEL) });
        while dma.chan_abort().read().bits() & (1 << CHANNEL) != 0 {
            cortex_m::asm::nop();
        }
    }
}

impl TransferEngine for DmaStream {
    fn configure(&mut self, config: &TransferConfig) {
        let ch = Self::dma().ch(CHANNEL as usize);
        self.ctrl = ctrl_word(config, CHANNEL);
        ch.ch_al1_ctrl().write(|w| unsafe { w.bits(self.ctrl) });
        ch.ch_read_addr().write(|w| unsafe { w.bits(config.read_addr) });
        ch.ch_write_addr().write(|w| unsafe { w.bits(config.write_addr) });
        ch.ch_trans_count()
            .write(|w| unsafe { w.bits(config.word_count & MAX_TRANSFER_COUNT) });
        self.config = Some(*config);
    }

    fn set_enabled(&mut self, enabled: bool) {
        let ch = Self::dma().ch(CHANNEL as usize);
        if enabled {
            let Some(config) = self.config else {
                defmt::warn!("DMA enable before configure");
                return;
            };
            // A halted channel keeps its decremented count; reload a full frame.
            ch.ch_trans_count()
                .write(|w| unsafe { w.bits(config.word_count & MAX_TRANSFER_COUNT) });
            ch.ch_ctrl_trig().write(|w| unsafe { w.bits(self.ctrl | CTRL_EN) });
        } else {
            ch.ch_al1_ctrl().write(|w| unsafe { w.bits(self.ctrl) });
            Self::abort();
        }
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_busy(&self) -> bool {
        Self::dma().ch(CHANNEL as usize).ch_ctrl_trig().read().bits() & CTRL_BUSY != 0
    }

    fn set_write_addr(&mut self, addr: u32) {
        if self.enabled {
            defmt::warn!("write address moved while the channel is enabled");
        }
        Self::dma().ch(CHANNEL as usize).ch_write_addr().write(|w| unsafe { w.bits(addr) });
    }

    fn write_addr(&self) -> u32 {
        Self::dma().ch(CHANNEL as usize).ch_write_addr().read().bits()
    }

    fn remaining(&self) -> u32 {
        Self::dma().ch(CHANNEL as usize).ch_trans_count().read().bits() & MAX_TRANSFER_COUNT
    }
}
