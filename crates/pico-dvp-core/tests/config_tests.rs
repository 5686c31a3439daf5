//! Configuration validation, transfer setup packing and engine ownership.

use pico_dvp_core::clock::{pwm_settings, MasterClock};
use pico_dvp_core::error::{CaptureError, ConfigError};
use pico_dvp_core::geometry::{FrameFormat, FrameGeometry};
use pico_dvp_core::pins::PinAssignment;
use pico_dvp_core::registry::EngineRegistry;
use pico_dvp_core::transfer::{self, ctrl_word, dreq_for_engine, frame_transfer};

mod pins {
    use super::*;

    #[test]
    fn accepts_hm01b0_layout() {
        let pins = PinAssignment::new(12, 1, 14, 15, 13)
            .and_then(|p| p.with_xclk(10))
            .unwrap();
        assert_eq!(pins.data_base(), 12);
        assert_eq!(pins.data_count(), 1);
        assert_eq!(pins.xclk(), Some(10));
        assert_eq!(pins.data_mask(), 1 << 12);
    }

    #[test]
    fn rejects_zero_and_wide_buses() {
        assert_eq!(
            PinAssignment::new(0, 0, 10, 11, 12),
            Err(ConfigError::DataPinCount(0))
        );
        assert_eq!(
            PinAssignment::new(0, 9, 10, 11, 12),
            Err(ConfigError::DataPinCount(9))
        );
    }

    #[test]
    fn rejects_pins_beyond_operand_field() {
        assert_eq!(
            PinAssignment::new(0, 1, 32, 11, 12),
            Err(ConfigError::PinOutOfRange { pin: 32 })
        );
        assert_eq!(
            PinAssignment::new(0, 1, 10, 11, 12).and_then(|p| p.with_xclk(40)),
            Err(ConfigError::PinOutOfRange { pin: 40 })
        );
    }

    #[test]
    fn rejects_bus_running_past_pin_31() {
        assert_eq!(
            PinAssignment::new(28, 8, 0, 1, 2),
            Err(ConfigError::DataPinsOutOfRange { base: 28, count: 8 })
        );
        assert!(PinAssignment::new(24, 8, 0, 1, 2).is_ok());
    }

    #[test]
    fn rejects_overlaps() {
        // HSYNC inside the data bus.
        assert_eq!(
            PinAssignment::new(0, 8, 7, 11, 12),
            Err(ConfigError::PinConflict { pin: 7 })
        );
        // PCLK shared with HSYNC.
        assert_eq!(
            PinAssignment::new(0, 2, 10, 10, 12),
            Err(ConfigError::PinConflict { pin: 10 })
        );
        // XCLK on the VSYNC pin.
        assert_eq!(
            PinAssignment::new(0, 2, 10, 11, 12).and_then(|p| p.with_xclk(12)),
            Err(ConfigError::PinConflict { pin: 12 })
        );
    }
}

mod geometry {
    use super::*;

    #[test]
    fn hm01b0_word_count() {
        assert_eq!(FrameGeometry::HM01B0.word_count(), 244 * 324 / 4);
        assert!(FrameFormat::HM01B0.byte_swap);
    }

    #[test]
    fn rgb565_word_count() {
        assert_eq!(
            FrameGeometry::OV5640_QVGA_RGB565.word_count(),
            240 * 320 * 2 / 4
        );
        assert!(!FrameFormat::OV5640_QVGA_RGB565.byte_swap);
    }

    #[test]
    fn partial_word_rounds_up() {
        let g = FrameGeometry::new(3, 3, 1).unwrap();
        assert_eq!(g.byte_len(), 9);
        assert_eq!(g.word_count(), 3);
    }

    #[test]
    fn rejects_degenerate_geometry() {
        assert_eq!(FrameGeometry::new(0, 10, 1), Err(ConfigError::EmptyGeometry));
        assert_eq!(FrameGeometry::new(10, 10, 0), Err(ConfigError::BytesPerPixel(0)));
        assert_eq!(FrameGeometry::new(10, 10, 5), Err(ConfigError::BytesPerPixel(5)));
    }

    #[test]
    fn rejects_frames_beyond_the_transfer_counter() {
        assert_eq!(
            FrameGeometry::new(u16::MAX, u16::MAX, 4),
            Err(ConfigError::TransferTooLong {
                words: 65535 * 65535
            })
        );
        assert_eq!(
            FrameGeometry::new(u16::MAX, 16385, 1),
            Err(ConfigError::TransferTooLong { words: 268_447_744 })
        );
    }

    #[test]
    fn tallest_full_width_mono_frame_is_accepted() {
        let g = FrameGeometry::new(u16::MAX, 16384, 1).unwrap();
        assert_eq!(g.byte_len(), 65535 * 16384);
        assert_eq!(g.word_count(), 65535 * 4096);
        assert!(g.word_count() <= transfer::MAX_TRANSFER_COUNT);
    }
}

mod transfer_setup {
    use super::*;

    #[test]
    fn dreq_per_engine() {
        // PIO0 RX0..3, PIO1 RX0, PIO2 RX3.
        assert_eq!(dreq_for_engine(0), 4);
        assert_eq!(dreq_for_engine(3), 7);
        assert_eq!(dreq_for_engine(4), 12);
        assert_eq!(dreq_for_engine(11), 23);
    }

    #[test]
    fn frame_transfer_fills_config() {
        let cfg = frame_transfer(5, 0x5030_2024, 0x2000_0000, 100, true).unwrap();
        assert_eq!(cfg.read_addr, 0x5030_2024);
        assert_eq!(cfg.write_addr, 0x2000_0000);
        assert_eq!(cfg.word_count, 100);
        assert_eq!(cfg.dreq, 13);
        assert!(cfg.byte_swap);
    }

    #[test]
    fn frame_transfer_rejects_bad_engine_and_count() {
        assert_eq!(
            frame_transfer(12, 0, 0, 1, false),
            Err(ConfigError::EngineOutOfRange(12))
        );
        assert_eq!(
            frame_transfer(0, 0, 0, 0x1000_0000, false),
            Err(ConfigError::TransferTooLong { words: 0x1000_0000 })
        );
    }

    #[test]
    fn ctrl_word_layout() {
        let cfg = frame_transfer(0, 0, 0, 10, true).unwrap();
        let ctrl = ctrl_word(&cfg, 3);

        assert_eq!(ctrl & transfer::CTRL_EN, 0, "EN left for the trigger");
        assert_eq!((ctrl >> 2) & 0b11, transfer::DATA_SIZE_WORD);
        assert_eq!(ctrl & transfer::CTRL_INCR_READ, 0);
        assert_ne!(ctrl & transfer::CTRL_INCR_WRITE, 0);
        assert_eq!((ctrl >> 13) & 0xF, 3, "chained to itself");
        assert_eq!((ctrl >> 17) & 0x3F, 4);
        assert_ne!(ctrl & transfer::CTRL_BSWAP, 0);

        let plain = frame_transfer(0, 0, 0, 10, false).unwrap();
        assert_eq!(ctrl_word(&plain, 3) & transfer::CTRL_BSWAP, 0);
    }
}

mod registry {
    use super::*;

    #[test]
    fn second_claim_fails_until_release() {
        let registry = EngineRegistry::new();
        let claim = registry.claim(2).unwrap();
        assert!(registry.is_claimed(2));
        assert_eq!(
            registry.claim(2).unwrap_err(),
            CaptureError::EngineUnavailable(2)
        );

        // Other engines are independent.
        let other = registry.claim(3).unwrap();
        assert_eq!(other.engine(), 3);

        drop(claim);
        assert!(!registry.is_claimed(2));
        assert!(registry.claim(2).is_ok());
    }

    #[test]
    fn claim_rejects_missing_engine() {
        let registry = EngineRegistry::new();
        assert_eq!(
            registry.claim(12).unwrap_err(),
            CaptureError::Config(ConfigError::EngineOutOfRange(12))
        );
    }
}

mod master_clock {
    use super::*;

    #[test]
    fn default_is_25mhz_half_duty() {
        let clock = MasterClock::default();
        assert_eq!(clock.freq_hz, 25_000_000);
        assert_eq!(clock.duty_u16, 32768);
    }

    #[test]
    fn exact_at_150mhz() {
        let pwm = pwm_settings(150_000_000, MasterClock::default()).unwrap();
        assert_eq!((pwm.div_int, pwm.div_frac), (1, 0));
        assert_eq!(pwm.top, 5);
        assert_eq!(pwm.compare, 3);
        assert_eq!(pwm.actual_hz, 25_000_000);
    }

    #[test]
    fn slow_clock_needs_divider() {
        let clock = MasterClock {
            freq_hz: 1_000,
            duty_u16: 32768,
        };
        let pwm = pwm_settings(150_000_000, clock).unwrap();
        let div16 = (pwm.div_int as u64) << 4 | pwm.div_frac as u64;
        assert!(div16 > 16);
        let period = div16 * (pwm.top as u64 + 1) / 16;
        assert!(period.abs_diff(150_000) < 10, "period {period}");
    }

    #[test]
    fn unreachable_frequencies() {
        let too_fast = MasterClock {
            freq_hz: 100_000_000,
            duty_u16: 32768,
        };
        assert_eq!(
            pwm_settings(150_000_000, too_fast),
            Err(ConfigError::ClockOutOfRange { hz: 100_000_000 })
        );
        let too_slow = MasterClock {
            freq_hz: 1,
            duty_u16: 32768,
        };
        assert!(pwm_settings(150_000_000, too_slow).is_err());
    }
}
