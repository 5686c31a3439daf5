//! RP2350 firmware: HM01B0 frame capture on PIO0 SM0 and DMA channel 0.
//!
//! The sensor is probed over I2C0 and clocked from PWM slice 5. Frames are
//! streamed into a double buffer, VSYNC resynchronizes the capture in
//! `IO_IRQ_BANK0`, and the main loop reports per-frame statistics over RTT.

#![no_std]
#![no_main]

mod dma;
mod engine;
mod sensor;
mod vsync;

use core::cell::RefCell;

use critical_section::Mutex;
use defmt_rtt as _;
use panic_probe as _;
use rp235x_hal as hal;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use hal::clocks::Clock;
use hal::dma::DMAExt;
use hal::fugit::RateExtU32;
use hal::pac::interrupt;
use hal::pio::PIOExt;
use hal::sio::Sio;

use pico_dvp_core::clock::{self, MasterClock};
use pico_dvp_core::{
    Buffering, Camera, CameraError, CaptureConfig, CaptureError, CaptureSession, EngineRegistry,
    FrameFormat, FrameSource, PinAssignment, ResyncOutcome,
};
use pico_dvp_hal::FrameRegion;

use dma::DmaStream;
use engine::PioEngine;
use sensor::Hm01b0;
use vsync::{VsyncInput, VSYNC_GPIO};

/// Boot ROM image definition for Cortex-M33 secure mode.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: hal::block::ImageDef = hal::block::ImageDef::secure_exe();

/// External crystal frequency (Pico 2 standard).
const XTAL_FREQ_HZ: u32 = 12_000_000;

// Camera wiring.
const D0_GPIO: u8 = 12;
const HSYNC_GPIO: u8 = 14;
const PCLK_GPIO: u8 = 15;
const XCLK_GPIO: u8 = 10;

const FORMAT: FrameFormat = FrameFormat::HM01B0;
const FRAME_WORDS: usize = 324 * 244 / 4;

type SensorI2c = hal::I2C<
    hal::pac::I2C0,
    (
        hal::gpio::Pin<hal::gpio::bank0::Gpio4, hal::gpio::FunctionI2C, hal::gpio::PullUp>,
        hal::gpio::Pin<hal::gpio::bank0::Gpio5, hal::gpio::FunctionI2C, hal::gpio::PullUp>,
    ),
>;

type Session = CaptureSession<'static, PioEngine, DmaStream, VsyncInput>;
type FirmwareCamera = Camera<Hm01b0<SensorI2c>, Session>;

/// Engine claims shared by every session on the chip.
static REGISTRY: EngineRegistry = EngineRegistry::new();

/// Camera shared between the main loop and the VSYNC interrupt.
static CAMERA: Mutex<RefCell<Option<FirmwareCamera>>> = Mutex::new(RefCell::new(None));

#[hal::entry]
fn main() -> ! {
    defmt::info!("pico-dvp-rp2350 starting");

    let mut pac = hal::pac::Peripherals::take().unwrap();
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // Initialize clocks from 12 MHz crystal.
    let clocks = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let sys_freq = clocks.system_clock.freq().to_Hz();
    let sio = Sio::new(pac.SIO);

    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // Error LED (onboard GP25).
    let mut led = pins.gpio25.into_push_pull_output();
    let core = unsafe { cortex_m::Peripherals::steal() };
    let mut delay = cortex_m::delay::Delay::new(core.SYST, sys_freq);

    // --- Sensor master clock on GP10 (PWM slice 5, channel A) ---
    let xclk = match clock::pwm_settings(sys_freq, MasterClock::default()) {
        Ok(s) => s,
        Err(e) => {
            defmt::error!("XCLK: {}", e);
            halt(&mut led, &mut delay);
        }
    };
    let slices = hal::pwm::Slices::new(pac.PWM, &mut pac.RESETS);
    let mut pwm = slices.pwm5;
    pwm.set_div_int(xclk.div_int);
    pwm.set_div_frac(xclk.div_frac);
    pwm.set_top(xclk.top);
    pwm.enable();
    let _xclk = pwm.channel_a.output_to(pins.gpio10);
    let _ = pwm.channel_a.set_duty_cycle(xclk.compare);
    defmt::info!("XCLK {} Hz on GP{}", xclk.actual_hz, XCLK_GPIO);

    // --- Sensor control over I2C0 ---
    let sda = pins.gpio4.reconfigure::<hal::gpio::FunctionI2C, hal::gpio::PullUp>();
    let scl = pins.gpio5.reconfigure::<hal::gpio::FunctionI2C, hal::gpio::PullUp>();
    let i2c = hal::I2C::i2c0(
        pac.I2C0,
        sda,
        scl,
        400.kHz(),
        &mut pac.RESETS,
        clocks.system_clock.freq(),
    );
    let mut sensor = Hm01b0::new(i2c);
    match sensor.probe() {
        Ok(id) => defmt::info!("HM01B0 detected: model {=u16:#06x}", id),
        Err(e) => {
            defmt::error!("sensor probe failed: {}", defmt::Debug2Format(&e));
            halt(&mut led, &mut delay);
        }
    }

    // --- Capture path ---
    let _d0 = pins.gpio12.into_function::<hal::gpio::FunctionPio0>();
    let _hsync = pins.gpio14.into_function::<hal::gpio::FunctionPio0>();
    let _pclk = pins.gpio15.into_function::<hal::gpio::FunctionPio0>();
    let vsync_pin = pins.gpio13.reconfigure();

    let layout = PinAssignment::new(D0_GPIO, 1, HSYNC_GPIO, PCLK_GPIO, VSYNC_GPIO)
        .and_then(|p| p.with_xclk(XCLK_GPIO));
    let layout = match layout {
        Ok(p) => p,
        Err(e) => {
            defmt::error!("pin layout: {}", e);
            halt(&mut led, &mut delay);
        }
    };

    let (pio0, sm0, _, _, _) = pac.PIO0.split(&mut pac.RESETS);
    let channels = pac.DMA.split(&mut pac.RESETS);

    let buffer = cortex_m::singleton!(: [u32; 2 * FRAME_WORDS] = [0; 2 * FRAME_WORDS]).unwrap();
    let base = buffer.as_mut_ptr() as u32;
    let buffering = Buffering::Double(
        FrameRegion::new(base, FRAME_WORDS as u32),
        FrameRegion::new(base + 4 * FRAME_WORDS as u32, FRAME_WORDS as u32),
    );

    let config = CaptureConfig::new(layout, 0, FORMAT);
    let session = match CaptureSession::new(
        &REGISTRY,
        config,
        PioEngine::new(pio0, sm0),
        DmaStream::new(channels.ch0),
        VsyncInput::new(vsync_pin),
        buffering,
    ) {
        Ok(s) => s,
        Err(e) => {
            defmt::error!("capture setup failed: {}", e);
            halt(&mut led, &mut delay);
        }
    };
    defmt::info!(
        "capture on engine {}: {} words per frame, DREQ {}",
        session.engine(),
        session.transfer_config().word_count,
        session.transfer_config().dreq
    );

    critical_section::with(|cs| {
        CAMERA.borrow_ref_mut(cs).replace(Camera::new(sensor, session));
    });
    unsafe { cortex_m::peripheral::NVIC::unmask(hal::pac::Interrupt::IO_IRQ_BANK0) };

    let opened = critical_section::with(|cs| match CAMERA.borrow_ref_mut(cs).as_mut() {
        Some(camera) => camera.open(),
        None => Ok(()),
    });
    if let Err(e) = opened {
        defmt::error!("camera open failed: {}", e);
        halt(&mut led, &mut delay);
    }
    defmt::info!("streaming");

    let mut frames: u32 = 0;
    loop {
        cortex_m::asm::wfi();

        let frame = critical_section::with(|cs| {
            let mut slot = CAMERA.borrow_ref_mut(cs);
            let camera = slot.as_mut()?;
            match camera.read_frame() {
                Ok(Some(region)) => Some(region),
                Ok(None) => None,
                Err(CameraError::Capture(CaptureError::Stalled)) => {
                    defmt::warn!("capture stalled, re-arming");
                    let capture = camera.capture_mut();
                    let _ = capture.activate(false);
                    if let Err(e) = capture.activate(true) {
                        defmt::error!("re-arm failed: {}", e);
                    }
                    None
                }
                Err(e) => {
                    defmt::error!("read failed: {}", e);
                    None
                }
            }
        });
        let Some(region) = frame else {
            continue;
        };

        // The exchange keeps this region out of the transfer engine's
        // reach until frame_done.
        let mean = mean_level(region);
        frames = frames.wrapping_add(1);

        critical_section::with(|cs| {
            if let Some(camera) = CAMERA.borrow_ref_mut(cs).as_mut() {
                camera.frame_done();
                if frames % 30 == 0 {
                    let stats = camera.capture().stats();
                    defmt::info!(
                        "frame {}: mean {}, {} resyncs, {} short, {} dropped, {} discarded",
                        frames,
                        mean,
                        stats.resyncs,
                        stats.short_frames,
                        stats.frames_dropped,
                        stats.discarded_words
                    );
                }
            }
        });
    }
}

/// Average pixel value of a captured mono frame.
fn mean_level(region: FrameRegion) -> u8 {
    core::sync::atomic::compiler_fence(core::sync::atomic::Ordering::Acquire);
    // Safety: the region lies inside the static frame buffer and the
    // exchange guarantees DMA is not writing it while acquired.
    let bytes =
        unsafe { core::slice::from_raw_parts(region.base as *const u8, region.byte_len()) };
    let len = FORMAT.geometry.byte_len() as usize;
    let sum: u32 = bytes[..len].iter().map(|&b| b as u32).sum();
    (sum / len as u32) as u8
}

#[interrupt]
fn IO_IRQ_BANK0() {
    let Some(token) = vsync::take_edge() else {
        return;
    };
    critical_section::with(|cs| {
        let mut slot = CAMERA.borrow_ref_mut(cs);
        let Some(camera) = slot.as_mut() else {
            return;
        };
        let session = camera.capture_mut();
        if session.token() != token {
            return;
        }
        if session.on_frame_boundary() == ResyncOutcome::Stalled {
            defmt::warn!("resync stalled: FIFO did not drain");
        }
    });
}

/// Halt with LED blink pattern.
fn halt(led: &mut impl OutputPin, delay: &mut cortex_m::delay::Delay) -> ! {
    loop {
        let _ = led.set_high();
        delay.delay_ms(100);
        let _ = led.set_low();
        delay.delay_ms(100);
    }
}

/// Program metadata for `picotool info`.
#[link_section = ".bi_entries"]
#[used]
pub static PICOTOOL_ENTRIES: [hal::binary_info::EntryAddr; 5] = [
    hal::binary_info::rp_cargo_bin_name!(),
    hal::binary_info::rp_cargo_version!(),
    hal::binary_info::rp_program_description!(c"DVP camera capture over PIO and DMA"),
    hal::binary_info::rp_cargo_homepage_url!(),
    hal::binary_info::rp_program_build_attribute!(),
];
