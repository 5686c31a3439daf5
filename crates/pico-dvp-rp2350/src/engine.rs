//! PIO0 state machine 0 as the DVP sampling engine.
//!
//! Installation and start/stop go through rp235x-hal. Restart and the FIFO
//! level use PIO0 registers directly; the HAL has no call that keeps the RX
//! FIFO while clearing the shift counter.

use pico_dvp_core::program::{decode, encode_jmp, Instruction, WaitSource};
use pico_dvp_hal::{ProgramImage, SamplingEngine};
use rp235x_hal as hal;

use hal::pac::PIO0;
use hal::pio::{
    Buffers, PIOBuilder, Running, Rx, ShiftDirection, StateMachine, Stopped, Tx,
    UninitStateMachine, PIO, SM0,
};

type Sm = (PIO0, SM0);

/// State machine index within the block.
const SM_INDEX: u8 = 0;

enum Machine {
    Uninit(UninitStateMachine<Sm>),
    Stopped(StateMachine<Sm, Stopped>),
    Running(StateMachine<Sm, Running>),
    /// Only observed while a transition is in progress.
    Moving,
}

/// Sampling engine backed by PIO0 SM0.
pub struct PioEngine {
    pio: PIO<PIO0>,
    machine: Machine,
    fifos: Option<(Rx<Sm>, Tx<Sm>)>,
    /// Absolute instruction address the program wraps back to.
    wrap_target: u8,
}

impl PioEngine {
    pub fn new(pio: PIO<PIO0>, sm: UninitStateMachine<Sm>) -> Self {
        Self {
            pio,
            machine: Machine::Uninit(sm),
            fifos: None,
            wrap_target: 0,
        }
    }

    /// Stop the machine and return its program slot to the block.
    fn unload(&mut self) {
        let stopped = match core::mem::replace(&mut self.machine, Machine::Moving) {
            Machine::Running(sm) => sm.stop(),
            Machine::Stopped(sm) => sm,
            other => {
                self.machine = other;
                return;
            }
        };
        let Some((rx, tx)) = self.fifos.take() else {
            defmt::panic!("loaded state machine without FIFOs");
        };
        let (uninit, program) = stopped.uninit(rx, tx);
        self.pio.uninstall(program);
        self.machine = Machine::Uninit(uninit);
    }
}

/// Rebuild an image as a `pio` program so the block allocator can place it.
fn to_program(image: &ProgramImage<'_>) -> pio::Program<{ pio::RP2040_MAX_PROGRAM_SIZE }> {
    let mut a = pio::Assembler::<{ pio::RP2040_MAX_PROGRAM_SIZE }>::new();
    let mut wrap_target = a.label();
    let mut wrap_source = a.label();
    for (pc, &word) in image.code.iter().enumerate() {
        if pc == image.wrap_target as usize {
            a.bind(&mut wrap_target);
        }
        match decode(word) {
            Instruction::Wait {
                polarity,
                source: WaitSource::Gpio,
                index,
            } => a.wait(polarity as u8, pio::WaitSource::GPIO, index, false),
            Instruction::In {
                source: 0,
                bit_count,
            } => a.r#in(pio::InSource::PINS, bit_count),
            other => defmt::panic!("no PIO encoding for {} at {}", other, pc),
        }
        if pc == image.wrap_source as usize {
            a.bind(&mut wrap_source);
        }
    }
    a.assemble_with_wrap(wrap_source, wrap_target)
}

impl SamplingEngine for PioEngine {
    fn load(&mut self, image: &ProgramImage<'_>) {
        self.unload();
        let Machine::Uninit(sm) = core::mem::replace(&mut self.machine, Machine::Moving) else {
            defmt::panic!("state machine still holds a program");
        };

        let program = to_program(image);
        let installed = match self.pio.install(&program) {
            Ok(p) => p,
            Err(e) => defmt::panic!("PIO install failed: {}", defmt::Debug2Format(&e)),
        };
        self.wrap_target = installed.offset() + image.wrap_target;

        let (sm, rx, tx) = PIOBuilder::from_installed_program(installed)
            .in_pin_base(image.in_pin_base)
            .in_shift_direction(if image.shift_left {
                ShiftDirection::Left
            } else {
                ShiftDirection::Right
            })
            .autopush(true)
            .push_threshold(image.push_threshold)
            .buffers(Buffers::OnlyRx)
            .clock_divisor_fixed_point(1, 0)
            .build(sm);
        self.machine = Machine::Stopped(sm);
        self.fifos = Some((rx, tx));
        defmt::debug!(
            "sampler loaded: {} words, in pins {}+{}",
            image.code.len(),
            image.in_pin_base,
            image.in_pin_count
        );
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.machine = match core::mem::replace(&mut self.machine, Machine::Moving) {
            Machine::Stopped(sm) if enabled => Machine::Running(sm.start()),
            Machine::Running(sm) if !enabled => Machine::Stopped(sm.stop()),
            other => other,
        };
    }

    fn is_enabled(&self) -> bool {
        matches!(self.machine, Machine::Running(_))
    }

    fn restart(&mut self) {
        let pio = unsafe { &*PIO0::ptr() };
        // SM_RESTART clears the ISR shift counter and any stall; it does not
        // move the program counter or touch the FIFOs.
        pio.ctrl()
            .modify(|r, w| unsafe { w.bits(r.bits() | (1 << (4 + SM_INDEX))) });
        let jmp = encode_jmp(self.wrap_target);
        pio.sm(SM_INDEX as usize)
            .sm_instr()
            .write(|w| unsafe { w.bits(jmp as u32) });
    }

    fn rx_level(&self) -> usize {
        let pio = unsafe { &*PIO0::ptr() };
        // RX level of SM n sits at bits 8n+7..8n+4.
        ((pio.flevel().read().bits() >> (8 * SM_INDEX as u32 + 4)) & 0xF) as usize
    }

    fn pop(&mut self) -> Option<u32> {
        self.fifos.as_mut().and_then(|(rx, _)| rx.read())
    }

    fn rx_fifo_addr(&self) -> u32 {
        match &self.fifos {
            Some((rx, _)) => rx.fifo_address() as u32,
            None => 0,
        }
    }
}
