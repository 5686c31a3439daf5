//! Timing program: the DVP sampling loop as PIO machine code.
//!
//! One pass of the loop samples one pixel clock:
//!
//! ```text
//! 0: wait 1 gpio HSYNC   ; line active
//! 1: wait 1 gpio PCLK    ; sampling edge
//! 2: in   pins, WIDTH    ; latch the data bus, autopush at 32 bits
//! 3: wait 0 gpio PCLK    ; clock back low
//! ```
//!
//! The template carries zero operands; pins and sample width are OR-ed into
//! the low five bits when the program is assembled.

use pico_dvp_hal::ProgramImage;

use crate::pins::PinAssignment;

/// Instructions in the sampling loop.
pub const PROGRAM_LEN: usize = 4;

/// Autopush threshold: one full 32-bit sample word.
pub const PUSH_THRESHOLD: u8 = 32;

/// Low five bits carry the pin index or bit count.
pub const OPERAND_MASK: u16 = 0x1F;

const OP_JMP: u16 = 0b000 << 13;
const OP_WAIT: u16 = 0b001 << 13;
const OP_IN: u16 = 0b010 << 13;

const WAIT_POLARITY: u16 = 1 << 7;
const WAIT_SRC_GPIO: u16 = 0b00 << 5;
const IN_SRC_PINS: u16 = 0b000 << 5;

/// Index of the instruction waiting on HSYNC.
pub const HSYNC_WAIT: usize = 0;
/// Index of the instruction waiting for the sampling edge.
pub const PCLK_RISE_WAIT: usize = 1;
/// Index of the `in pins` instruction.
pub const SAMPLE: usize = 2;
/// Index of the instruction waiting for the clock to return.
pub const PCLK_FALL_WAIT: usize = 3;

/// `wait <polarity> gpio <index>`
pub const fn encode_wait_gpio(polarity: bool, index: u8) -> u16 {
    let pol = if polarity { WAIT_POLARITY } else { 0 };
    OP_WAIT | pol | WAIT_SRC_GPIO | (index as u16 & OPERAND_MASK)
}

/// `in pins, <bit_count>` (32 encodes as 0)
pub const fn encode_in_pins(bit_count: u8) -> u16 {
    OP_IN | IN_SRC_PINS | (bit_count as u16 & OPERAND_MASK)
}

/// `jmp <address>`
pub const fn encode_jmp(address: u8) -> u16 {
    OP_JMP | (address as u16 & OPERAND_MASK)
}

/// Signal polarities of a DVP flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Protocol {
    /// HSYNC/HREF is high while a line is being transferred.
    pub hsync_active_high: bool,
    /// Data is valid on the rising edge of PCLK.
    pub sample_on_rising: bool,
}

impl Protocol {
    /// Active-high HREF, data latched on the rising pixel clock edge.
    pub const DVP: Protocol = Protocol {
        hsync_active_high: true,
        sample_on_rising: true,
    };

    /// Unpatched program: all pin operands and the sample width are zero.
    pub const fn template(&self) -> [u16; PROGRAM_LEN] {
        [
            encode_wait_gpio(self.hsync_active_high, 0),
            encode_wait_gpio(self.sample_on_rising, 0),
            encode_in_pins(0),
            encode_wait_gpio(!self.sample_on_rising, 0),
        ]
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::DVP
    }
}

/// Patch pins and sample width into a template.
///
/// Pin operands are OR-ed in as `pin & 0x1F`; the width field has its low
/// five bits cleared and `width` OR-ed in unmasked. Out-of-range values alias
/// silently, so callers that did not validate get a program sampling the
/// wrong pins. [`assemble`] is the validated path.
pub const fn patch_template(
    template: [u16; PROGRAM_LEN],
    hsync: u8,
    pclk: u8,
    width: u8,
) -> [u16; PROGRAM_LEN] {
    let mut code = template;
    code[HSYNC_WAIT] |= hsync as u16 & OPERAND_MASK;
    code[PCLK_RISE_WAIT] |= pclk as u16 & OPERAND_MASK;
    code[SAMPLE] &= !OPERAND_MASK;
    code[SAMPLE] |= width as u16;
    code[PCLK_FALL_WAIT] |= pclk as u16 & OPERAND_MASK;
    code
}

/// A sampling program ready to load into a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingProgram {
    code: [u16; PROGRAM_LEN],
    in_pin_base: u8,
    in_pin_count: u8,
}

impl TimingProgram {
    pub fn code(&self) -> &[u16; PROGRAM_LEN] {
        &self.code
    }

    pub fn wrap_target(&self) -> u8 {
        0
    }

    pub fn wrap_source(&self) -> u8 {
        (PROGRAM_LEN - 1) as u8
    }

    /// Loadable image including shift and pin settings.
    pub fn image(&self) -> ProgramImage<'_> {
        ProgramImage {
            code: &self.code,
            wrap_target: self.wrap_target(),
            wrap_source: self.wrap_source(),
            in_pin_base: self.in_pin_base,
            in_pin_count: self.in_pin_count,
            push_threshold: PUSH_THRESHOLD,
            shift_left: true,
        }
    }
}

/// Assemble the sampling program for a validated pin assignment.
///
/// Pure: the same inputs always give the same program.
pub fn assemble(protocol: Protocol, pins: &PinAssignment) -> TimingProgram {
    TimingProgram {
        code: patch_template(
            protocol.template(),
            pins.hsync(),
            pins.pclk(),
            pins.data_count(),
        ),
        in_pin_base: pins.data_base(),
        in_pin_count: pins.data_count(),
    }
}

/// WAIT instruction source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitSource {
    Gpio,
    Pin,
    Irq,
    JmpPin,
}

/// Decoded form of the instructions the sampling loop uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instruction {
    Jmp { condition: u8, address: u8 },
    Wait { polarity: bool, source: WaitSource, index: u8 },
    /// `bit_count` is 1..=32.
    In { source: u8, bit_count: u8 },
    Other(u16),
}

/// Decode one instruction word. Delay/side-set bits are ignored.
pub fn decode(word: u16) -> Instruction {
    let operand = (word & OPERAND_MASK) as u8;
    let field = ((word >> 5) & 0b111) as u8;
    match word >> 13 {
        0b000 => Instruction::Jmp {
            condition: field,
            address: operand,
        },
        0b001 => Instruction::Wait {
            polarity: word & WAIT_POLARITY != 0,
            source: match field & 0b11 {
                0b00 => WaitSource::Gpio,
                0b01 => WaitSource::Pin,
                0b10 => WaitSource::Irq,
                _ => WaitSource::JmpPin,
            },
            index: operand,
        },
        0b010 => Instruction::In {
            source: field,
            bit_count: if operand == 0 { 32 } else { operand },
        },
        _ => Instruction::Other(word),
    }
}
