//! Timing program assembly: operand patching and instruction layout.

use pico_dvp_core::pins::PinAssignment;
use pico_dvp_core::program::{
    self, decode, patch_template, Instruction, Protocol, WaitSource, HSYNC_WAIT,
    PCLK_FALL_WAIT, PCLK_RISE_WAIT, SAMPLE,
};

#[test]
fn template_matches_reference_encoding() {
    // wait 1 gpio 0 / wait 1 gpio 0 / in pins, 0 / wait 0 gpio 0
    assert_eq!(Protocol::DVP.template(), [0x2080, 0x2080, 0x4000, 0x2000]);
}

#[test]
fn example_assignment_patches_expected_operands() {
    let pins = PinAssignment::new(0, 2, 10, 11, 12).unwrap();
    let prog = program::assemble(Protocol::DVP, &pins);
    let code = prog.code();

    assert_eq!(code[HSYNC_WAIT] & 0x1F, 10);
    assert_eq!(code[PCLK_RISE_WAIT] & 0x1F, 11);
    assert_eq!(code[PCLK_FALL_WAIT] & 0x1F, 11);
    assert_eq!(code[SAMPLE] & 0x1F, 2);

    assert_eq!(
        decode(code[HSYNC_WAIT]),
        Instruction::Wait {
            polarity: true,
            source: WaitSource::Gpio,
            index: 10
        }
    );
    assert_eq!(
        decode(code[PCLK_FALL_WAIT]),
        Instruction::Wait {
            polarity: false,
            source: WaitSource::Gpio,
            index: 11
        }
    );
    assert_eq!(
        decode(code[SAMPLE]),
        Instruction::In {
            source: 0,
            bit_count: 2
        }
    );
}

#[test]
fn every_valid_assignment_patches_low_bits_only() {
    let template = Protocol::DVP.template();
    for count in 1..=8u8 {
        for base in 0..=(32 - count) {
            // First two pins outside the data bus.
            let mut free = (0..32u8).filter(|p| *p < base || *p >= base + count);
            let hsync = free.next().unwrap();
            let pclk = free.next().unwrap();
            let vsync = free.next().unwrap();

            let pins = PinAssignment::new(base, count, hsync, pclk, vsync).unwrap();
            let code = *program::assemble(Protocol::DVP, &pins).code();

            assert_eq!(code[HSYNC_WAIT] & 0x1F, (hsync & 0x1F) as u16);
            assert_eq!(code[PCLK_RISE_WAIT] & 0x1F, (pclk & 0x1F) as u16);
            assert_eq!(code[PCLK_FALL_WAIT] & 0x1F, (pclk & 0x1F) as u16);
            assert_eq!(code[SAMPLE] & 0x1F, count as u16);
            for i in 0..code.len() {
                assert_eq!(code[i] & !0x1F, template[i] & !0x1F, "high bits of {i}");
            }
        }
    }
}

#[test]
fn assembly_is_pure() {
    let pins = PinAssignment::new(4, 8, 0, 1, 2).unwrap();
    let a = program::assemble(Protocol::DVP, &pins);
    let b = program::assemble(Protocol::DVP, &pins);
    assert_eq!(a, b);
}

#[test]
fn image_carries_shift_settings() {
    let pins = PinAssignment::new(6, 4, 0, 1, 2).unwrap();
    let prog = program::assemble(Protocol::DVP, &pins);
    let image = prog.image();

    assert_eq!(image.code, prog.code());
    assert_eq!(image.wrap_target, 0);
    assert_eq!(image.wrap_source, 3);
    assert_eq!(image.in_pin_base, 6);
    assert_eq!(image.in_pin_count, 4);
    assert_eq!(image.push_threshold, 32);
    assert!(image.shift_left);
}

#[test]
fn inverted_protocol_flips_wait_polarities() {
    let protocol = Protocol {
        hsync_active_high: false,
        sample_on_rising: false,
    };
    let code = protocol.template();
    assert_eq!(code[HSYNC_WAIT], 0x2000);
    assert_eq!(code[PCLK_RISE_WAIT], 0x2000);
    assert_eq!(code[PCLK_FALL_WAIT], 0x2080);
}

/// The raw patch keeps the reference masking: pin indices above 31 alias
/// onto low pins instead of being rejected. Validated assignments never
/// reach this path with such values.
#[test]
fn raw_patch_aliases_out_of_range_pins() {
    let code = patch_template(Protocol::DVP.template(), 42, 43, 2);
    assert_eq!(code[HSYNC_WAIT] & 0x1F, 10);
    assert_eq!(code[PCLK_RISE_WAIT] & 0x1F, 11);

    assert!(PinAssignment::new(0, 2, 42, 43, 12).is_err());
}

#[test]
fn decode_in_zero_count_means_32() {
    assert_eq!(
        decode(program::encode_in_pins(32)),
        Instruction::In {
            source: 0,
            bit_count: 32
        }
    );
}

#[test]
fn decode_jmp_and_unknown() {
    assert_eq!(
        decode(program::encode_jmp(3)),
        Instruction::Jmp {
            condition: 0,
            address: 3
        }
    );
    // mov x, y
    assert_eq!(decode(0xA022), Instruction::Other(0xA022));
}
