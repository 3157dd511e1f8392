//! White-box scenario tests exercising internal pipeline state directly
//! (register decode results, EG state machine, SSG-EG latches). Black-box
//! behaviour (audio output, timers, DAC) is covered by `tests/scenarios.rs`
//! and `tests/properties.rs` at the crate root.

use super::*;

fn write_reg(chip: &mut Chip, port: u8, reg: u8, data: u8) {
    chip.write(port, reg);
    chip.clock(12);
    chip.write(port + 1, data);
    chip.clock(32);
}

#[test]
fn key_on_then_key_off_round_trips_through_eg_states() {
    let mut chip = Chip::new(ChipType::ym2612());

    // Fast attack, slow-ish release, full volume, algorithm 7 so op1 is a
    // carrier and its envelope is directly observable.
    write_reg(&mut chip, 0, regs::FEEDBACK_ALGO, 0x07);
    write_reg(&mut chip, 0, regs::DT_MULTI, 0x01);
    write_reg(&mut chip, 0, regs::TOTAL_LEVEL, 0x00);
    write_reg(&mut chip, 0, regs::KS_AR, 0x1F);
    write_reg(&mut chip, 0, regs::AM_D1R, 0x00);
    write_reg(&mut chip, 0, regs::D2R, 0x00);
    write_reg(&mut chip, 0, regs::D1L_RR, 0x0F);

    assert_eq!(chip.eg_state[0], EgState::Release);
    assert_eq!(chip.eg_level[0], 0x3ff);

    write_reg(&mut chip, 0, regs::KEY_ON_OFF, 0xF0);
    chip.clock(24 * 20);

    assert_ne!(
        chip.eg_state[0],
        EgState::Release,
        "operator should have left release after key-on"
    );
    assert!(
        chip.eg_level[0] < 0x3ff,
        "envelope should have attacked away from full attenuation"
    );

    write_reg(&mut chip, 0, regs::KEY_ON_OFF, 0x00);
    chip.clock(24 * 2000);

    assert_eq!(
        chip.eg_state[0],
        EgState::Release,
        "key-off should force the operator back to release"
    );
    assert_eq!(
        chip.eg_level[0], 0x3ff,
        "envelope should converge to full attenuation after key-off"
    );
}

#[test]
fn ssg_eg_inverse_follows_level_crossing() {
    let mut chip = Chip::new(ChipType::ym2612());

    write_reg(&mut chip, 0, regs::FEEDBACK_ALGO, 0x07);
    write_reg(&mut chip, 0, regs::DT_MULTI, 0x01);
    write_reg(&mut chip, 0, regs::TOTAL_LEVEL, 0x00);
    write_reg(&mut chip, 0, regs::KS_AR, 0x1F);
    write_reg(&mut chip, 0, regs::AM_D1R, 0x0B);
    write_reg(&mut chip, 0, regs::D2R, 0x00);
    write_reg(&mut chip, 0, regs::D1L_RR, 0x0F);
    // SSG-EG = 0x0C: enable + alternate, inverse-on-hold pattern.
    write_reg(&mut chip, 0, regs::SSG_EG, 0x0C);

    write_reg(&mut chip, 0, regs::KEY_ON_OFF, 0xF0);

    let mut saw_inverse = false;
    for _ in 0..4000 {
        chip.clock(24);
        if chip.eg_ssg_inv[0] {
            saw_inverse = true;
            break;
        }
    }
    assert!(saw_inverse, "SSG-EG inverse latch should engage at least once");
}

#[test]
fn channel3_special_mode_selects_alternate_frequency_table() {
    let mut chip = Chip::new(ChipType::ym2612());

    // Channel-3 special mode (bits 6-7 = 01).
    write_reg(&mut chip, 0, regs::TIMERS_CH3, 0x40);
    assert_eq!(chip.mode_ch3, 1);

    write_reg(&mut chip, 0, regs::FREQ_3CH_LSB, 0x34);
    write_reg(&mut chip, 0, regs::FREQ_3CH_BLOCK_MSB, (3 << 3) | 0x01);
    assert_eq!(chip.block_3ch[0], 3);
    assert_ne!(chip.fnum_3ch[0], 0);

    // mode_ch3 == 1 does not activate the alternate table for PG routing
    // (only mode_ch3 == 2, the CSM combination bit pattern checked in
    // `Chip::step`); mode_ch3 == 3 also routes through the alternate table
    // per hardware. Exercise the routing path explicitly.
    chip.mode_ch3 = 2;
    chip.cycles = 0;
    chip.channel = 0;
    chip.clock1();
    // Slot 7 (channel 1) should pick up the channel-3 alternate table on
    // the next few ticks once `cycles` rotates to 7; assert it doesn't
    // panic and produces a finite phase increment.
    for _ in 0..10 {
        chip.clock1();
    }
    assert!(chip.pg_inc[7] <= 0xfffff);
}

#[test]
fn reset_restores_initial_envelope_and_pipeline_state() {
    let mut chip = Chip::new(ChipType::ym2612());
    write_reg(&mut chip, 0, regs::KEY_ON_OFF, 0xF0);
    write_reg(&mut chip, 0, regs::FEEDBACK_ALGO, 0x07);
    chip.clock(24 * 50);

    chip.reset();

    assert_eq!(chip.eg_state, [EgState::Release; NUM_SLOTS]);
    assert_eq!(chip.eg_level, [0x3ff; NUM_SLOTS]);
    assert_eq!(chip.eg_out, [0x3ff; NUM_SLOTS]);
    assert_eq!(chip.multi, [1; NUM_SLOTS]);
    assert_eq!(chip.pan_l, [true; NUM_CHANNELS]);
    assert_eq!(chip.pan_r, [true; NUM_CHANNELS]);
    assert_eq!(chip.cycles, 0);
}

#[test]
fn invalid_keyonoff_low_bits_address_no_channel() {
    let mut chip = Chip::new(ChipType::ym2612());
    write_reg(&mut chip, 0, regs::KEY_ON_OFF, 0xF3);
    assert_eq!(chip.mode_kon_channel, 0xff);
    // Committing against channel 0xff should never touch any real slot.
    let before = chip.mode_kon;
    chip.clock(24);
    assert_eq!(chip.mode_kon, before);
}
