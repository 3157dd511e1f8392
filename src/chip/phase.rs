//! Phase generator: increment calculation (LFO-PM, detune, block, multi) and
//! the phase accumulator step. Ports `RN_PhaseCalcIncrement` and
//! `RN_PhaseGenerate`.

use super::tables::{PG_DETUNE, PG_LFO_SH1, PG_LFO_SH2};
use super::{Chip, NUM_SLOTS};

pub(crate) fn phase_calc_increment(chip: &mut Chip) {
    let slot = chip.cycles as usize;
    let channel = slot % 6;

    let fnum_h = chip.pg_fnum >> 4;
    let fnum = chip.pg_fnum << 1;
    let pms = chip.pms[channel];
    let lfo = chip.lfo_pm;

    let lfo_l = if lfo & 0x08 != 0 { lfo ^ 0x0f } else { lfo } & 0x0f;
    let sh1 = PG_LFO_SH1[pms as usize][(lfo_l & 0x7) as usize];
    let sh2 = PG_LFO_SH2[pms as usize][(lfo_l & 0x7) as usize];
    let mut fm = (fnum_h >> sh1) + (fnum_h >> sh2);
    if pms > 5 {
        fm <<= pms - 5;
    }
    let fm = fm >> 2;
    let fnum = if lfo & 0x10 != 0 {
        fnum.wrapping_sub(fm)
    } else {
        fnum.wrapping_add(fm)
    } & 0xfff;

    let basefreq = (fnum << chip.pg_block) >> 2;

    let dt = chip.dt[slot];
    let dt_l = dt & 0x03;
    let mut detune = 0u32;
    if dt_l != 0 {
        let kcode = chip.pg_kcode.min(0x1c);
        let block = kcode >> 2;
        let note = kcode & 0x03;
        let sum = block + 9 + (((dt_l == 3) || (dt_l & 0x02 != 0)) as u32);
        let sum_h = sum >> 1;
        let sum_l = sum & 1;
        let detune_index = ((sum_l << 2) | note) as usize & 0x7;
        detune = PG_DETUNE[detune_index] >> (9u32.saturating_sub(sum_h).min(31));
    }

    let basefreq = if dt & 0x4 != 0 {
        basefreq.wrapping_sub(detune)
    } else {
        basefreq.wrapping_add(detune)
    } & 0x1ffff;

    let inc = (basefreq * chip.multi[slot]) >> 1;
    chip.pg_inc[slot] = inc & 0xfffff;
}

pub(crate) fn phase_generate(chip: &mut Chip) {
    let reset_slot = (chip.cycles as usize + 20) % NUM_SLOTS;
    if chip.pg_reset[reset_slot] {
        chip.pg_inc[reset_slot] = 0;
    }

    let phase_slot = (chip.cycles as usize + 19) % NUM_SLOTS;
    if chip.pg_reset[phase_slot] || chip.mode_test_21[3] {
        chip.pg_phase[phase_slot] = 0;
    }
    chip.pg_phase[phase_slot] =
        (chip.pg_phase[phase_slot].wrapping_add(chip.pg_inc[phase_slot])) & 0xfffff;
}
