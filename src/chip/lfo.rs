//! Low frequency oscillator: counter/quotient update and AM/PM derivation.
//! Ports `RN_UpdateLFO` and the cycle-0 AM/PM derivation embedded in
//! `RN_Clock1`.

use super::tables::LFO_CYCLES;
use super::Chip;

pub(crate) fn update_lfo(chip: &mut Chip) {
    let cycles = LFO_CYCLES[chip.lfo_freq as usize];
    if (chip.lfo_quotient & cycles) == cycles {
        chip.lfo_quotient = 0;
        chip.lfo_cnt = chip.lfo_cnt.wrapping_add(1);
    } else {
        chip.lfo_quotient += chip.lfo_inc;
    }
    if !chip.lfo_en {
        chip.lfo_cnt = 0;
    }
}

pub(crate) fn derive_am_pm(chip: &mut Chip) {
    let cnt = chip.lfo_cnt;
    chip.lfo_pm = cnt >> 2;
    let am = if cnt & 0x40 != 0 { cnt & 0x3f } else { cnt ^ 0x3f };
    chip.lfo_am = am << 1;
}
