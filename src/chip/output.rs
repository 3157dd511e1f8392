//! Channel output locking, panning and YM2612/YM3438 DAC shaping. Ports
//! `RN_ChOutput`.

use super::{sign_extend, Chip, NUM_CHANNELS};

pub(crate) fn ch_output(chip: &mut Chip) {
    let slot = chip.cycles as usize;
    let mut channel = chip.channel;
    if slot < 12 {
        channel = (channel + 1) % NUM_CHANNELS;
    }

    let test_dac = chip.mode_test_2c[5];

    if slot & 3 == 0 && !test_dac {
        chip.ch_lock = chip.ch_out[channel];
        chip.ch_lock_l = chip.pan_l[channel];
        chip.ch_lock_r = chip.pan_r[channel];
        chip.ch_read = chip.ch_lock;
    }

    let dac_phase = (slot >> 2) == 1;
    let mut out = chip.ch_lock;
    if (dac_phase && chip.dacen) || test_dac {
        out = sign_extend(9, chip.dacdata);
    }

    let (mol, mor) = if chip.chip_type.ym2612 {
        let out_en = (slot & 3) == 3 || test_dac;
        let mut sign = out >> 8;
        let mut out = out;
        if out >= 0 {
            out += 1;
            sign += 1;
        }
        // Pan disabled or output not enabled this cycle: the DAC emits the
        // sign bit alone rather than silence (matches the reference; noted
        // "not verified" there but kept for audible compatibility).
        let l = if chip.ch_lock_l && out_en { out } else { sign };
        let r = if chip.ch_lock_r && out_en { out } else { sign };
        (l * 3, r * 3)
    } else {
        let out_en = (slot & 3) != 0 || test_dac;
        if out_en {
            let l = if chip.ch_lock_l { out } else { 0 };
            let r = if chip.ch_lock_r { out } else { 0 };
            (l, r)
        } else {
            (0, 0)
        }
    };

    chip.mol = mol;
    chip.mor = mor;
}
