//! Envelope generator: SSG-EG latch truth table, ADSR state machine, rate
//! preparation and output formation. Ports `RN_EnvelopeSSGEG`,
//! `RN_EnvelopeADSR`, `RN_EnvelopePrepare`, `RN_EnvelopeGenerate`.

use super::tables::{EG_AM_SHIFT, EG_STEPHI};
use super::{Chip, EgState, NUM_SLOTS};

pub(crate) fn envelope_ssg_eg(chip: &mut Chip) {
    let slot = chip.cycles as usize;
    chip.eg_ssg_pgrst_latch[slot] = false;
    chip.eg_ssg_repeat_latch[slot] = false;
    chip.eg_ssg_hold_up_latch[slot] = false;

    let ssg = chip.ssg_eg[slot];
    let mut direction = false;
    if ssg & 0x08 != 0 {
        direction = chip.eg_ssg_dir[slot];
        if chip.eg_level[slot] & 0x200 != 0 {
            if ssg & 0x03 == 0x00 {
                chip.eg_ssg_pgrst_latch[slot] = true;
            }
            if ssg & 0x01 == 0x00 {
                chip.eg_ssg_repeat_latch[slot] = true;
            }
            if ssg & 0x03 == 0x02 {
                direction = !direction;
            }
            if ssg & 0x03 == 0x03 {
                direction = true;
            }
        }
        if chip.eg_kon_latch[slot] && (ssg & 0x07 == 0x05 || ssg & 0x07 == 0x03) {
            chip.eg_ssg_hold_up_latch[slot] = true;
        }
        direction &= chip.eg_kon[slot];
    }
    chip.eg_ssg_dir[slot] = direction;
    chip.eg_ssg_enable[slot] = (ssg >> 3) & 1 != 0;
    chip.eg_ssg_inv[slot] =
        (chip.eg_ssg_dir[slot] ^ (((ssg >> 2) & 1 != 0) && ((ssg >> 3) & 1 != 0))) && chip.eg_kon[slot];
}

pub(crate) fn envelope_adsr(chip: &mut Chip) {
    let slot = (chip.cycles as usize + 22) % NUM_SLOTS;

    let nkon = chip.eg_kon_latch[slot];
    let okon = chip.eg_kon[slot];

    chip.eg_read[0] = chip.eg_read_inc as u32;
    chip.eg_read_inc = chip.eg_inc > 0;

    chip.pg_reset[slot] = (nkon && !okon) || chip.eg_ssg_pgrst_latch[slot];

    let kon_event = (nkon && !okon) || (okon && chip.eg_ssg_repeat_latch[slot]);
    let koff_event = okon && !nkon;

    let level_raw = chip.eg_level[slot];
    let mut ssg_level = level_raw;
    if chip.eg_ssg_inv[slot] {
        ssg_level = (512u32.wrapping_sub(level_raw)) & 0x3ff;
    }
    let level = if koff_event { ssg_level } else { level_raw };

    let eg_off = if chip.eg_ssg_enable[slot] {
        (level >> 9) != 0
    } else {
        (level & 0x3f0) == 0x3f0
    };

    let mut nextstate = chip.eg_state[slot];
    let mut nextlevel = level as i32;
    let mut inc: i32 = 0;

    if kon_event {
        nextstate = EgState::Attack;
        if chip.eg_ratemax {
            nextlevel = 0;
        } else if chip.eg_state[slot] == EgState::Attack
            && level != 0
            && chip.eg_inc != 0
            && nkon
        {
            inc = ((!(level as i32)) << chip.eg_inc) >> 5;
        }
    } else {
        match chip.eg_state[slot] {
            EgState::Attack => {
                if level == 0 {
                    nextstate = EgState::Decay;
                } else if chip.eg_inc != 0 && !chip.eg_ratemax && nkon {
                    inc = ((!(level as i32)) << chip.eg_inc) >> 5;
                }
            }
            EgState::Decay => {
                if (level >> 4) == (chip.eg_sl[1] << 1) {
                    nextstate = EgState::Sustain;
                } else if !eg_off && chip.eg_inc != 0 {
                    inc = 1 << (chip.eg_inc - 1);
                    if chip.eg_ssg_enable[slot] {
                        inc <<= 2;
                    }
                }
            }
            EgState::Sustain | EgState::Release => {
                if !eg_off && chip.eg_inc != 0 {
                    inc = 1 << (chip.eg_inc - 1);
                    if chip.eg_ssg_enable[slot] {
                        inc <<= 2;
                    }
                }
            }
        }
        if !nkon {
            nextstate = EgState::Release;
        }
    }

    if chip.eg_kon_csm[slot] {
        nextlevel |= (chip.eg_tl[1] << 3) as i32;
    }

    if !kon_event
        && !chip.eg_ssg_hold_up_latch[slot]
        && chip.eg_state[slot] != EgState::Attack
        && eg_off
    {
        nextstate = EgState::Release;
        nextlevel = 0x3ff;
    }

    nextlevel += inc;

    chip.eg_kon[slot] = chip.eg_kon_latch[slot];
    chip.eg_level[slot] = (nextlevel as u32) & 0x3ff;
    chip.eg_state[slot] = nextstate;
}

pub(crate) fn envelope_prepare(chip: &mut Chip) {
    let slot = chip.cycles as usize;
    let channel = slot % 6;

    // Prepare this tick's increment from the rate/ksv left over from this
    // slot's previous visit; only actually applied when the shared EG timer
    // quotient reaches 2 (see `Chip::step`), which throttles every slot to
    // the same cadence regardless of how often `envelope_prepare` itself runs.
    let mut rate = (chip.eg_rate << 1) + chip.eg_ksv;
    if rate > 0x3f {
        rate = 0x3f;
    }

    let sum = ((rate >> 2) + chip.eg_shift_lock) & 0xf;
    let mut inc = 0u32;
    if chip.eg_rate != 0 && chip.eg_quotient == 2 {
        if rate < 48 {
            inc = match sum {
                12 => 1,
                13 => (rate >> 1) & 1,
                14 => rate & 1,
                _ => 0,
            };
        } else {
            let raw = EG_STEPHI[(rate & 3) as usize][chip.eg_timer_low_lock as usize] + (rate >> 2);
            inc = raw.saturating_sub(11).min(4);
        }
    }
    chip.eg_inc = inc;
    chip.eg_ratemax = (rate >> 1) == 0x1f;

    // Prepare rate & ksv for this slot's next visit.
    let mut rate_sel = chip.eg_state[slot];
    if (chip.eg_kon[slot] && chip.eg_ssg_repeat_latch[slot])
        || (!chip.eg_kon[slot] && chip.eg_kon_latch[slot])
    {
        rate_sel = EgState::Attack;
    }
    chip.eg_rate = match rate_sel {
        EgState::Attack => chip.ar[slot],
        EgState::Decay => chip.dr[slot],
        EgState::Sustain => chip.sr[slot],
        EgState::Release => (chip.rr[slot] << 1) | 1,
    };
    chip.eg_ksv = chip.pg_kcode >> (chip.ks[slot] ^ 3);

    chip.eg_lfo_am = if chip.am[slot] {
        chip.lfo_am >> EG_AM_SHIFT[chip.ams[channel] as usize]
    } else {
        0
    };

    chip.eg_tl[1] = chip.eg_tl[0];
    chip.eg_tl[0] = chip.tl[slot];
    chip.eg_sl[1] = chip.eg_sl[0];
    chip.eg_sl[0] = chip.sl[slot];
}

pub(crate) fn envelope_generate(chip: &mut Chip) {
    let slot = (chip.cycles as usize + 23) % NUM_SLOTS;
    let mut level = chip.eg_level[slot];
    if chip.eg_ssg_inv[slot] {
        level = 512u32.wrapping_sub(level);
    }
    if chip.mode_test_21[5] {
        level = 0;
    }
    level &= 0x3ff;

    level += chip.eg_lfo_am;

    if !(chip.mode_csm && chip.channel == 3) {
        level += chip.eg_tl[0] << 3;
    }

    chip.eg_out[slot] = level.min(0x3ff);
}
