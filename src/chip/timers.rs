//! Timer A (10-bit) and Timer B (8-bit + 4-bit subcounter), including the
//! CSM keyon pulse tied to Timer A. Ports `RN_DoTimerA`, `RN_DoTimerB`.

use super::Chip;

pub(crate) fn do_timer_a(chip: &mut Chip) {
    let mut load = chip.timer_a_overflow;
    if chip.cycles == 2 {
        load = load || (!chip.timer_a_load_lock && chip.timer_a_load);
        chip.timer_a_load_lock = chip.timer_a_load;
        chip.mode_kon_csm = chip.mode_csm && load;
    }

    let mut time = if chip.timer_a_load_latch { chip.timer_a_reg } else { chip.timer_a_cnt };
    chip.timer_a_load_latch = load;

    if (chip.cycles == 1 && chip.timer_a_load_lock) || chip.mode_test_21[2] {
        time += 1;
    }

    if chip.timer_a_reset {
        chip.timer_a_reset = false;
        chip.timer_a_overflow_flag = false;
    } else {
        chip.timer_a_overflow_flag |= chip.timer_a_overflow && chip.timer_a_enable;
    }

    chip.timer_a_overflow = (time >> 10) != 0;
    chip.timer_a_cnt = time & 0x3ff;
}

pub(crate) fn do_timer_b(chip: &mut Chip) {
    let mut load = chip.timer_b_overflow;
    if chip.cycles == 2 {
        load = load || (!chip.timer_b_load_lock && chip.timer_b_load);
        chip.timer_b_load_lock = chip.timer_b_load;
    }

    let mut time = if chip.timer_b_load_latch { chip.timer_b_reg } else { chip.timer_b_cnt };
    chip.timer_b_load_latch = load;

    if chip.cycles == 1 {
        chip.timer_b_subcnt += 1;
    }
    if (chip.timer_b_subcnt == 0x10 && chip.timer_b_load_lock) || chip.mode_test_21[2] {
        time += 1;
    }
    chip.timer_b_subcnt &= 0x0f;

    if chip.timer_b_reset {
        chip.timer_b_reset = false;
        chip.timer_b_overflow_flag = false;
    } else {
        chip.timer_b_overflow_flag |= chip.timer_b_overflow && chip.timer_b_enable;
    }

    chip.timer_b_overflow = (time >> 8) != 0;
    chip.timer_b_cnt = time & 0xff;
}
