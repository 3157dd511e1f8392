//! Cycle-accurate YM2612 / YM3438 FM synthesis core.
//!
//! [`Chip`] owns the entire state of one chip instance: the 24-stage
//! rotating operator pipeline, the six FM channels, the register file, the
//! write latch, timers, LFO and the output sample queue. Advance it one
//! master tick at a time with [`Chip::clock`]; every 24 ticks it produces one
//! stereo frame, observable through [`Chip::dequeue_one`] / [`Chip::dequeue`].

mod envelope;
mod fm;
mod io;
mod keyon;
mod lfo;
mod output;
mod phase;
mod queue;
mod serde_support;
mod tables;
mod timers;

#[cfg(test)]
mod tests_scenarios;

use std::collections::TryReserveError;

/// Number of rotating operator pipeline slots (4 operators x 6 channels).
pub const NUM_SLOTS: usize = 24;
/// Number of FM channels.
pub const NUM_CHANNELS: usize = 6;

/// Register address constants, named after their function in the hardware.
pub mod regs {
    pub const TEST_21: u8 = 0x21;
    pub const LFO: u8 = 0x22;
    pub const TIMER_A_HI: u8 = 0x24;
    pub const TIMER_A_LO: u8 = 0x25;
    pub const TIMER_B: u8 = 0x26;
    pub const TIMERS_CH3: u8 = 0x27;
    pub const KEY_ON_OFF: u8 = 0x28;
    pub const DAC: u8 = 0x2A;
    pub const DAC_EN: u8 = 0x2B;
    pub const TEST_2C: u8 = 0x2C;
    pub const DT_MULTI: u8 = 0x30;
    pub const TOTAL_LEVEL: u8 = 0x40;
    pub const KS_AR: u8 = 0x50;
    pub const AM_D1R: u8 = 0x60;
    pub const D2R: u8 = 0x70;
    pub const D1L_RR: u8 = 0x80;
    pub const SSG_EG: u8 = 0x90;
    pub const FREQ_LSB: u8 = 0xA0;
    pub const FREQ_BLOCK_MSB: u8 = 0xA4;
    pub const FREQ_3CH_LSB: u8 = 0xA8;
    pub const FREQ_3CH_BLOCK_MSB: u8 = 0xAC;
    pub const FEEDBACK_ALGO: u8 = 0xB0;
    pub const STEREO_LFO_SENS: u8 = 0xB4;
}

/// Master clock divisor: the host clock rate divided by this yields the
/// chip's master-tick rate for NTSC Genesis hardware.
pub const SAMPLE_RATE_NTSC: u32 = 53_267;
/// Master clock divisor for PAL Genesis hardware.
pub const SAMPLE_RATE_PAL: u32 = 52_781;

const SAMPLE_QUEUE_FRAMES: usize = 1024;

/// Which physical chip variant to emulate. The YM3438 differs from the
/// YM2612 in its DAC/channel-output shaping and in how long a status read
/// holds its value (see [`crate::chip::output`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChipType {
    pub(crate) ym2612: bool,
    pub(crate) read_mode: bool,
}

impl ChipType {
    /// The original YM2612, as used in the Sega Genesis/Mega Drive.
    pub fn ym2612() -> Self {
        ChipType { ym2612: true, read_mode: false }
    }

    /// The YM3438, the CMOS die-shrink revision with different output
    /// shaping (no x3 DAC amplification).
    pub fn ym3438() -> Self {
        ChipType { ym2612: false, read_mode: false }
    }

    /// Enables the status-port read mux (test registers, FM outputs) in
    /// addition to the plain busy/timer status byte.
    pub fn with_read_mode(mut self) -> Self {
        self.read_mode = true;
        self
    }
}

impl Default for ChipType {
    fn default() -> Self {
        ChipType::ym2612()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) enum EgState {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Sign-extends the low `bits` bits of `value` to a full `i32`.
pub(crate) fn sign_extend(bits: u32, value: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Chip {
    pub(crate) chip_type: ChipType,

    pub(crate) cycles: u32,
    pub(crate) channel: usize,

    pub(crate) mol: i32,
    pub(crate) mor: i32,

    #[serde(with = "serde_support")]
    pub(crate) registers: [[u8; 256]; 2],

    pub(crate) write_data: u32,
    pub(crate) write_a: u8,
    pub(crate) write_d: u8,
    pub(crate) write_a_en: bool,
    pub(crate) write_d_en: bool,
    pub(crate) write_busy: bool,
    pub(crate) write_busy_cnt: u32,
    pub(crate) write_fm_address: bool,
    pub(crate) write_fm_data: bool,
    pub(crate) write_fm_mode_a: u32,
    pub(crate) address: u32,
    pub(crate) data: u8,

    pub(crate) pin_test_in: bool,
    pub(crate) pin_irq: bool,
    pub(crate) busy: bool,

    pub(crate) lfo_en: bool,
    pub(crate) lfo_freq: u32,
    pub(crate) lfo_pm: u32,
    pub(crate) lfo_am: u32,
    pub(crate) lfo_cnt: u32,
    pub(crate) lfo_inc: u32,
    pub(crate) lfo_quotient: u32,

    pub(crate) pg_fnum: u32,
    pub(crate) pg_block: u32,
    pub(crate) pg_kcode: u32,
    pub(crate) pg_inc: [u32; NUM_SLOTS],
    pub(crate) pg_phase: [u32; NUM_SLOTS],
    pub(crate) pg_reset: [bool; NUM_SLOTS],
    pub(crate) pg_read: u32,

    pub(crate) eg_cycle: u32,
    pub(crate) eg_cycle_stop: bool,
    pub(crate) eg_shift: u32,
    pub(crate) eg_shift_lock: u32,
    pub(crate) eg_timer_low_lock: u32,
    pub(crate) eg_timer: u32,
    pub(crate) eg_timer_inc: u32,
    pub(crate) eg_quotient: u32,
    pub(crate) eg_custom_timer: bool,
    pub(crate) eg_rate: u32,
    pub(crate) eg_ksv: u32,
    pub(crate) eg_inc: u32,
    pub(crate) eg_ratemax: bool,
    pub(crate) eg_sl: [u32; 2],
    pub(crate) eg_lfo_am: u32,
    pub(crate) eg_tl: [u32; 2],
    pub(crate) eg_state: [EgState; NUM_SLOTS],
    pub(crate) eg_level: [u32; NUM_SLOTS],
    pub(crate) eg_out: [u32; NUM_SLOTS],
    pub(crate) eg_kon: [bool; NUM_SLOTS],
    pub(crate) eg_kon_csm: [bool; NUM_SLOTS],
    pub(crate) eg_kon_latch: [bool; NUM_SLOTS],
    pub(crate) eg_ssg_enable: [bool; NUM_SLOTS],
    pub(crate) eg_ssg_pgrst_latch: [bool; NUM_SLOTS],
    pub(crate) eg_ssg_repeat_latch: [bool; NUM_SLOTS],
    pub(crate) eg_ssg_hold_up_latch: [bool; NUM_SLOTS],
    pub(crate) eg_ssg_dir: [bool; NUM_SLOTS],
    pub(crate) eg_ssg_inv: [bool; NUM_SLOTS],
    pub(crate) eg_read: [u32; 2],
    pub(crate) eg_read_inc: bool,

    pub(crate) fm_op1: [[i32; 2]; NUM_CHANNELS],
    pub(crate) fm_op2: [i32; NUM_CHANNELS],
    pub(crate) fm_out: [i32; NUM_SLOTS],
    pub(crate) fm_mod: [i32; NUM_SLOTS],

    pub(crate) ch_acc: [i32; NUM_CHANNELS],
    pub(crate) ch_out: [i32; NUM_CHANNELS],
    pub(crate) ch_lock: i32,
    pub(crate) ch_lock_l: bool,
    pub(crate) ch_lock_r: bool,
    pub(crate) ch_read: i32,

    pub(crate) timer_a_cnt: u32,
    pub(crate) timer_a_reg: u32,
    pub(crate) timer_a_load_lock: bool,
    pub(crate) timer_a_load: bool,
    pub(crate) timer_a_enable: bool,
    pub(crate) timer_a_reset: bool,
    pub(crate) timer_a_load_latch: bool,
    pub(crate) timer_a_overflow_flag: bool,
    pub(crate) timer_a_overflow: bool,

    pub(crate) timer_b_cnt: u32,
    pub(crate) timer_b_subcnt: u32,
    pub(crate) timer_b_reg: u32,
    pub(crate) timer_b_load_lock: bool,
    pub(crate) timer_b_load: bool,
    pub(crate) timer_b_enable: bool,
    pub(crate) timer_b_reset: bool,
    pub(crate) timer_b_load_latch: bool,
    pub(crate) timer_b_overflow_flag: bool,
    pub(crate) timer_b_overflow: bool,

    pub(crate) mode_test_21: [bool; 8],
    pub(crate) mode_test_2c: [bool; 8],
    pub(crate) mode_ch3: u32,
    pub(crate) mode_kon_channel: u32,
    pub(crate) mode_kon_operator: [bool; 4],
    pub(crate) mode_kon: [bool; NUM_SLOTS],
    pub(crate) mode_csm: bool,
    pub(crate) mode_kon_csm: bool,
    pub(crate) dacen: bool,
    pub(crate) dacdata: u32,

    pub(crate) ks: [u32; NUM_SLOTS],
    pub(crate) ar: [u32; NUM_SLOTS],
    pub(crate) sr: [u32; NUM_SLOTS],
    pub(crate) dt: [u32; NUM_SLOTS],
    pub(crate) multi: [u32; NUM_SLOTS],
    pub(crate) sl: [u32; NUM_SLOTS],
    pub(crate) rr: [u32; NUM_SLOTS],
    pub(crate) dr: [u32; NUM_SLOTS],
    pub(crate) am: [bool; NUM_SLOTS],
    pub(crate) tl: [u32; NUM_SLOTS],
    pub(crate) ssg_eg: [u32; NUM_SLOTS],

    pub(crate) fnum: [u32; NUM_CHANNELS],
    pub(crate) block: [u32; NUM_CHANNELS],
    pub(crate) kcode: [u32; NUM_CHANNELS],
    pub(crate) fnum_3ch: [u32; NUM_CHANNELS],
    pub(crate) block_3ch: [u32; NUM_CHANNELS],
    pub(crate) kcode_3ch: [u32; NUM_CHANNELS],
    pub(crate) reg_a4: u32,
    pub(crate) reg_ac: u32,
    pub(crate) connect: [u32; NUM_CHANNELS],
    pub(crate) fb: [u32; NUM_CHANNELS],
    pub(crate) pan_l: [bool; NUM_CHANNELS],
    pub(crate) pan_r: [bool; NUM_CHANNELS],
    pub(crate) ams: [u32; NUM_CHANNELS],
    pub(crate) pms: [u32; NUM_CHANNELS],

    pub(crate) status: u32,
    pub(crate) status_time: u32,

    pub(crate) current_sample: [i32; 2],
    pub(crate) sample_queue: queue::SampleQueue,
}

impl Chip {
    /// Creates a new chip of the given type, already reset and ready to
    /// accept register writes. Panics if the sample queue's backing buffer
    /// cannot be allocated; use [`Chip::try_new`] to handle that instead.
    pub fn new(chip_type: ChipType) -> Self {
        Self::try_new(chip_type).expect("failed to allocate chip sample queue")
    }

    /// Fallible counterpart to [`Chip::new`].
    pub fn try_new(chip_type: ChipType) -> Result<Self, TryReserveError> {
        let sample_queue = queue::SampleQueue::try_new(SAMPLE_QUEUE_FRAMES)?;
        let mut chip = Chip {
            chip_type,
            cycles: 0,
            channel: 0,
            mol: 0,
            mor: 0,
            registers: [[0; 256]; 2],
            write_data: 0,
            write_a: 0,
            write_d: 0,
            write_a_en: false,
            write_d_en: false,
            write_busy: false,
            write_busy_cnt: 0,
            write_fm_address: false,
            write_fm_data: false,
            write_fm_mode_a: 0,
            address: 0,
            data: 0,
            pin_test_in: false,
            pin_irq: false,
            busy: false,
            lfo_en: false,
            lfo_freq: 0,
            lfo_pm: 0,
            lfo_am: 0,
            lfo_cnt: 0,
            lfo_inc: 0,
            lfo_quotient: 0,
            pg_fnum: 0,
            pg_block: 0,
            pg_kcode: 0,
            pg_inc: [0; NUM_SLOTS],
            pg_phase: [0; NUM_SLOTS],
            pg_reset: [false; NUM_SLOTS],
            pg_read: 0,
            eg_cycle: 0,
            eg_cycle_stop: false,
            eg_shift: 0,
            eg_shift_lock: 0,
            eg_timer_low_lock: 0,
            eg_timer: 0,
            eg_timer_inc: 0,
            eg_quotient: 0,
            eg_custom_timer: false,
            eg_rate: 0,
            eg_ksv: 0,
            eg_inc: 0,
            eg_ratemax: false,
            eg_sl: [0; 2],
            eg_lfo_am: 0,
            eg_tl: [0; 2],
            eg_state: [EgState::Release; NUM_SLOTS],
            eg_level: [0x3ff; NUM_SLOTS],
            eg_out: [0x3ff; NUM_SLOTS],
            eg_kon: [false; NUM_SLOTS],
            eg_kon_csm: [false; NUM_SLOTS],
            eg_kon_latch: [false; NUM_SLOTS],
            eg_ssg_enable: [false; NUM_SLOTS],
            eg_ssg_pgrst_latch: [false; NUM_SLOTS],
            eg_ssg_repeat_latch: [false; NUM_SLOTS],
            eg_ssg_hold_up_latch: [false; NUM_SLOTS],
            eg_ssg_dir: [false; NUM_SLOTS],
            eg_ssg_inv: [false; NUM_SLOTS],
            eg_read: [0; 2],
            eg_read_inc: false,
            fm_op1: [[0; 2]; NUM_CHANNELS],
            fm_op2: [0; NUM_CHANNELS],
            fm_out: [0; NUM_SLOTS],
            fm_mod: [0; NUM_SLOTS],
            ch_acc: [0; NUM_CHANNELS],
            ch_out: [0; NUM_CHANNELS],
            ch_lock: 0,
            ch_lock_l: false,
            ch_lock_r: false,
            ch_read: 0,
            timer_a_cnt: 0,
            timer_a_reg: 0,
            timer_a_load_lock: false,
            timer_a_load: false,
            timer_a_enable: false,
            timer_a_reset: false,
            timer_a_load_latch: false,
            timer_a_overflow_flag: false,
            timer_a_overflow: false,
            timer_b_cnt: 0,
            timer_b_subcnt: 0,
            timer_b_reg: 0,
            timer_b_load_lock: false,
            timer_b_load: false,
            timer_b_enable: false,
            timer_b_reset: false,
            timer_b_load_latch: false,
            timer_b_overflow_flag: false,
            timer_b_overflow: false,
            mode_test_21: [false; 8],
            mode_test_2c: [false; 8],
            mode_ch3: 0,
            mode_kon_channel: 0,
            mode_kon_operator: [false; 4],
            mode_kon: [false; NUM_SLOTS],
            mode_csm: false,
            mode_kon_csm: false,
            dacen: false,
            dacdata: 0,
            ks: [0; NUM_SLOTS],
            ar: [0; NUM_SLOTS],
            sr: [0; NUM_SLOTS],
            dt: [0; NUM_SLOTS],
            multi: [1; NUM_SLOTS],
            sl: [0; NUM_SLOTS],
            rr: [0; NUM_SLOTS],
            dr: [0; NUM_SLOTS],
            am: [false; NUM_SLOTS],
            tl: [0; NUM_SLOTS],
            ssg_eg: [0; NUM_SLOTS],
            fnum: [0; NUM_CHANNELS],
            block: [0; NUM_CHANNELS],
            kcode: [0; NUM_CHANNELS],
            fnum_3ch: [0; NUM_CHANNELS],
            block_3ch: [0; NUM_CHANNELS],
            kcode_3ch: [0; NUM_CHANNELS],
            reg_a4: 0,
            reg_ac: 0,
            connect: [0; NUM_CHANNELS],
            fb: [0; NUM_CHANNELS],
            pan_l: [true; NUM_CHANNELS],
            pan_r: [true; NUM_CHANNELS],
            ams: [0; NUM_CHANNELS],
            pms: [0; NUM_CHANNELS],
            status: 0,
            status_time: 0,
            current_sample: [0; 2],
            sample_queue,
        };
        chip.reset();
        Ok(chip)
    }

    /// Resets all chip state except the configured chip type and the sample
    /// queue's allocation; matches power-on/reset behaviour.
    pub fn reset(&mut self) {
        let chip_type = self.chip_type;
        let mut queue = std::mem::replace(&mut self.sample_queue, queue::SampleQueue::empty());
        queue.clear();
        *self = Chip {
            sample_queue: queue,
            ..Self::try_new_inert(chip_type)
        };
    }

    fn try_new_inert(chip_type: ChipType) -> Self {
        // Constructs a zeroed chip without touching the sample queue; only
        // used internally by `reset`, which substitutes its own queue back
        // in afterwards.
        let mut chip = Chip {
            chip_type,
            cycles: 0,
            channel: 0,
            mol: 0,
            mor: 0,
            registers: [[0; 256]; 2],
            write_data: 0,
            write_a: 0,
            write_d: 0,
            write_a_en: false,
            write_d_en: false,
            write_busy: false,
            write_busy_cnt: 0,
            write_fm_address: false,
            write_fm_data: false,
            write_fm_mode_a: 0,
            address: 0,
            data: 0,
            pin_test_in: false,
            pin_irq: false,
            busy: false,
            lfo_en: false,
            lfo_freq: 0,
            lfo_pm: 0,
            lfo_am: 0,
            lfo_cnt: 0,
            lfo_inc: 0,
            lfo_quotient: 0,
            pg_fnum: 0,
            pg_block: 0,
            pg_kcode: 0,
            pg_inc: [0; NUM_SLOTS],
            pg_phase: [0; NUM_SLOTS],
            pg_reset: [false; NUM_SLOTS],
            pg_read: 0,
            eg_cycle: 0,
            eg_cycle_stop: false,
            eg_shift: 0,
            eg_shift_lock: 0,
            eg_timer_low_lock: 0,
            eg_timer: 0,
            eg_timer_inc: 0,
            eg_quotient: 0,
            eg_custom_timer: false,
            eg_rate: 0,
            eg_ksv: 0,
            eg_inc: 0,
            eg_ratemax: false,
            eg_sl: [0; 2],
            eg_lfo_am: 0,
            eg_tl: [0; 2],
            eg_state: [EgState::Release; NUM_SLOTS],
            eg_level: [0x3ff; NUM_SLOTS],
            eg_out: [0x3ff; NUM_SLOTS],
            eg_kon: [false; NUM_SLOTS],
            eg_kon_csm: [false; NUM_SLOTS],
            eg_kon_latch: [false; NUM_SLOTS],
            eg_ssg_enable: [false; NUM_SLOTS],
            eg_ssg_pgrst_latch: [false; NUM_SLOTS],
            eg_ssg_repeat_latch: [false; NUM_SLOTS],
            eg_ssg_hold_up_latch: [false; NUM_SLOTS],
            eg_ssg_dir: [false; NUM_SLOTS],
            eg_ssg_inv: [false; NUM_SLOTS],
            eg_read: [0; 2],
            eg_read_inc: false,
            fm_op1: [[0; 2]; NUM_CHANNELS],
            fm_op2: [0; NUM_CHANNELS],
            fm_out: [0; NUM_SLOTS],
            fm_mod: [0; NUM_SLOTS],
            ch_acc: [0; NUM_CHANNELS],
            ch_out: [0; NUM_CHANNELS],
            ch_lock: 0,
            ch_lock_l: false,
            ch_lock_r: false,
            ch_read: 0,
            timer_a_cnt: 0,
            timer_a_reg: 0,
            timer_a_load_lock: false,
            timer_a_load: false,
            timer_a_enable: false,
            timer_a_reset: false,
            timer_a_load_latch: false,
            timer_a_overflow_flag: false,
            timer_a_overflow: false,
            timer_b_cnt: 0,
            timer_b_subcnt: 0,
            timer_b_reg: 0,
            timer_b_load_lock: false,
            timer_b_load: false,
            timer_b_enable: false,
            timer_b_reset: false,
            timer_b_load_latch: false,
            timer_b_overflow_flag: false,
            timer_b_overflow: false,
            mode_test_21: [false; 8],
            mode_test_2c: [false; 8],
            mode_ch3: 0,
            mode_kon_channel: 0,
            mode_kon_operator: [false; 4],
            mode_kon: [false; NUM_SLOTS],
            mode_csm: false,
            mode_kon_csm: false,
            dacen: false,
            dacdata: 0,
            ks: [0; NUM_SLOTS],
            ar: [0; NUM_SLOTS],
            sr: [0; NUM_SLOTS],
            dt: [0; NUM_SLOTS],
            multi: [1; NUM_SLOTS],
            sl: [0; NUM_SLOTS],
            rr: [0; NUM_SLOTS],
            dr: [0; NUM_SLOTS],
            am: [false; NUM_SLOTS],
            tl: [0; NUM_SLOTS],
            ssg_eg: [0; NUM_SLOTS],
            fnum: [0; NUM_CHANNELS],
            block: [0; NUM_CHANNELS],
            kcode: [0; NUM_CHANNELS],
            fnum_3ch: [0; NUM_CHANNELS],
            block_3ch: [0; NUM_CHANNELS],
            kcode_3ch: [0; NUM_CHANNELS],
            reg_a4: 0,
            reg_ac: 0,
            connect: [0; NUM_CHANNELS],
            fb: [0; NUM_CHANNELS],
            pan_l: [true; NUM_CHANNELS],
            pan_r: [true; NUM_CHANNELS],
            ams: [0; NUM_CHANNELS],
            pms: [0; NUM_CHANNELS],
            status: 0,
            status_time: 0,
            current_sample: [0; 2],
            sample_queue: queue::SampleQueue::empty(),
        };
        chip.pg_reset = [true; NUM_SLOTS];
        chip
    }

    /// Writes a byte to one of the four host-visible ports (0-3): even ports
    /// latch an address, odd ports latch data. The write becomes visible to
    /// the register decoder on the next tick.
    pub fn write(&mut self, port: u8, value: u8) {
        io::write(self, port, value);
    }

    /// Reads the status byte (or, in test/read mode, the internal signal
    /// multiplexer) from the given port.
    pub fn read(&mut self, port: u8) -> u8 {
        io::read(self, port)
    }

    /// Advances the chip by one master tick.
    pub fn clock1(&mut self) {
        self.step();
    }

    /// Advances the chip by `n` master ticks, accumulating produced frames
    /// into the sample queue every 24 ticks.
    pub fn clock(&mut self, n: u32) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Sets the external test pin level.
    pub fn set_test_pin(&mut self, value: bool) {
        self.pin_test_in = value;
    }

    /// Reads the external test pin's derived output (only meaningful when
    /// `mode_test_2c[7]` is set by a register write).
    pub fn read_test_pin(&self) -> bool {
        if !self.mode_test_2c[7] {
            return false;
        }
        self.cycles == 23
    }

    /// Reads the IRQ pin: asserted whenever either timer has an unacknowledged
    /// overflow.
    pub fn read_irq_pin(&self) -> bool {
        self.timer_a_overflow_flag || self.timer_b_overflow_flag
    }

    /// Number of stereo frames currently queued and not yet dequeued.
    pub fn queued_count(&self) -> u32 {
        self.sample_queue.queued_count()
    }

    /// Pops the oldest queued frame, if any.
    pub fn dequeue_one(&mut self) -> Option<[i16; 2]> {
        self.sample_queue.dequeue_one()
    }

    /// Pops up to `out.len()` queued frames into `out`, returning how many
    /// were written.
    pub fn dequeue(&mut self, out: &mut [[i16; 2]]) -> usize {
        self.sample_queue.dequeue(out)
    }

    /// The master per-tick orchestration. Ports `RN_Clock1`: one call
    /// advances every sub-machine by exactly one 24th of a stereo frame.
    fn step(&mut self) {
        self.lfo_inc = self.mode_test_21[1] as u32;
        self.pg_read >>= 1;
        self.eg_read[1] >>= 1;
        self.eg_cycle += 1;

        if self.cycles == 1 && self.eg_quotient == 2 {
            self.eg_shift_lock = if self.eg_cycle_stop { 0 } else { self.eg_shift + 1 };
            self.eg_timer_low_lock = self.eg_timer & 3;
        }

        match self.cycles {
            0 => lfo::derive_am_pm(self),
            1 => {
                self.eg_quotient = (self.eg_quotient + 1) % 3;
                self.eg_cycle = 0;
                self.eg_cycle_stop = true;
                self.eg_shift = 0;
                self.eg_timer_inc |= self.eg_quotient >> 1;
                self.eg_timer += self.eg_timer_inc;
                self.eg_timer_inc = self.eg_timer >> 12;
                self.eg_timer &= 0xfff;
            }
            2 => {
                self.pg_read = self.pg_phase[21] & 0x3ff;
                self.eg_read[1] = self.eg_out[0];
            }
            13 => {
                self.eg_cycle = 0;
                self.eg_cycle_stop = true;
                self.eg_shift = 0;
                self.eg_timer += self.eg_timer_inc;
                self.eg_timer_inc = self.eg_timer >> 12;
                self.eg_timer &= 0xfff;
            }
            23 => self.lfo_inc |= 1,
            _ => {}
        }

        if self.mode_test_21[5] {
            self.eg_timer &= !(1 << self.eg_cycle);
        }
        let bit = (self.eg_timer >> self.eg_cycle) & 1;
        let custom = (self.pin_test_in && self.eg_custom_timer) as u32;
        if (bit | custom) != 0 && self.eg_cycle_stop {
            self.eg_shift = self.eg_cycle;
            self.eg_cycle_stop = false;
        }

        io::do_io(self);
        timers::do_timer_a(self);
        timers::do_timer_b(self);
        keyon::key_on(self);
        output::ch_output(self);
        fm::ch_generate(self);
        fm::fm_prepare(self);
        fm::fm_generate(self);
        phase::phase_generate(self);
        phase::phase_calc_increment(self);
        envelope::envelope_adsr(self);
        envelope::envelope_generate(self);
        envelope::envelope_ssg_eg(self);
        envelope::envelope_prepare(self);

        if self.mode_ch3 != 0 {
            self.pg_fnum = match self.cycles {
                1 => self.fnum_3ch[1],
                7 => self.fnum_3ch[0],
                13 => self.fnum_3ch[2],
                _ => self.fnum[(self.channel + 1) % NUM_CHANNELS],
            };
            self.pg_block = match self.cycles {
                1 => self.block_3ch[1],
                7 => self.block_3ch[0],
                13 => self.block_3ch[2],
                _ => self.block[(self.channel + 1) % NUM_CHANNELS],
            };
            self.pg_kcode = match self.cycles {
                1 => self.kcode_3ch[1],
                7 => self.kcode_3ch[0],
                13 => self.kcode_3ch[2],
                _ => self.kcode[(self.channel + 1) % NUM_CHANNELS],
            };
        } else {
            let next = (self.channel + 1) % NUM_CHANNELS;
            self.pg_fnum = self.fnum[next];
            self.pg_block = self.block[next];
            self.pg_kcode = self.kcode[next];
        }

        lfo::update_lfo(self);
        io::do_reg_write(self);

        self.cycles = (self.cycles + 1) % 24;
        self.channel = (self.cycles as usize) % NUM_CHANNELS;

        self.current_sample[0] += self.mol;
        self.current_sample[1] += self.mor;
        if self.cycles == 0 {
            let l = self.current_sample[0].clamp(-32768, 32767) as i16;
            let r = self.current_sample[1].clamp(-32768, 32767) as i16;
            self.sample_queue.push([l, r]);
            self.current_sample = [0; 2];
        }

        if self.status_time != 0 {
            self.status_time -= 1;
        }
    }
}
