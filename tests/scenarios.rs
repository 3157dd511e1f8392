//! End-to-end seed scenarios from spec.md §8, driven entirely through the
//! public API. Internal-state assertions for the same scenarios (EG state
//! machine, SSG-EG latches, channel-3 routing) live in
//! `src/chip/tests_scenarios.rs`.

use ym2612_core::chip::regs;
use ym2612_core::{Chip, ChipType};

fn write_register(chip: &mut Chip, port: u8, reg: u8, data: u8) {
    chip.write(port, reg);
    chip.clock(12);
    chip.write(port + 1, data);
    chip.clock(32);
}

fn drain(chip: &mut Chip) -> Vec<[i16; 2]> {
    let mut frames = Vec::new();
    while let Some(frame) = chip.dequeue_one() {
        frames.push(frame);
    }
    frames
}

/// Scenario 1: reset -> idle. With no key-on ever issued, every operator's
/// envelope sits pinned at maximum attenuation forever, so the chip settles
/// into a constant (if not necessarily all-zero, due to the DAC sign-bit
/// bias in the YM2612 output stage) silence floor: every frame after the
/// first is identical.
#[test]
fn reset_then_idle_settles_to_constant_silence() {
    let mut chip = Chip::new(ChipType::ym2612());
    chip.reset();
    chip.clock(24 * 1000);

    let frames = drain(&mut chip);
    assert_eq!(frames.len(), 1000);
    let floor = frames[0];
    for frame in &frames {
        assert_eq!(*frame, floor, "idle output should be constant frame-to-frame");
    }
}

/// Scenario 2: a pure 440 Hz tone (algorithm 7, OP1-only carrier, TL=0,
/// AR=31, fnum=0x169 at block=4) should, after roughly half a second,
/// produce a waveform whose zero-crossing rate is close to 440 Hz. The
/// tolerance here is generous (within 10%) since exact edge counting on a
/// quantized, attenuation-shaped waveform is inherently approximate.
#[test]
fn pure_tone_frequency_matches_440hz_within_tolerance() {
    let mut chip = Chip::new(ChipType::ym2612());

    write_register(&mut chip, 0, regs::FEEDBACK_ALGO, 0x07);
    write_register(&mut chip, 0, regs::DT_MULTI, 0x01);
    write_register(&mut chip, 0, regs::TOTAL_LEVEL, 0x00);
    write_register(&mut chip, 0, regs::KS_AR, 0x1F);
    write_register(&mut chip, 0, regs::AM_D1R, 0x00);
    write_register(&mut chip, 0, regs::D2R, 0x00);
    write_register(&mut chip, 0, regs::D1L_RR, 0x0F);

    // Silence OP2/OP3/OP4 so only OP1's carrier reaches the channel output.
    for offset in [0x04u8, 0x08, 0x0C] {
        write_register(&mut chip, 0, regs::DT_MULTI + offset, 0x01);
        write_register(&mut chip, 0, regs::TOTAL_LEVEL + offset, 0x7F);
    }

    let block: u8 = 4;
    let fnum: u16 = 0x169;
    write_register(&mut chip, 0, regs::FREQ_BLOCK_MSB, (block << 3) | ((fnum >> 8) as u8));
    write_register(&mut chip, 0, regs::FREQ_LSB, (fnum & 0xFF) as u8);

    write_register(&mut chip, 0, regs::KEY_ON_OFF, 0xF0);

    // Let the attack settle, then sample half a second of steady tone.
    chip.clock(24 * 2_000);
    drain(&mut chip);

    let duration_frames = ym2612_core::SAMPLE_RATE_NTSC / 2;
    chip.clock(24 * duration_frames);
    let frames = drain(&mut chip);

    let mut crossings = 0u32;
    for pair in frames.windows(2) {
        let (prev, cur) = (pair[0][0] as i32, pair[1][0] as i32);
        if (prev >= 0) != (cur >= 0) {
            crossings += 1;
        }
    }

    let seconds = frames.len() as f64 / ym2612_core::SAMPLE_RATE_NTSC as f64;
    let estimated_hz = (crossings as f64 / 2.0) / seconds;

    assert!(
        (estimated_hz - 440.0).abs() < 44.0,
        "estimated frequency {estimated_hz} Hz should be close to 440 Hz"
    );
}

/// Scenario 3: with the DAC enabled, channel 6's output should track
/// whatever 8-bit value is written to register 0x2A.
#[test]
fn dac_passthrough_tracks_written_byte() {
    let mut chip = Chip::new(ChipType::ym2612());

    write_register(&mut chip, 0, regs::DAC_EN, 0x80);
    write_register(&mut chip, 0, regs::DAC, 0x00);
    chip.clock(24 * 4);
    let low_frames = drain(&mut chip);

    write_register(&mut chip, 0, regs::DAC, 0xFF);
    chip.clock(24 * 4);
    let high_frames = drain(&mut chip);

    let low_level = low_frames.last().unwrap()[0] as i32;
    let high_level = high_frames.last().unwrap()[0] as i32;
    assert!(
        high_level > low_level,
        "writing 0xFF to the DAC should swing the output higher than writing 0x00 \
         (low={low_level}, high={high_level})"
    );
}

/// Scenario 4: Timer A, loaded near its overflow point and enabled, should
/// raise the IRQ pin within a couple of frames.
#[test]
fn timer_a_overflow_raises_irq_pin() {
    let mut chip = Chip::new(ChipType::ym2612());

    // Timer A register is 10 bits, split across 0x24 (high 8) / 0x25 (low 2).
    let value: u16 = 0x3FE;
    write_register(&mut chip, 0, regs::TIMER_A_HI, (value >> 2) as u8);
    write_register(&mut chip, 0, regs::TIMER_A_LO, (value & 0x03) as u8);
    // Load (bit 0) + enable Timer A overflow flag (bit 2).
    write_register(&mut chip, 0, regs::TIMERS_CH3, 0x05);

    assert!(!chip.read_irq_pin());
    chip.clock(24 * 4);
    assert!(chip.read_irq_pin(), "timer A should have overflowed and raised IRQ");

    let status = chip.read(0);
    assert_ne!(status & 0x01, 0, "status byte should report timer A overflow");
}

/// Scenario 5: key-on should increase the channel's output amplitude above
/// the idle floor, and key-off should let it decay back down over time.
#[test]
fn key_on_raises_output_key_off_decays_it() {
    let mut chip = Chip::new(ChipType::ym2612());

    write_register(&mut chip, 0, regs::FEEDBACK_ALGO, 0x07);
    write_register(&mut chip, 0, regs::DT_MULTI, 0x01);
    write_register(&mut chip, 0, regs::TOTAL_LEVEL, 0x00);
    write_register(&mut chip, 0, regs::KS_AR, 0x1F);
    write_register(&mut chip, 0, regs::AM_D1R, 0x00);
    write_register(&mut chip, 0, regs::D2R, 0x00);
    write_register(&mut chip, 0, regs::D1L_RR, 0x0F);
    write_register(&mut chip, 0, regs::FREQ_BLOCK_MSB, (4 << 3) | 0x01);
    write_register(&mut chip, 0, regs::FREQ_LSB, 0x69);

    chip.clock(24 * 10);
    let idle = drain(&mut chip);
    let idle_amplitude: i32 = idle.iter().map(|f| (f[0] as i32).abs()).max().unwrap_or(0);

    write_register(&mut chip, 0, regs::KEY_ON_OFF, 0xF0);
    chip.clock(24 * 200);
    let sounding = drain(&mut chip);
    let sounding_amplitude: i32 = sounding.iter().map(|f| (f[0] as i32).abs()).max().unwrap_or(0);
    assert!(
        sounding_amplitude > idle_amplitude,
        "key-on should raise peak amplitude above the idle floor \
         (idle={idle_amplitude}, sounding={sounding_amplitude})"
    );

    write_register(&mut chip, 0, regs::KEY_ON_OFF, 0x00);
    chip.clock(24 * 3_000);
    let decayed = drain(&mut chip);
    let decayed_amplitude: i32 = decayed.iter().map(|f| (f[0] as i32).abs()).max().unwrap_or(0);
    assert!(
        decayed_amplitude < sounding_amplitude,
        "key-off should let the envelope decay back down \
         (sounding={sounding_amplitude}, decayed={decayed_amplitude})"
    );
}

/// Scenario 6: SSG-EG produces a non-monotonic, repeating envelope shape
/// rather than a single decay to silence, so the channel's peak amplitude
/// should still be substantial long after a plain ADSR envelope would have
/// decayed to the idle floor.
#[test]
fn ssg_eg_keeps_envelope_cycling_instead_of_decaying_to_silence() {
    let mut chip = Chip::new(ChipType::ym2612());

    write_register(&mut chip, 0, regs::FEEDBACK_ALGO, 0x07);
    write_register(&mut chip, 0, regs::DT_MULTI, 0x01);
    write_register(&mut chip, 0, regs::TOTAL_LEVEL, 0x00);
    write_register(&mut chip, 0, regs::KS_AR, 0x1F);
    write_register(&mut chip, 0, regs::AM_D1R, 0x0B);
    write_register(&mut chip, 0, regs::D2R, 0x00);
    write_register(&mut chip, 0, regs::D1L_RR, 0x0F);
    write_register(&mut chip, 0, regs::SSG_EG, 0x0C);
    write_register(&mut chip, 0, regs::FREQ_BLOCK_MSB, (4 << 3) | 0x01);
    write_register(&mut chip, 0, regs::FREQ_LSB, 0x69);

    write_register(&mut chip, 0, regs::KEY_ON_OFF, 0xF0);
    chip.clock(24 * 20);
    drain(&mut chip);

    let mut saw_amplitude_rise_after_fall = false;
    let mut last_peak = i32::MAX;
    for _ in 0..40 {
        chip.clock(24 * 50);
        let frames = drain(&mut chip);
        let peak = frames.iter().map(|f| (f[0] as i32).abs()).max().unwrap_or(0);
        if peak > last_peak {
            saw_amplitude_rise_after_fall = true;
            break;
        }
        last_peak = peak;
    }

    assert!(
        saw_amplitude_rise_after_fall,
        "SSG-EG should produce a repeating envelope, not a monotonic decay to silence"
    );
}
