//! End-to-end demo: programs a 440 Hz tone on channel 1 and writes it to a
//! WAV file. Ports `examples/tone-generation/main.c` from the ReNuke
//! reference.

use ym2612_core::chip::regs;
use ym2612_core::wav_writer::WavWriter;
use ym2612_core::{Chip, ChipType, SAMPLE_RATE_NTSC};

fn write_register(chip: &mut Chip, part: u8, reg: u8, data: u8) {
    chip.write(part, reg);
    chip.clock(32);
    chip.write(part + 1, data);
    chip.clock(32);
}

fn main() -> std::io::Result<()> {
    env_logger::init();

    let sample_count = SAMPLE_RATE_NTSC * 10;
    let mut chip = Chip::new(ChipType::ym2612());

    write_register(&mut chip, 0, regs::LFO, 0x00);
    write_register(&mut chip, 0, regs::TIMERS_CH3, 0x00);
    write_register(&mut chip, 0, regs::DAC_EN, 0x00);
    write_register(&mut chip, 0, regs::KEY_ON_OFF, 0x00);

    write_register(&mut chip, 0, regs::FEEDBACK_ALGO, 0x07);
    write_register(&mut chip, 0, regs::STEREO_LFO_SENS, 0xC0);

    // OP1: near-sine, loud.
    write_register(&mut chip, 0, regs::DT_MULTI, 0x01);
    write_register(&mut chip, 0, regs::TOTAL_LEVEL, 0x00);
    write_register(&mut chip, 0, regs::KS_AR, 0x1F);
    write_register(&mut chip, 0, regs::AM_D1R, 0x00);
    write_register(&mut chip, 0, regs::D2R, 0x00);
    write_register(&mut chip, 0, regs::D1L_RR, 0x0F);

    // OP2/OP3/OP4: silence them via max total level, still sane rates.
    for offset in [0x04, 0x08, 0x0C] {
        write_register(&mut chip, 0, regs::DT_MULTI + offset, 0x01);
        write_register(&mut chip, 0, regs::TOTAL_LEVEL + offset, 0x7F);
        write_register(&mut chip, 0, regs::KS_AR + offset, 0x00);
        write_register(&mut chip, 0, regs::AM_D1R + offset, 0x00);
        write_register(&mut chip, 0, regs::D2R + offset, 0x00);
        write_register(&mut chip, 0, regs::D1L_RR + offset, 0x0F);
    }

    // Pitch A4 (440 Hz): block 4, fnum 541.
    let block: u8 = 4;
    let freq_number: u16 = 541;
    write_register(
        &mut chip,
        0,
        regs::FREQ_BLOCK_MSB,
        (block << 3) | ((freq_number >> 8) as u8),
    );
    write_register(&mut chip, 0, regs::FREQ_LSB, (freq_number & 0xFF) as u8);

    // Key on channel 1, all four operator bits.
    write_register(&mut chip, 0, regs::KEY_ON_OFF, 0xF0);

    let mut writer = WavWriter::new("output.wav", SAMPLE_RATE_NTSC, 2)?;

    let mut samples_written = 0u32;
    while samples_written < sample_count {
        while samples_written < sample_count {
            let Some(frame) = chip.dequeue_one() else { break };
            writer.write_samples(&frame)?;
            samples_written += 1;
        }
        chip.clock(24);
    }

    println!("Generated output.wav with YM2612 test tone");
    Ok(())
}
