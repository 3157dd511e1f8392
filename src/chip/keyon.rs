//! Key-on latch commit and CSM key-on pulsing. Ports `RN_KeyOn`.

use super::Chip;

pub(crate) fn key_on(chip: &mut Chip) {
    let slot = chip.cycles as usize;
    chip.eg_kon_latch[slot] = chip.mode_kon[slot];
    chip.eg_kon_csm[slot] = false;

    if chip.channel == 2 && chip.mode_kon_csm {
        chip.eg_kon_latch[slot] = true;
        chip.eg_kon_csm[slot] = true;
    }

    if chip.cycles == chip.mode_kon_channel {
        let ch = chip.channel;
        chip.mode_kon[ch] = chip.mode_kon_operator[0];
        chip.mode_kon[ch + 12] = chip.mode_kon_operator[1];
        chip.mode_kon[ch + 6] = chip.mode_kon_operator[2];
        chip.mode_kon[ch + 18] = chip.mode_kon_operator[3];
        log::debug!("channel {ch} key on/off: {:?}", chip.mode_kon_operator);
    }
}
