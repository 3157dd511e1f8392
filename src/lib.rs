//! Cycle-accurate emulation of the Yamaha YM2612 / YM3438 FM synthesis chip.
//!
//! [`Chip`] is a single opaque chip object stepped one master tick at a
//! time via [`Chip::clock`]. A tick advances one slot of a 24-slot rotating
//! operator pipeline; every 24 ticks the chip produces one stereo output
//! frame, queued for the host to retrieve with [`Chip::dequeue_one`] /
//! [`Chip::dequeue`].
//!
//! This crate covers the chip core only: register writes, status reads,
//! the IRQ/test pins, DAC behaviour and the sample queue. Host-side audio
//! transport, file-format readers and other co-resident chips are outside
//! its scope.

pub mod chip;
pub mod wav_writer;

pub use chip::{Chip, ChipType, SAMPLE_RATE_NTSC, SAMPLE_RATE_PAL};
