//! Per-frame stereo accumulator and the host-facing output ring buffer.
//! Ports `RN_Clock`'s per-24-tick enqueue step, `RN_GetQueuedSamplesCount`
//! and `RN_DequeueSample`.

use std::collections::TryReserveError;

/// Ring buffer of stereo 16-bit frames. Capacity is fixed at construction
/// and must be a power of two so that index wrapping can use a bitmask
/// instead of a modulo.
///
/// `enqueue`/`dequeue` positions are monotonically increasing `u32`s (per
/// spec.md §3/§9); wraparound of the position counters themselves would take
/// far longer than any realistic session and is not handled specially.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub(crate) struct SampleQueue {
    buf: Vec<[i16; 2]>,
    mask: usize,
    enqueue_position: u32,
    dequeue_position: u32,
}

impl SampleQueue {
    pub(crate) fn try_new(capacity: usize) -> Result<Self, TryReserveError> {
        assert!(capacity.is_power_of_two(), "sample queue capacity must be a power of two");
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)?;
        buf.resize(capacity, [0i16; 2]);
        Ok(SampleQueue {
            buf,
            mask: capacity - 1,
            enqueue_position: 0,
            dequeue_position: 0,
        })
    }

    /// A queue with no backing storage; used as a placeholder while
    /// [`super::Chip::reset`] swaps the real buffer in and out.
    pub(crate) fn empty() -> Self {
        SampleQueue { buf: Vec::new(), mask: 0, enqueue_position: 0, dequeue_position: 0 }
    }

    /// Drops all queued frames without touching the backing allocation.
    pub(crate) fn clear(&mut self) {
        self.buf.iter_mut().for_each(|f| *f = [0, 0]);
        self.enqueue_position = 0;
        self.dequeue_position = 0;
    }

    /// Pushes one accumulated frame. If the buffer is full (the host hasn't
    /// dequeued fast enough) the oldest frame is silently overwritten, per
    /// the reference chip's `RN_Clock` (spec.md §3: "Overflow wraps
    /// destructively").
    pub(crate) fn push(&mut self, frame: [i16; 2]) {
        if self.buf.is_empty() {
            return;
        }
        let idx = (self.enqueue_position as usize) & self.mask;
        self.buf[idx] = frame;
        self.enqueue_position = self.enqueue_position.wrapping_add(1);
        if self.queued_count() as usize > self.buf.len() {
            self.dequeue_position = self.enqueue_position.wrapping_sub(self.buf.len() as u32);
        }
    }

    pub(crate) fn queued_count(&self) -> u32 {
        self.enqueue_position.wrapping_sub(self.dequeue_position)
    }

    pub(crate) fn dequeue_one(&mut self) -> Option<[i16; 2]> {
        if self.queued_count() == 0 {
            return None;
        }
        let idx = (self.dequeue_position as usize) & self.mask;
        let frame = self.buf[idx];
        self.dequeue_position = self.dequeue_position.wrapping_add(1);
        Some(frame)
    }

    pub(crate) fn dequeue(&mut self, out: &mut [[i16; 2]]) -> usize {
        let mut n = 0;
        for slot in out.iter_mut() {
            match self.dequeue_one() {
                Some(frame) => {
                    *slot = frame;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }
}
