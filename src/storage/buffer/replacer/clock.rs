use parking_lot::RwLock;

use crate::common::types::FrameId;

/// Clock (second-chance) page replacement policy.
///
/// Each frame has a slot holding a presence flag and a reference bit.
/// `unpin` makes a frame an eviction candidate, `pin` withdraws it, and
/// `victim` sweeps a rotating hand over the slots: a candidate whose
/// reference bit is set gets the bit cleared and a second chance, the
/// first candidate found with a clear bit is evicted. The whole state is
/// two bits per frame, with no per-access bookkeeping.
pub struct ClockReplacer {
    inner: RwLock<Clock>,
}

struct Clock {
    slots: Vec<ClockSlot>,
    hand: usize,
    /// Number of present (candidate) slots
    size: usize,
}

#[derive(Clone, Copy, Default)]
struct ClockSlot {
    present: bool,
    referenced: bool,
}

impl ClockReplacer {
    pub fn new(num_frames: usize) -> Self {
        Self {
            inner: RwLock::new(Clock {
                slots: vec![ClockSlot::default(); num_frames],
                hand: 0,
                size: 0,
            }),
        }
    }

    /// Make `frame_id` an eviction candidate. Idempotent with respect to
    /// presence; always refreshes the reference bit.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut clock = self.inner.write();
        let idx = frame_id as usize;
        if !clock.slots[idx].present {
            clock.slots[idx].present = true;
            clock.size += 1;
        }
        clock.slots[idx].referenced = true;
    }

    /// Withdraw `frame_id` from the candidate set.
    pub fn pin(&self, frame_id: FrameId) {
        let mut clock = self.inner.write();
        let idx = frame_id as usize;
        if clock.slots[idx].present {
            clock.slots[idx].present = false;
            clock.size -= 1;
        }
        clock.slots[idx].referenced = false;
    }

    /// Sweep for a victim. Returns `None` when there are no candidates.
    ///
    /// The hand advances past every inspected slot, including the chosen
    /// victim, so consecutive calls continue the sweep instead of
    /// rescanning. A full revolution clears every reference bit, so the
    /// sweep finds a victim within two revolutions.
    pub fn victim(&self) -> Option<FrameId> {
        let mut clock = self.inner.write();
        if clock.size == 0 {
            return None;
        }
        loop {
            let hand = clock.hand;
            clock.hand = (hand + 1) % clock.slots.len();
            if clock.slots[hand].present {
                if clock.slots[hand].referenced {
                    clock.slots[hand].referenced = false;
                } else {
                    clock.slots[hand].present = false;
                    clock.size -= 1;
                    return Some(hand as FrameId);
                }
            }
        }
    }

    /// Current number of eviction candidates
    pub fn size(&self) -> usize {
        self.inner.read().size
    }
}
