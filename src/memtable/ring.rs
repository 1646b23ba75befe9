//! Wall-clock to segment mapping shared by the segmented strategies
//!
//! Segments are fixed-width time buckets laid out on a ring that repeats
//! every `slots * segment` nanoseconds:
//!
//! ```text
//! slot(ts) = floor((ts mod cycle) / segment)
//! ```
//!
//! Every writer derives the active slot from its own clock reading; no
//! coordination is needed to rotate.

use std::time::Duration;

use crate::clock::{self, Timestamp};

#[derive(Debug, Clone, Copy)]
pub(crate) struct RingClock {
    segment_nanos: u64,
    slots: usize,
}

impl RingClock {
    pub(crate) fn new(segment: Duration, slots: usize) -> Self {
        Self {
            segment_nanos: clock::nanos(segment).max(1),
            slots: slots.max(1),
        }
    }

    pub(crate) fn slots(&self) -> usize {
        self.slots
    }

    pub(crate) fn cycle_nanos(&self) -> u64 {
        self.segment_nanos.saturating_mul(self.slots as u64)
    }

    /// Slot that is active at `ts`
    pub(crate) fn slot_at(&self, ts: Timestamp) -> usize {
        ((ts % self.cycle_nanos()) / self.segment_nanos) as usize
    }

    /// Slot serving reads at `snapshot_ts`. Future snapshots read the active
    /// slot; slots ahead of it are still being filled or hold stale data.
    pub(crate) fn read_slot(&self, snapshot_ts: Timestamp, now: Timestamp) -> usize {
        self.slot_at(snapshot_ts.min(now))
    }

    /// `steps` slots after `slot`
    pub(crate) fn ahead(&self, slot: usize, steps: usize) -> usize {
        (slot + steps % self.slots) % self.slots
    }

    /// `steps` slots before `slot`
    pub(crate) fn behind(&self, slot: usize, steps: usize) -> usize {
        (slot + self.slots - steps % self.slots) % self.slots
    }
}
