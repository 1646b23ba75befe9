//! Copy-Ahead Segment Ring
//!
//! A ring of time-bucketed segments where every write is replicated into all
//! segments that will still be readable while the write is live. A read then
//! touches exactly one segment.
//!
//! ## Layout (t = ttl segments)
//! ```text
//!   ring size = 3t + 2
//!
//!   ... │ a-t │ ... │ a-1 │  a  │ a+1 │ ... │ a+t │ a+t+1 │ ...
//!        └──── readable snapshots ───┘     └ async copies ┘   └ pruned
//!                                   ▲
//!                             active (sync)
//! ```
//!
//! - `Put` appends the value to the active segment's log, inserts the key
//!   synchronously into the active index, then queues the same pair on the
//!   next `t` segments' propagation queues.
//! - `Scan` picks the segment of the snapshot instant, waits for its pending
//!   propagations, and scans that index alone.
//! - `Prune` clears segment `a - 1 - 2t`, the slot right after the copy
//!   window, before any write propagates into it again.

mod segment;
mod value_log;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::clock::{self, Timestamp};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::key::InternalKey;

use super::ring::RingClock;
use super::scan::ScanCollector;
use super::{Pair, ScanOptions, VersionedIndex};

use segment::Segment;

/// Copy-ahead multi-version index
pub struct SegmentRing {
    segments: Vec<Segment>,
    ring: RingClock,
    ttl_segments: usize,
    ttl: Duration,
    closed: AtomicBool,
}

impl SegmentRing {
    /// Build the ring and start one worker per segment
    pub fn new(config: &Config) -> Result<Self> {
        let ttl_segments = config.ttl_segment_count();
        let slots = 3 * ttl_segments + 2;
        let ring = RingClock::new(config.gc_interval, slots);

        let mut segments = Vec::with_capacity(slots);
        for id in 0..slots {
            match Segment::spawn(id, config) {
                Ok(segment) => segments.push(segment),
                Err(e) => {
                    for segment in &segments {
                        segment.shutdown();
                    }
                    return Err(e);
                }
            }
        }

        debug!(slots, ttl_segments, "segment ring started");

        Ok(Self {
            segments,
            ring,
            ttl_segments,
            ttl: config.ttl,
            closed: AtomicBool::new(false),
        })
    }

    /// Number of segments a write is copied into (besides the active one)
    pub fn ttl_segments(&self) -> usize {
        self.ttl_segments
    }

    /// Total segments in the ring
    pub fn slots(&self) -> usize {
        self.ring.slots()
    }

    /// Index of the segment active at `ts`
    pub fn slot_at(&self, ts: Timestamp) -> usize {
        self.ring.slot_at(ts)
    }
}

impl VersionedIndex for SegmentRing {
    fn put(&self, key: &[u8], value: Option<Bytes>) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }

        // Step 1: Find the active segment
        let now = clock::now();
        let active = self.ring.slot_at(now);
        let head = &self.segments[active];

        // Step 2: Store the value; a full log rejects the whole put
        let ptr = head.append_value(value.as_ref())?;
        trace!(segment = active, offset = ?ptr.as_ref().map(|p| p.offset), "value appended");

        // Step 3: Synchronous insert (read-your-write)
        let key = InternalKey::encode(key, now);
        head.insert(key.clone(), ptr.clone());

        // Step 4: Copy ahead into every segment that stays readable
        for step in 1..=self.ttl_segments {
            let slot = self.ring.ahead(active, step);
            self.segments[slot].insert_async(key.clone(), ptr.clone());
        }

        Ok(())
    }

    fn scan(&self, start: &[u8], count: usize, opts: ScanOptions) -> Vec<Pair> {
        if self.closed.load(Ordering::Acquire) {
            return Vec::new();
        }
        let Some(collector) = ScanCollector::start(count, opts, Some(self.ttl)) else {
            return Vec::new();
        };

        let slot = self.ring.read_slot(opts.snapshot_ts, clock::now());
        let segment = &self.segments[slot];
        segment.wait_for_pending();
        segment.scan(collector, ScanCollector::pivot(start, opts))
    }

    fn prune(&self, _expired_ts: Timestamp) -> usize {
        let active = self.ring.slot_at(clock::now());
        let target = self.ring.behind(active, 1 + 2 * self.ttl_segments);
        let removed = self.segments[target].free();
        debug!(active, target, removed, "segment freed");
        removed
    }

    fn len(&self) -> usize {
        let active = self.ring.slot_at(clock::now());
        self.segments[active].len()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for segment in &self.segments {
            segment.shutdown();
            segment.free();
        }
    }

    fn name(&self) -> &'static str {
        "segment_ring"
    }
}

impl Drop for SegmentRing {
    fn drop(&mut self) {
        self.close();
    }
}
