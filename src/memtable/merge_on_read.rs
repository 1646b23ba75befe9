//! Merge-on-Read Segmented Index
//!
//! Same time-bucketed ring as the copy-ahead strategy, but a write lands in
//! the active segment only. A read opens one iterator per segment covering
//! `[snapshot - ttl, snapshot]` and k-way merges them.
//!
//! Ring size is `t + 2` (t = ttl segments): `t + 1` readable segments plus
//! the next one, which `Prune` clears before it becomes active.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::clock::{self, Timestamp};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::key::InternalKey;

use super::cow::{CowIndex, VersionMap};
use super::merge::MergeIter;
use super::ring::RingClock;
use super::scan::ScanCollector;
use super::{Pair, ScanOptions, VersionedIndex};

/// Merge-on-read multi-version index
pub struct MergeOnRead {
    segments: Vec<CowIndex>,
    ring: RingClock,
    ttl_segments: usize,
    ttl: Duration,
    closed: AtomicBool,
}

impl MergeOnRead {
    pub fn new(config: &Config) -> Self {
        let ttl_segments = config.ttl_segment_count();
        let slots = ttl_segments + 2;

        Self {
            segments: (0..slots).map(|_| CowIndex::new()).collect(),
            ring: RingClock::new(config.gc_interval, slots),
            ttl_segments,
            ttl: config.ttl,
            closed: AtomicBool::new(false),
        }
    }

    /// Total segments in the ring
    pub fn slots(&self) -> usize {
        self.ring.slots()
    }

    /// Slots readable from `slot`: itself and the `t` before it
    fn window(&self, slot: usize) -> impl Iterator<Item = usize> + '_ {
        (0..=self.ttl_segments).map(move |step| self.ring.behind(slot, step))
    }
}

impl VersionedIndex for MergeOnRead {
    fn put(&self, key: &[u8], value: Option<Bytes>) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }

        let now = clock::now();
        let active = self.ring.slot_at(now);
        self.segments[active].insert(InternalKey::encode(key, now), value);
        Ok(())
    }

    fn scan(&self, start: &[u8], count: usize, opts: ScanOptions) -> Vec<Pair> {
        let Some(collector) = ScanCollector::start(count, opts, Some(self.ttl)) else {
            return Vec::new();
        };

        // Step 1: Pin a snapshot of every segment in the window
        let slot = self.ring.read_slot(opts.snapshot_ts, clock::now());
        let snapshots: Vec<VersionMap> = self
            .window(slot)
            .map(|pos| self.segments[pos].snapshot())
            .collect();

        // Step 2: Seek each to the pivot and merge
        let pivot = ScanCollector::pivot(start, opts);
        let merged = MergeIter::new(snapshots.iter().map(|map| map.range(pivot.clone()..)));

        collector.drive(merged)
    }

    fn prune(&self, _expired_ts: Timestamp) -> usize {
        let active = self.ring.slot_at(clock::now());
        let target = self.ring.behind(active, self.ttl_segments + 1);
        let removed = self.segments[target].clear();
        debug!(active, target, removed, "segment cleared");
        removed
    }

    fn len(&self) -> usize {
        let active = self.ring.slot_at(clock::now());
        self.window(active).map(|pos| self.segments[pos].len()).sum()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for segment in &self.segments {
            segment.clear();
        }
    }

    fn name(&self) -> &'static str {
        "merge_on_read"
    }
}
