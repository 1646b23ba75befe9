//! Storage Manager
//!
//! Manages the sorted runs flushed out of the memtable and serves merged
//! reads across them.
//!
//! ## Responsibilities
//! - Create a new run per flush, stamped with the flush instant
//! - Merge all runs for scans and point reads, newest version first
//! - Drop every run on destroy

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use crate::clock::{self, Timestamp};
use crate::error::{Error, Result};
use crate::memtable::merge::MergeIter;
use crate::memtable::scan::ScanCollector;
use crate::memtable::{Lookup, Pair, ScanOptions};

use super::SortedRun;

/// Manages the run store
///
/// ## Concurrency:
/// - `runs`: Protected by RwLock; readers clone the run handles and merge
///   without holding the lock
/// - `next_run_id` / `last_stamp`: Atomic counters (lock-free)
/// - All methods use `&self` (no exclusive access needed)
pub struct StorageManager {
    /// Runs, ordered newest → oldest
    runs: RwLock<Vec<Arc<SortedRun>>>,

    /// Next ID for creating new runs
    next_run_id: AtomicU64,

    /// Version stamp of the newest run; stamps strictly increase
    last_stamp: AtomicU64,

    destroyed: AtomicBool,
}

impl StorageManager {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(Vec::new()),
            next_run_id: AtomicU64::new(1),
            last_stamp: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Turn `records` into a new run; returns its ID.
    ///
    /// Every record is versioned at the creation instant, so a later run
    /// shadows earlier ones. A `None` value stores a tombstone.
    pub fn create(&self, records: Vec<Pair>) -> Result<u64> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(Error::Storage("store has been destroyed".into()));
        }

        let id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let stamp = self.next_stamp();
        let run = SortedRun::build(id, stamp, records);
        let entries = run.len();

        // Acquire write lock and insert at front (newest first)
        self.runs.write().insert(0, Arc::new(run));

        debug!(run = id, entries, "run created");
        Ok(id)
    }

    /// Up to `count` live rows from `start`, as of `snapshot_ts`
    pub fn scan(&self, start: &[u8], count: usize, snapshot_ts: Timestamp) -> Vec<Pair> {
        self.scan_with(start, count, ScanOptions::at(snapshot_ts))
    }

    /// Merged scan over every run. Runs never expire, so there is no
    /// retention filter; only the snapshot bound applies.
    pub fn scan_with(&self, start: &[u8], count: usize, opts: ScanOptions) -> Vec<Pair> {
        let Some(collector) = ScanCollector::start(count, opts, None) else {
            return Vec::new();
        };

        let pivot = ScanCollector::pivot(start, opts);
        let runs: Vec<Arc<SortedRun>> = self
            .runs
            .read()
            .iter()
            .filter(|run| !run.ends_before(&pivot))
            .cloned()
            .collect();

        let merged = MergeIter::new(runs.iter().map(|run| run.seek(&pivot)));
        collector.drive(merged)
    }

    /// Resolve `key` across every run as of `snapshot_ts`
    pub fn lookup(&self, key: &[u8], snapshot_ts: Timestamp) -> Lookup {
        let opts = ScanOptions::at(snapshot_ts).with_tombstones();
        match self.scan_with(key, 1, opts).pop() {
            Some(Pair { key: found, value }) if found.as_ref() == key => match value {
                Some(value) => Lookup::Found(value),
                None => Lookup::Deleted,
            },
            _ => Lookup::NotFound,
        }
    }

    /// The value of `key` as of `snapshot_ts`, if any
    pub fn get(&self, key: &[u8], snapshot_ts: Timestamp) -> Option<Bytes> {
        self.lookup(key, snapshot_ts).value()
    }

    /// Drop every run; later creates fail
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        let dropped = std::mem::take(&mut *self.runs.write());
        debug!(runs = dropped.len(), "store destroyed");
    }

    /// Get the number of runs
    pub fn run_count(&self) -> usize {
        self.runs.read().len()
    }

    /// Total versions across all runs
    pub fn entry_count(&self) -> usize {
        self.runs.read().iter().map(|run| run.len()).sum()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Current time, bumped past the previous stamp if the clock stalled
    fn next_stamp(&self) -> Timestamp {
        let now = clock::now();
        let prev = self
            .last_stamp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}

impl Default for StorageManager {
    fn default() -> Self {
        Self::new()
    }
}
