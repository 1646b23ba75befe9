//! MemTable driver
//!
//! Wraps one [`VersionedIndex`] strategy with the operations every strategy
//! shares: point reads, deletes, and the periodic GC loop that evicts
//! expired versions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::clock::{self, Timestamp};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ticker::Ticker;

use super::stats::MovingAverage;
use super::{build_index, Lookup, Pair, ScanOptions, VersionedIndex};

/// State shared with the GC thread
struct Inner {
    index: Arc<dyn VersionedIndex>,
    ttl: Duration,
    log_stats: bool,
    prune_times: Mutex<MovingAverage>,
    closed: AtomicBool,
}

impl Inner {
    fn prune(&self, expired_ts: Timestamp) -> usize {
        let started = Instant::now();
        let deleted = self.index.prune(expired_ts);
        let elapsed = started.elapsed();

        let avg = {
            let mut times = self.prune_times.lock();
            times.add(elapsed);
            times.average()
        };

        if self.log_stats {
            info!(
                index = self.index.name(),
                deleted,
                elapsed_us = elapsed.as_micros() as u64,
                avg_us = avg.as_micros() as u64,
                "prune"
            );
        }
        deleted
    }
}

/// Multi-version, TTL-bounded in-memory table
pub struct MemTable {
    inner: Arc<Inner>,
    gc: Ticker,
}

impl MemTable {
    /// Build the strategy named by `config.kind` and start its GC loop
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let index = build_index(&config)?;
        Self::with_index(index, &config)
    }

    /// Drive an already-built index
    pub fn with_index(index: Arc<dyn VersionedIndex>, config: &Config) -> Result<Self> {
        let inner = Arc::new(Inner {
            index,
            ttl: config.ttl,
            log_stats: config.log_stats,
            prune_times: Mutex::new(MovingAverage::new(config.stats_window())),
            closed: AtomicBool::new(false),
        });

        let gc = {
            let inner = Arc::clone(&inner);
            let name = format!("ephemkv-gc-{}", inner.index.name());
            Ticker::spawn(name, config.gc_interval, move || {
                inner.prune(clock::expiry_bound(inner.ttl));
            })
        };
        let gc = match gc {
            Ok(gc) => gc,
            Err(e) => {
                inner.index.close();
                return Err(e);
            }
        };

        debug!(index = inner.index.name(), ttl = ?config.ttl, gc_interval = ?config.gc_interval, "memtable opened");
        Ok(Self { inner, gc })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Write `value` for `key`, stamped with the current time
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(key, Some(Bytes::copy_from_slice(value)))
    }

    /// Write a tombstone for `key`
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write(key, None)
    }

    fn write(&self, key: &[u8], value: Option<Bytes>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.inner.index.put(key, value)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Up to `count` live rows from `start`, as of `snapshot_ts`
    pub fn scan(&self, start: &[u8], count: usize, snapshot_ts: Timestamp) -> Vec<Pair> {
        self.scan_with(start, count, ScanOptions::at(snapshot_ts))
    }

    pub fn scan_with(&self, start: &[u8], count: usize, opts: ScanOptions) -> Vec<Pair> {
        if self.is_closed() {
            return Vec::new();
        }
        self.inner.index.scan(start, count, opts)
    }

    /// Resolve `key` as of `snapshot_ts`
    pub fn get(&self, key: &[u8], snapshot_ts: Timestamp) -> Lookup {
        let opts = ScanOptions::at(snapshot_ts).with_tombstones();
        match self.scan_with(key, 1, opts).pop() {
            Some(Pair { key: found, value }) if found.as_ref() == key => match value {
                Some(value) => Lookup::Found(value),
                None => Lookup::Deleted,
            },
            _ => Lookup::NotFound,
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Evict versions at or before `expired_ts`; returns the entries removed
    pub fn prune(&self, expired_ts: Timestamp) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.inner.prune(expired_ts)
    }

    pub fn len(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.inner.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the backing strategy
    pub fn name(&self) -> &'static str {
        self.inner.index.name()
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Mean prune duration over the last TTL worth of GC ticks
    pub fn average_prune_time(&self) -> Duration {
        self.inner.prune_times.lock().average()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Stop the GC loop and release every entry. Later calls do nothing.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.gc.stop();
        self.inner.index.close();
        debug!(index = self.inner.index.name(), "memtable closed");
    }
}

impl Drop for MemTable {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTable")
            .field("index", &self.inner.index.name())
            .field("ttl", &self.inner.ttl)
            .field("closed", &self.is_closed())
            .finish()
    }
}
