//! Engine Module
//!
//! The key-value engine that coordinates the memtable and the run store.
//!
//! ## Responsibilities
//! - Route writes to the memtable and count them
//! - Periodically flush recent memtable rows into a new sorted run
//! - Serve reads from the memtable first, then the run store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::clock::{self, Timestamp};
use crate::config::Config;
use crate::error::Result;
use crate::memtable::{Lookup, MemTable, Pair, ScanOptions};
use crate::storage::StorageManager;
use crate::ticker::Ticker;

/// State shared with the flush thread
struct Shared {
    /// Recent writes, TTL-bounded
    memtable: MemTable,

    /// Flushed runs
    storage: StorageManager,

    /// Writes since the last flush
    inserts: AtomicUsize,
}

impl Shared {
    fn flush(&self) -> Result<Option<u64>> {
        let pending = self.inserts.swap(0, Ordering::AcqRel);
        if pending == 0 {
            return Ok(None);
        }

        // Every key the memtable still holds, at its latest version. A count
        // of `pending` would stop at the first keys in key order and miss
        // later updates. Tombstones go along so a flushed delete keeps
        // masking older runs.
        let opts = ScanOptions::at(clock::now()).with_tombstones();
        let rows = self.memtable.scan_with(b"", usize::MAX, opts);
        if rows.is_empty() {
            return Ok(None);
        }

        let rows_flushed = rows.len();
        let id = self.storage.create(rows)?;
        debug!(run = id, rows = rows_flushed, "memtable flushed");
        Ok(Some(id))
    }
}

/// The key-value engine
///
/// ## Concurrency Model
/// - **Writes** go straight to the memtable; the strategy serializes them
/// - **Reads** never block writers: the memtable scans a snapshot and the
///   run store merges immutable runs
/// - **Flushes** run on a background thread every `flush_interval`
pub struct Engine {
    shared: Arc<Shared>,
    flusher: Ticker,
    closed: AtomicBool,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config
    /// 2. Build the memtable for `config.kind`
    /// 3. Start the flush thread
    pub fn open(config: Config) -> Result<Self> {
        // Step 1: Build the memtable (validates the config)
        if !config.flush_within_ttl() {
            warn!(
                flush_interval = ?config.flush_interval,
                ttl = ?config.ttl,
                "flush interval is not shorter than the ttl; writes may expire unflushed"
            );
        }
        let flush_interval = config.flush_interval;
        let memtable = MemTable::open(config)?;

        // Step 2: Empty run store
        let shared = Arc::new(Shared {
            memtable,
            storage: StorageManager::new(),
            inserts: AtomicUsize::new(0),
        });

        // Step 3: Flush thread
        let flusher = {
            let shared = Arc::clone(&shared);
            Ticker::spawn("ephemkv-flush", flush_interval, move || {
                if let Err(e) = shared.flush() {
                    warn!(error = %e, "background flush failed");
                }
            })?
        };

        debug!(index = shared.memtable.name(), "engine opened");
        Ok(Self {
            shared,
            flusher,
            closed: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.shared.memtable.put(key, value)?;
        self.shared.inserts.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.shared.memtable.delete(key)?;
        self.shared.inserts.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Copy the memtable's live rows and tombstones into a new run now.
    /// Returns the run ID, or `None` if there was nothing to flush.
    pub fn flush(&self) -> Result<Option<u64>> {
        self.shared.flush()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Value of `key` as of `snapshot_ts`
    pub fn get(&self, key: &[u8], snapshot_ts: Timestamp) -> Option<Bytes> {
        match self.shared.memtable.get(key, snapshot_ts) {
            Lookup::Found(value) => Some(value),
            Lookup::Deleted => None,
            Lookup::NotFound => self.shared.storage.get(key, snapshot_ts),
        }
    }

    /// Up to `count` live rows from `start` as of `snapshot_ts`, merged
    /// across the memtable and the run store. The memtable wins per key.
    pub fn scan(&self, start: &[u8], count: usize, snapshot_ts: Timestamp) -> Vec<Pair> {
        let mut rows = Vec::new();
        let mut cursor = start.to_vec();

        while rows.len() < count {
            let need = count - rows.len();
            let memory = self.shared.memtable.scan_with(
                &cursor,
                need,
                ScanOptions::at(snapshot_ts).with_tombstones(),
            );
            let stored = self.shared.storage.scan(&cursor, need, snapshot_ts);

            // A full page may have more rows past its last key, so only the
            // range both sides have covered is exact.
            let bound = [&memory, &stored]
                .into_iter()
                .filter(|page| page.len() == need)
                .filter_map(|page| page.last().map(|pair| pair.key.clone()))
                .min();

            let mut merged = BTreeMap::new();
            for pair in stored.into_iter().chain(memory) {
                if bound.as_ref().map_or(true, |bound| pair.key <= *bound) {
                    merged.insert(pair.key, pair.value);
                }
            }

            rows.extend(
                merged
                    .into_iter()
                    .filter_map(|(key, value)| value.map(|value| Pair { key, value: Some(value) }))
                    .take(need),
            );

            match bound {
                Some(bound) => {
                    cursor = bound.to_vec();
                    cursor.push(0);
                }
                None => break,
            }
        }

        rows
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Memtable entry count (strategy-defined)
    pub fn len(&self) -> usize {
        self.shared.memtable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.memtable.is_empty()
    }

    /// Name of the memtable strategy
    pub fn name(&self) -> &'static str {
        self.shared.memtable.name()
    }

    /// Evict memtable versions at or before `expired_ts`
    pub fn prune(&self, expired_ts: Timestamp) -> usize {
        self.shared.memtable.prune(expired_ts)
    }

    pub fn memtable(&self) -> &MemTable {
        &self.shared.memtable
    }

    pub fn storage(&self) -> &StorageManager {
        &self.shared.storage
    }

    /// Writes not yet flushed
    pub fn pending_inserts(&self) -> usize {
        self.shared.inserts.load(Ordering::Acquire)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop flushing, close the memtable and drop every run.
    /// Later calls do nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.flusher.stop();
        self.shared.memtable.close();
        self.shared.storage.destroy();
        debug!("engine closed");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.close();
    }
}
