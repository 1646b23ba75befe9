//! Copy-on-write versioned index
//!
//! The current version of the map is an `im::OrdMap` (a persistent B-tree
//! with structural sharing). Writers serialize on `writer`, derive a new map
//! from the published one and swap it in. Readers clone the published map in
//! O(1) and iterate their private copy, so they never observe a half-applied
//! write and never hold a lock while scanning.

use std::time::Duration;

use bytes::Bytes;
use im::OrdMap;
use parking_lot::{Mutex, RwLock};

use crate::clock::Timestamp;
use crate::key::InternalKey;

use super::scan::ScanCollector;
use super::{Pair, ScanOptions};

/// Versions keyed by internal key; `None` marks a tombstone
pub(crate) type VersionMap = OrdMap<InternalKey, Option<Bytes>>;

pub(crate) struct CowIndex {
    writer: Mutex<()>,
    state: RwLock<VersionMap>,
}

impl CowIndex {
    pub(crate) fn new() -> Self {
        Self {
            writer: Mutex::new(()),
            state: RwLock::new(OrdMap::new()),
        }
    }

    /// Point-in-time view of the index
    pub(crate) fn snapshot(&self) -> VersionMap {
        self.state.read().clone()
    }

    pub(crate) fn insert(&self, key: InternalKey, value: Option<Bytes>) {
        self.update(|map| {
            map.insert(key, value);
        });
    }

    /// Remove the given versions in one swap; returns how many were present
    pub(crate) fn remove_all(&self, keys: &[InternalKey]) -> usize {
        let mut removed = 0;
        self.update(|map| {
            removed = keys.iter().filter(|key| map.remove(*key).is_some()).count();
        });
        removed
    }

    /// Remove every version stamped at or before `expired_ts`
    pub(crate) fn remove_through(&self, expired_ts: Timestamp) -> usize {
        let mut removed = 0;
        self.update(|map| {
            let expired: Vec<InternalKey> = map
                .keys()
                .filter(|key| key.timestamp() <= expired_ts)
                .cloned()
                .collect();
            for key in &expired {
                map.remove(key);
            }
            removed = expired.len();
        });
        removed
    }

    /// Drop every entry; returns how many there were
    pub(crate) fn clear(&self) -> usize {
        let _writer = self.writer.lock();
        let old = std::mem::take(&mut *self.state.write());
        old.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.read().len()
    }

    /// Snapshot scan over this index alone
    pub(crate) fn scan(
        &self,
        start: &[u8],
        count: usize,
        opts: ScanOptions,
        ttl: Option<Duration>,
    ) -> Vec<Pair> {
        let Some(collector) = ScanCollector::start(count, opts, ttl) else {
            return Vec::new();
        };

        let snapshot = self.snapshot();
        let pivot = ScanCollector::pivot(start, opts);
        collector.drive(snapshot.range(pivot..))
    }

    fn update(&self, apply: impl FnOnce(&mut VersionMap)) {
        let _writer = self.writer.lock();
        let mut next = self.snapshot();
        apply(&mut next);
        *self.state.write() = next;
    }
}
