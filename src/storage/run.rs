//! Sorted Run
//!
//! One immutable "file" of the store: versions sorted by internal key, all
//! stamped with the instant the run was created.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::clock::Timestamp;
use crate::key::InternalKey;
use crate::memtable::merge::Version;
use crate::memtable::Pair;

/// Immutable sorted collection of versions
#[derive(Debug)]
pub struct SortedRun {
    id: u64,
    created_at: Timestamp,
    entries: Vec<(InternalKey, Option<Bytes>)>,
}

impl SortedRun {
    /// Build a run from `records`, all versioned at `created_at`.
    /// A key given more than once keeps its last record.
    pub fn build(id: u64, created_at: Timestamp, records: Vec<Pair>) -> Self {
        let mut sorted = BTreeMap::new();
        for Pair { key, value } in records {
            sorted.insert(key, value);
        }

        let entries = sorted
            .into_iter()
            .map(|(key, value)| (InternalKey::encode(&key, created_at), value))
            .collect();

        Self {
            id,
            created_at,
            entries,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if no version in the run sorts at or after `pivot`
    pub(crate) fn ends_before(&self, pivot: &InternalKey) -> bool {
        self.entries.last().map_or(true, |(last, _)| last < pivot)
    }

    /// Versions from the first one at or after `pivot`
    pub(crate) fn seek<'a>(
        &'a self,
        pivot: &InternalKey,
    ) -> impl Iterator<Item = Version<'a>> + 'a {
        let start = self.entries.partition_point(|(key, _)| key < pivot);
        self.entries[start..].iter().map(|(key, value)| (key, value))
    }
}
