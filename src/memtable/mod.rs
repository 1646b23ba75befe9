//! MemTable Module
//!
//! Multi-version, TTL-bounded in-memory indexes.
//!
//! ## Responsibilities
//! - Version every write with a wall-clock timestamp
//! - Serve snapshot reads: per key, the newest version not newer than the
//!   snapshot and not older than the retention window
//! - Evict expired versions cheaply (whole segments, full sweeps, or timers)
//!
//! ## Strategies
//! | Kind          | Write cost                  | Read cost                  | Eviction          |
//! |---------------|-----------------------------|----------------------------|-------------------|
//! | `SegmentRing` | 1 sync + N async inserts    | one segment                | drop a segment    |
//! | `MergeOnRead` | 1 insert                    | k-way merge of N segments  | drop a segment    |
//! | `TimingWheel` | 1 insert + 1 timer          | one index                  | per-entry timers  |
//! | `Vacuum`      | 1 insert                    | one index                  | full sweep        |
//!
//! Every strategy implements [`VersionedIndex`]; [`MemTable`] layers point
//! reads, deletes and the GC loop on top of it.

mod cow;
pub(crate) mod merge;
mod merge_on_read;
mod ring;
pub(crate) mod scan;
mod segment_ring;
mod stats;
mod table;
mod timing_wheel;
mod vacuum;

use std::sync::Arc;

use bytes::Bytes;

use crate::clock::Timestamp;
use crate::config::Config;
use crate::error::Result;

pub use merge_on_read::MergeOnRead;
pub use segment_ring::SegmentRing;
pub use table::MemTable;
pub use timing_wheel::TimedIndex;
pub use vacuum::Vacuum;

/// One row of a scan result
///
/// `value` is `None` only for tombstones, which scans emit solely when
/// [`ScanOptions::include_tombstones`] is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub key: Bytes,
    pub value: Option<Bytes>,
}

impl Pair {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// Read parameters shared by every scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Resolve versions as of this instant
    pub snapshot_ts: Timestamp,

    /// Emit resolved tombstones as value-less rows (they count toward `count`)
    pub include_tombstones: bool,
}

impl ScanOptions {
    /// Live values only, as of `snapshot_ts`
    pub fn at(snapshot_ts: Timestamp) -> Self {
        Self {
            snapshot_ts,
            include_tombstones: false,
        }
    }

    pub fn with_tombstones(mut self) -> Self {
        self.include_tombstones = true;
        self
    }
}

/// Outcome of a point read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The key's current version holds this value
    Found(Bytes),

    /// The key's current version is a tombstone
    Deleted,

    /// No version of the key is visible at the snapshot
    NotFound,
}

impl Lookup {
    /// The value, if any
    pub fn value(self) -> Option<Bytes> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::Deleted | Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Index strategy selected at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemtableKind {
    /// Copy-ahead segment ring
    SegmentRing,

    /// Time-segmented index merged on read
    MergeOnRead,

    /// Single index with per-entry expiry timers
    TimingWheel,

    /// Single index with a periodic full sweep
    Vacuum,
}

impl MemtableKind {
    /// Every strategy, in declaration order
    pub const ALL: [MemtableKind; 4] = [
        MemtableKind::SegmentRing,
        MemtableKind::MergeOnRead,
        MemtableKind::TimingWheel,
        MemtableKind::Vacuum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MemtableKind::SegmentRing => "segment_ring",
            MemtableKind::MergeOnRead => "merge_on_read",
            MemtableKind::TimingWheel => "timing_wheel",
            MemtableKind::Vacuum => "vacuum",
        }
    }
}

/// The capability every index strategy provides
///
/// Implementations own their background resources; `close` must stop them.
pub trait VersionedIndex: Send + Sync {
    /// Write a version of `key` stamped with the current time.
    /// `None` writes a tombstone.
    fn put(&self, key: &[u8], value: Option<Bytes>) -> Result<()>;

    /// Up to `count` rows starting at `start`, resolved at the snapshot
    fn scan(&self, start: &[u8], count: usize, opts: ScanOptions) -> Vec<Pair>;

    /// Evict expired versions; returns how many entries were removed
    fn prune(&self, expired_ts: Timestamp) -> usize;

    /// Approximate entry count (strategy-defined)
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop background work and release every entry
    fn close(&self);

    fn name(&self) -> &'static str;
}

/// Build the strategy named by `config.kind`
pub fn build_index(config: &Config) -> Result<Arc<dyn VersionedIndex>> {
    let index: Arc<dyn VersionedIndex> = match config.kind {
        MemtableKind::SegmentRing => Arc::new(SegmentRing::new(config)?),
        MemtableKind::MergeOnRead => Arc::new(MergeOnRead::new(config)),
        MemtableKind::TimingWheel => Arc::new(TimedIndex::new(config)?),
        MemtableKind::Vacuum => Arc::new(Vacuum::new(config)),
    };
    Ok(index)
}
