//! # ephemkv
//!
//! An ephemeral, multi-version key-value store with:
//! - Wall-clock versioning of every write
//! - Snapshot reads at any instant inside the retention window
//! - TTL-bounded retention with pluggable eviction strategies
//! - Periodic flushes into an immutable multi-run store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Engine / CLI                            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐   flush   ┌─────────────┐
//!   │  MemTable   │ ────────▶ │   Storage   │
//!   │ (GC thread) │           │   (runs)    │
//!   └──────┬──────┘           └─────────────┘
//!          │
//!          ▼
//!   ┌──────────────────────────────────────────────┐
//!   │ VersionedIndex                               │
//!   │ SegmentRing │ MergeOnRead │ TimingWheel │ Vacuum │
//!   └──────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod error;
pub mod key;

pub mod engine;
pub mod memtable;
pub mod storage;

mod ticker;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use clock::Timestamp;
pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
pub use key::InternalKey;
pub use memtable::{Lookup, MemTable, MemtableKind, Pair, ScanOptions, VersionedIndex};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of ephemkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
