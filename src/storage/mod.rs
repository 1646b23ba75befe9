//! Storage Module
//!
//! Immutable multi-run store that receives memtable flushes.
//!
//! ## Responsibilities
//! - Hold flushed rows as immutable sorted runs
//! - Merged range scans and point lookups across runs
//! - Newest run wins for a key present in several runs
//!
//! ## Layout
//! ```text
//! ┌────────────────────────────────────────┐
//! │ StorageManager (newest → oldest)       │
//! │ ┌──────────┐ ┌──────────┐ ┌──────────┐ │
//! │ │ run 3    │ │ run 2    │ │ run 1    │ │
//! │ │ ts = t3  │ │ ts = t2  │ │ ts = t1  │ │
//! │ └──────────┘ └──────────┘ └──────────┘ │
//! └────────────────────────────────────────┘
//!   each run: [(user_key ++ ts, value | tombstone)] sorted
//! ```

mod manager;
mod run;

pub use manager::StorageManager;
pub use run::SortedRun;
