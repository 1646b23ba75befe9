//! Vacuum Index
//!
//! A single copy-on-write index. Expired versions stay in place until the
//! periodic `Prune` sweeps the whole map and drops every version stamped at
//! or before the expiry bound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;

use crate::clock::{self, Timestamp};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::key::InternalKey;

use super::cow::CowIndex;
use super::{Pair, ScanOptions, VersionedIndex};

/// Sweep-on-prune multi-version index
pub struct Vacuum {
    index: CowIndex,
    ttl: Duration,
    closed: AtomicBool,
}

impl Vacuum {
    pub fn new(config: &Config) -> Self {
        Self {
            index: CowIndex::new(),
            ttl: config.ttl,
            closed: AtomicBool::new(false),
        }
    }
}

impl VersionedIndex for Vacuum {
    fn put(&self, key: &[u8], value: Option<Bytes>) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.index.insert(InternalKey::encode(key, clock::now()), value);
        Ok(())
    }

    fn scan(&self, start: &[u8], count: usize, opts: ScanOptions) -> Vec<Pair> {
        self.index.scan(start, count, opts, Some(self.ttl))
    }

    fn prune(&self, expired_ts: Timestamp) -> usize {
        self.index.remove_through(expired_ts)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.index.clear();
    }

    fn name(&self) -> &'static str {
        "vacuum"
    }
}
