//! Snapshot scan resolution
//!
//! Every strategy (and the file store) walks versions in internal-key order
//! from a pivot and feeds them here. The collector keeps, per user key, the
//! first version inside `(expiry_bound, snapshot_ts]` and drops the rest.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::time::Duration;

use bytes::Bytes;

use crate::clock::{self, Timestamp};
use crate::key::InternalKey;

use super::{Pair, ScanOptions};

/// Accumulates the rows of one scan
pub(crate) struct ScanCollector {
    count: usize,
    snapshot_ts: Timestamp,
    expiry_bound: Option<Timestamp>,
    include_tombstones: bool,
    seen: HashSet<Bytes>,
    rows: Vec<Pair>,
}

impl ScanCollector {
    /// Start a scan, or `None` when it cannot yield anything: `count` is zero
    /// or the snapshot already fell out of the retention window.
    ///
    /// `ttl = None` disables the expiry filter.
    pub(crate) fn start(count: usize, opts: ScanOptions, ttl: Option<Duration>) -> Option<Self> {
        if count == 0 {
            return None;
        }

        let expiry_bound = ttl.map(clock::expiry_bound);
        if let Some(bound) = expiry_bound {
            if opts.snapshot_ts <= bound {
                return None;
            }
        }

        Some(Self {
            count,
            snapshot_ts: opts.snapshot_ts,
            expiry_bound,
            include_tombstones: opts.include_tombstones,
            seen: HashSet::new(),
            rows: Vec::with_capacity(count.min(1024)),
        })
    }

    /// Seek position for a scan from `start` at `opts.snapshot_ts`
    pub(crate) fn pivot(start: &[u8], opts: ScanOptions) -> InternalKey {
        InternalKey::encode(start, opts.snapshot_ts)
    }

    /// Offer the next version in traversal order
    pub(crate) fn offer(&mut self, key: &InternalKey, value: Option<&Bytes>) -> ControlFlow<()> {
        let user_key = key.user_key();
        if self.seen.contains(user_key) {
            return ControlFlow::Continue(());
        }

        // An out-of-window version leaves the key open: an older version of it
        // may still qualify further along.
        let ts = key.timestamp();
        let after_expiry = self.expiry_bound.map_or(true, |bound| ts > bound);
        if !after_expiry || ts > self.snapshot_ts {
            return ControlFlow::Continue(());
        }

        let user_key = key.user_key_bytes();
        self.seen.insert(user_key.clone());

        match value {
            Some(value) => self.rows.push(Pair {
                key: user_key,
                value: Some(value.clone()),
            }),
            None if self.include_tombstones => self.rows.push(Pair {
                key: user_key,
                value: None,
            }),
            None => {}
        }

        if self.rows.len() >= self.count {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// Feed a whole traversal and return the rows
    pub(crate) fn drive<'a, I>(mut self, versions: I) -> Vec<Pair>
    where
        I: IntoIterator<Item = (&'a InternalKey, &'a Option<Bytes>)>,
    {
        for (key, value) in versions {
            if self.offer(key, value.as_ref()).is_break() {
                break;
            }
        }
        self.finish()
    }

    pub(crate) fn finish(self) -> Vec<Pair> {
        self.rows
    }
}
