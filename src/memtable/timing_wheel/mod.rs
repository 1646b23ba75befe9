//! Eager-Expiry Index
//!
//! One copy-on-write index plus a hierarchical timing wheel. Every put
//! schedules a timer at `ts + ttl`; a driver thread advances the wheel every
//! `timer_tick` and deletes the versions whose timers fired. Expiry is
//! therefore continuous, and the periodic `Prune` has nothing to do.
//!
//! Reads still filter by the retention window, so a version whose timer has
//! not been processed yet is never served past its TTL.

mod wheel;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use crate::clock::{self, Timestamp};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::key::InternalKey;
use crate::ticker::Ticker;

use super::cow::CowIndex;
use super::{Pair, ScanOptions, VersionedIndex};

use wheel::TimingWheel;

/// Buckets per wheel level
const WHEEL_SLOTS: usize = 256;

/// Index with per-entry expiry timers
pub struct TimedIndex {
    index: Arc<CowIndex>,
    timers: Arc<Mutex<TimingWheel<InternalKey>>>,
    driver: Ticker,
    ttl: Duration,
    closed: AtomicBool,
}

impl TimedIndex {
    /// Build the index and start its expiry driver
    pub fn new(config: &Config) -> Result<Self> {
        let index = Arc::new(CowIndex::new());
        let timers = Arc::new(Mutex::new(TimingWheel::new(
            clock::now(),
            config.timer_tick,
            WHEEL_SLOTS,
        )));

        let driver = {
            let index = Arc::clone(&index);
            let timers = Arc::clone(&timers);
            Ticker::spawn("ephemkv-timer", config.timer_tick, move || {
                expire(&index, &timers, clock::now());
            })?
        };

        Ok(Self {
            index,
            timers,
            driver,
            ttl: config.ttl,
            closed: AtomicBool::new(false),
        })
    }

    /// Timers not yet fired
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().len()
    }
}

/// Fire every timer due at `now` and drop the matching versions
fn expire(index: &CowIndex, timers: &Mutex<TimingWheel<InternalKey>>, now: Timestamp) {
    let expired = timers.lock().advance(now);
    if expired.is_empty() {
        return;
    }
    let removed = index.remove_all(&expired);
    trace!(fired = expired.len(), removed, "timers fired");
}

impl VersionedIndex for TimedIndex {
    fn put(&self, key: &[u8], value: Option<Bytes>) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }

        let now = clock::now();
        let key = InternalKey::encode(key, now);

        // Hold the wheel across the insert so a timer can never fire for a
        // version that is not in the index yet.
        let mut timers = self.timers.lock();
        self.index.insert(key.clone(), value);
        timers.schedule(now.saturating_add(clock::nanos(self.ttl)), key);
        Ok(())
    }

    fn scan(&self, start: &[u8], count: usize, opts: ScanOptions) -> Vec<Pair> {
        self.index.scan(start, count, opts, Some(self.ttl))
    }

    fn prune(&self, _expired_ts: Timestamp) -> usize {
        0
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.driver.stop();
        self.timers.lock().clear();
        self.index.clear();
    }

    fn name(&self) -> &'static str {
        "timing_wheel"
    }
}

impl Drop for TimedIndex {
    fn drop(&mut self) {
        self.close();
    }
}
