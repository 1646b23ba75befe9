//! Copy-ahead segment
//!
//! One time bucket of the ring: a lock-free skip list index, a value log, and
//! a dedicated worker thread that applies propagated inserts from a bounded
//! queue.
//!
//! ## Read barrier
//! Every propagated insert bumps `pending` before it is queued and the worker
//! decrements it after applying it. A scan waits for `pending == 0`, so any
//! write that was issued before the scan is visible in this segment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{bounded, select, Receiver, Sender};
use crossbeam::utils::Backoff;
use crossbeam_skiplist::SkipMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::key::InternalKey;
use crate::memtable::scan::ScanCollector;
use crate::memtable::Pair;

use super::value_log::{ValueLog, ValuePtr};

/// Longest sleep between barrier polls once spinning gives up
const MAX_BARRIER_SLEEP: Duration = Duration::from_millis(8);

/// An index insert waiting to be applied by the worker
type Update = (InternalKey, Option<ValuePtr>);

/// State shared with the worker thread
struct Shared {
    index: SkipMap<InternalKey, Option<ValuePtr>>,
    pending: AtomicUsize,
}

pub(crate) struct Segment {
    id: usize,
    shared: Arc<Shared>,
    vlog: ValueLog,
    updates: Sender<Update>,
    shutdown: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Segment {
    /// Create the segment and start its worker
    pub(crate) fn spawn(id: usize, config: &Config) -> Result<Self> {
        let (updates, queue) = bounded(config.propagation_queue_capacity);
        let (shutdown, shutdown_rx) = bounded::<()>(0);

        let shared = Arc::new(Shared {
            index: SkipMap::new(),
            pending: AtomicUsize::new(0),
        });

        let worker_state = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("ephemkv-segment-{id}"))
            .spawn(move || run_worker(worker_state, queue, shutdown_rx))?;

        Ok(Self {
            id,
            shared,
            vlog: ValueLog::new(id, config.value_log_capacity),
            updates,
            shutdown: Mutex::new(Some(shutdown)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Store a value in the log; tombstones take no space
    pub(crate) fn append_value(&self, value: Option<&Bytes>) -> Result<Option<ValuePtr>> {
        value.map(|v| self.vlog.append(v)).transpose()
    }

    /// Insert directly, after the worker has drained anything queued earlier
    pub(crate) fn insert(&self, key: InternalKey, value: Option<ValuePtr>) {
        self.wait_for_pending();
        self.shared.index.insert(key, value);
    }

    /// Queue an insert for the worker. Blocks while the queue is full.
    pub(crate) fn insert_async(&self, key: InternalKey, value: Option<ValuePtr>) {
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if self.updates.send((key, value)).is_err() {
            // Worker already stopped (segment closed); nothing will drain it.
            self.shared.pending.fetch_sub(1, Ordering::AcqRel);
            warn!(segment = self.id, "propagation dropped: segment worker stopped");
        }
    }

    /// Block until every queued insert has been applied
    pub(crate) fn wait_for_pending(&self) {
        let backoff = Backoff::new();
        let mut delay = Duration::from_micros(50);

        while self.shared.pending.load(Ordering::Acquire) > 0 {
            if backoff.is_completed() {
                thread::sleep(delay);
                delay = (delay * 2).min(MAX_BARRIER_SLEEP);
            } else {
                backoff.snooze();
            }
        }
    }

    /// Snapshot scan of this segment alone. Call after the barrier.
    pub(crate) fn scan(&self, mut collector: ScanCollector, pivot: InternalKey) -> Vec<Pair> {
        for entry in self.shared.index.range(pivot..) {
            let value = entry.value().as_ref().map(|ptr| &ptr.value);
            if collector.offer(entry.key(), value).is_break() {
                break;
            }
        }
        collector.finish()
    }

    /// Drop every entry and value; returns the number of index entries removed
    pub(crate) fn free(&self) -> usize {
        let removed = self.shared.index.len();
        self.shared.index.clear();
        self.vlog.reset();
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.index.len()
    }

    /// Stop the worker and wait for it to exit
    pub(crate) fn shutdown(&self) {
        drop(self.shutdown.lock().take());
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                warn!(segment = self.id, "segment worker panicked");
            }
        }
        // Undrained updates are discarded with the segment.
        self.shared.pending.store(0, Ordering::Release);
    }
}

fn run_worker(shared: Arc<Shared>, queue: Receiver<Update>, shutdown: Receiver<()>) {
    loop {
        select! {
            recv(queue) -> update => match update {
                Ok((key, value)) => {
                    shared.index.insert(key, value);
                    shared.pending.fetch_sub(1, Ordering::AcqRel);
                }
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }
    debug!(thread = ?thread::current().name(), "segment worker stopped");
}
