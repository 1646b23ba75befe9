//! Configuration for ephemkv
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::memtable::MemtableKind;

/// Main configuration for a memtable or engine instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Retention Configuration
    // -------------------------------------------------------------------------
    /// How long a written version stays readable
    pub ttl: Duration,

    /// Period of the pruning loop. Segmented strategies also use it as the
    /// width of one time segment.
    pub gc_interval: Duration,

    /// Log deleted counts and prune timings after every GC tick
    pub log_stats: bool,

    // -------------------------------------------------------------------------
    // Strategy Configuration
    // -------------------------------------------------------------------------
    /// Which index strategy backs the memtable
    pub kind: MemtableKind,

    /// Bytes each copy-ahead segment's value log may hold before puts fail
    pub value_log_capacity: usize,

    /// Bound of each copy-ahead segment's propagation queue. Writers block
    /// while a target queue is full.
    pub propagation_queue_capacity: usize,

    /// Resolution of the timing wheel used by the eager-expiry strategy
    pub timer_tick: Duration,

    // -------------------------------------------------------------------------
    // Engine Configuration
    // -------------------------------------------------------------------------
    /// How often the engine moves memtable rows into the file store
    pub flush_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            gc_interval: Duration::from_secs(10),
            log_stats: false,
            kind: MemtableKind::SegmentRing,
            value_log_capacity: 256 * 1024 * 1024, // 256 MB
            propagation_queue_capacity: 1 << 16,
            timer_tick: Duration::from_millis(100),
            flush_interval: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that every duration and capacity is usable
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(Error::Config("ttl must be greater than zero".into()));
        }
        if self.gc_interval.is_zero() {
            return Err(Error::Config("gc_interval must be greater than zero".into()));
        }
        if self.timer_tick.is_zero() {
            return Err(Error::Config("timer_tick must be greater than zero".into()));
        }
        if self.flush_interval.is_zero() {
            return Err(Error::Config("flush_interval must be greater than zero".into()));
        }
        if self.value_log_capacity == 0 {
            return Err(Error::Config("value_log_capacity must be greater than zero".into()));
        }
        if self.propagation_queue_capacity == 0 {
            return Err(Error::Config(
                "propagation_queue_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Number of segments needed to cover one TTL window
    pub fn ttl_segment_count(&self) -> usize {
        let ttl = self.ttl.as_nanos();
        let segment = self.gc_interval.as_nanos().max(1);
        (ttl.div_ceil(segment) as usize).max(1)
    }

    /// Number of GC samples that span one TTL window
    pub(crate) fn stats_window(&self) -> usize {
        let samples = self.ttl.as_nanos() / self.gc_interval.as_nanos().max(1);
        (samples as usize).max(1)
    }

    /// Whether a background flush runs before a write can expire from the
    /// memtable. An engine opened without this loses writes between flushes.
    pub fn flush_within_ttl(&self) -> bool {
        self.flush_interval < self.ttl
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the time-to-live of every written version
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Set the GC interval (also the segment width)
    pub fn gc_interval(mut self, interval: Duration) -> Self {
        self.config.gc_interval = interval;
        self
    }

    /// Enable or disable GC statistics logging
    pub fn log_stats(mut self, enabled: bool) -> Self {
        self.config.log_stats = enabled;
        self
    }

    /// Set the index strategy
    pub fn kind(mut self, kind: MemtableKind) -> Self {
        self.config.kind = kind;
        self
    }

    /// Set the per-segment value log capacity (in bytes)
    pub fn value_log_capacity(mut self, bytes: usize) -> Self {
        self.config.value_log_capacity = bytes;
        self
    }

    /// Set the per-segment propagation queue bound
    pub fn propagation_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.propagation_queue_capacity = capacity;
        self
    }

    /// Set the timing wheel resolution
    pub fn timer_tick(mut self, tick: Duration) -> Self {
        self.config.timer_tick = tick;
        self
    }

    /// Set the engine flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval = interval;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
