//! Shared test helpers
#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use ephemkv::clock::{self, Timestamp};
use ephemkv::{Config, MemTable, MemtableKind, Pair};

/// Gap between writes that must get distinct, ordered timestamps
pub const STEP: Duration = Duration::from_millis(20);

/// Long retention: nothing expires and no GC pass runs during a test
pub fn config(kind: MemtableKind) -> Config {
    Config::builder()
        .kind(kind)
        .ttl(Duration::from_secs(60))
        .gc_interval(Duration::from_secs(15))
        .build()
}

/// Short retention for expiry tests
pub fn short_config(kind: MemtableKind) -> Config {
    Config::builder()
        .kind(kind)
        .ttl(Duration::from_millis(300))
        .gc_interval(Duration::from_millis(100))
        .timer_tick(Duration::from_millis(10))
        .build()
}

pub fn open(kind: MemtableKind) -> MemTable {
    MemTable::open(config(kind)).unwrap()
}

pub fn pause() {
    thread::sleep(STEP);
}

/// Put and return the instant right after the write
pub fn put_at(table: &MemTable, key: &str, value: &str) -> Timestamp {
    table.put(key.as_bytes(), value.as_bytes()).unwrap();
    let ts = clock::now();
    pause();
    ts
}

/// Rows as `(key, value)` strings; tombstones show as `None`
pub fn rows(pairs: &[Pair]) -> Vec<(String, Option<String>)> {
    pairs
        .iter()
        .map(|pair| {
            (
                String::from_utf8_lossy(&pair.key).into_owned(),
                pair.value
                    .as_ref()
                    .map(|v| String::from_utf8_lossy(v).into_owned()),
            )
        })
        .collect()
}

/// Live rows as `(key, value)` string pairs
pub fn live(pairs: &[Pair]) -> Vec<(String, String)> {
    rows(pairs)
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect()
}

pub fn kv(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Poll `check` until it holds or `timeout` passes
pub fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if std::time::Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
}
