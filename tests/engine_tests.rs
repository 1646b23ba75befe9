//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Flush into the run store
//! - Reads falling back to flushed runs once the memtable expires
//! - Merged scans across memtable and runs
//! - Engine lifecycle (open/close)

mod common;

use std::time::Duration;

use common::{eventually, kv, live, pause};
use ephemkv::clock;
use ephemkv::{Config, Engine, Error, MemtableKind, ScanOptions};

// =============================================================================
// Helper Functions
// =============================================================================

/// No background flush or expiry during the test
fn engine(kind: MemtableKind) -> Engine {
    let config = Config::builder()
        .kind(kind)
        .ttl(Duration::from_secs(60))
        .gc_interval(Duration::from_secs(15))
        .flush_interval(Duration::from_secs(3600))
        .build();
    Engine::open(config).unwrap()
}

/// Memtable rows expire within a second
fn short_lived_engine(kind: MemtableKind) -> Engine {
    let config = Config::builder()
        .kind(kind)
        .ttl(Duration::from_millis(300))
        .gc_interval(Duration::from_millis(100))
        .timer_tick(Duration::from_millis(10))
        .flush_interval(Duration::from_secs(3600))
        .build();
    Engine::open(config).unwrap()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_put_get_delete() {
    for kind in MemtableKind::ALL {
        let engine = engine(kind);

        engine.put(b"k", b"v").unwrap();
        assert_eq!(engine.get(b"k", clock::now()), Some("v".into()));

        pause();
        engine.delete(b"k").unwrap();
        assert_eq!(engine.get(b"k", clock::now()), None);
        assert_eq!(engine.get(b"missing", clock::now()), None);
    }
}

#[test]
fn test_writes_are_counted_until_flush() {
    let engine = engine(MemtableKind::SegmentRing);

    engine.put(b"a", b"1").unwrap();
    engine.put(b"b", b"2").unwrap();
    engine.delete(b"a").unwrap();
    assert_eq!(engine.pending_inserts(), 3);

    engine.flush().unwrap();
    assert_eq!(engine.pending_inserts(), 0);
}

// =============================================================================
// Flush Tests
// =============================================================================

#[test]
fn test_flush_creates_run() {
    for kind in MemtableKind::ALL {
        let engine = engine(kind);
        engine.put(b"a", b"1").unwrap();
        engine.put(b"b", b"2").unwrap();

        let run = engine.flush().unwrap();

        assert!(run.is_some(), "{}", kind.name());
        assert_eq!(engine.storage().run_count(), 1, "{}", kind.name());
        assert_eq!(engine.storage().entry_count(), 2, "{}", kind.name());
    }
}

#[test]
fn test_flush_without_writes_is_noop() {
    let engine = engine(MemtableKind::Vacuum);

    assert_eq!(engine.flush().unwrap(), None);
    assert_eq!(engine.storage().run_count(), 0);
}

#[test]
fn test_background_flush() {
    let config = Config::builder()
        .kind(MemtableKind::Vacuum)
        .ttl(Duration::from_secs(60))
        .gc_interval(Duration::from_secs(15))
        .flush_interval(Duration::from_millis(50))
        .build();
    let engine = Engine::open(config).unwrap();

    engine.put(b"k", b"v").unwrap();

    assert!(eventually(Duration::from_secs(2), || engine
        .storage()
        .run_count()
        == 1));
    assert_eq!(engine.pending_inserts(), 0);
}

// =============================================================================
// Fallback Tests
// =============================================================================

#[test]
fn test_get_falls_back_to_runs_after_expiry() {
    for kind in MemtableKind::ALL {
        let engine = short_lived_engine(kind);
        engine.put(b"k", b"v").unwrap();
        engine.flush().unwrap();

        assert!(
            eventually(Duration::from_secs(2), || engine
                .memtable()
                .scan(b"k", 1, clock::now())
                .is_empty()),
            "{}",
            kind.name()
        );
        assert_eq!(engine.get(b"k", clock::now()), Some("v".into()), "{}", kind.name());
    }
}

#[test]
fn test_memtable_delete_masks_flushed_value() {
    for kind in MemtableKind::ALL {
        let engine = engine(kind);
        engine.put(b"k", b"v").unwrap();
        engine.flush().unwrap();

        pause();
        engine.delete(b"k").unwrap();

        assert_eq!(engine.get(b"k", clock::now()), None, "{}", kind.name());
        assert!(engine.scan(b"", 10, clock::now()).is_empty(), "{}", kind.name());
    }
}

#[test]
fn test_flushed_delete_outlives_memtable() {
    let engine = short_lived_engine(MemtableKind::Vacuum);
    engine.put(b"k", b"v").unwrap();
    engine.flush().unwrap();
    pause();
    engine.delete(b"k").unwrap();
    engine.flush().unwrap();

    assert!(eventually(Duration::from_secs(2), || engine.memtable().is_empty()));
    assert_eq!(engine.get(b"k", clock::now()), None);
}

#[test]
fn test_second_flush_carries_changes_past_first_keys() {
    for kind in MemtableKind::ALL {
        let engine = short_lived_engine(kind);
        for key in ["a", "b", "c", "d", "e"] {
            engine.put(key.as_bytes(), b"old").unwrap();
        }
        engine.flush().unwrap();

        pause();
        engine.delete(b"e").unwrap();
        engine.put(b"d", b"new").unwrap();
        engine.flush().unwrap();

        assert!(
            eventually(Duration::from_secs(2), || engine
                .memtable()
                .scan_with(b"", 10, ScanOptions::at(clock::now()).with_tombstones())
                .is_empty()),
            "{}",
            kind.name()
        );
        assert_eq!(engine.get(b"e", clock::now()), None, "{}", kind.name());
        assert_eq!(engine.get(b"d", clock::now()), Some("new".into()), "{}", kind.name());
        assert_eq!(engine.get(b"a", clock::now()), Some("old".into()), "{}", kind.name());
    }
}

// =============================================================================
// Scan Tests
// =============================================================================

#[test]
fn test_scan_merges_memtable_and_runs() {
    for kind in MemtableKind::ALL {
        let engine = engine(kind);
        engine.put(b"a", b"old").unwrap();
        engine.put(b"c", b"3").unwrap();
        engine.flush().unwrap();

        pause();
        engine.put(b"a", b"new").unwrap();
        engine.put(b"b", b"2").unwrap();

        assert_eq!(
            live(&engine.scan(b"", 10, clock::now())),
            vec![kv("a", "new"), kv("b", "2"), kv("c", "3")],
            "{}",
            kind.name()
        );
    }
}

#[test]
fn test_scan_fills_count_past_memtable_tombstones() {
    let engine = engine(MemtableKind::MergeOnRead);
    for key in ["a", "b", "c", "d", "e"] {
        engine.put(key.as_bytes(), b"v").unwrap();
    }
    engine.flush().unwrap();

    pause();
    engine.delete(b"a").unwrap();
    engine.delete(b"b").unwrap();

    assert_eq!(
        live(&engine.scan(b"", 2, clock::now())),
        vec![kv("c", "v"), kv("d", "v")]
    );
}

#[test]
fn test_scan_respects_count_across_sources() {
    let engine = engine(MemtableKind::SegmentRing);
    engine.put(b"b", b"run").unwrap();
    engine.put(b"d", b"run").unwrap();
    engine.flush().unwrap();
    engine.put(b"a", b"mem").unwrap();
    engine.put(b"c", b"mem").unwrap();

    assert_eq!(
        live(&engine.scan(b"", 3, clock::now())),
        vec![kv("a", "mem"), kv("b", "run"), kv("c", "mem")]
    );
    assert!(engine.scan(b"", 0, clock::now()).is_empty());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_close_is_idempotent_and_final() {
    let engine = engine(MemtableKind::SegmentRing);
    engine.put(b"k", b"v").unwrap();
    engine.flush().unwrap();

    engine.close();
    engine.close();

    assert!(matches!(engine.put(b"k", b"v"), Err(Error::Closed)));
    assert_eq!(engine.get(b"k", clock::now()), None);
    assert_eq!(engine.storage().run_count(), 0);
}
