//! Snapshot scan tests, run against every memtable strategy
//!
//! These tests verify:
//! - Scans return at most one row per key, in key order
//! - Snapshot reads see the version current at the snapshot instant
//! - Tombstones hide keys (and show up only on request)
//! - Expired and future snapshots, zero counts, and start keys

mod common;

use std::time::Duration;

use common::{kv, live, open, pause, put_at, rows};
use ephemkv::clock;
use ephemkv::{Lookup, MemtableKind, ScanOptions};

// =============================================================================
// Basic Scans
// =============================================================================

#[test]
fn test_scan_distinct_keys() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        for (key, value) in [("1", "a"), ("2", "b"), ("3", "c"), ("4", "d")] {
            put_at(&table, key, value);
        }

        let now = clock::now();
        assert_eq!(live(&table.scan(b"1", 1, now)), vec![kv("1", "a")], "{}", kind.name());
        assert_eq!(
            live(&table.scan(b"1", 4, now)),
            vec![kv("1", "a"), kv("2", "b"), kv("3", "c"), kv("4", "d")],
            "{}",
            kind.name()
        );
    }
}

#[test]
fn test_scan_from_middle_key() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        for (key, value) in [("a", "1"), ("c", "3"), ("e", "5")] {
            put_at(&table, key, value);
        }

        let now = clock::now();
        assert_eq!(
            live(&table.scan(b"b", 10, now)),
            vec![kv("c", "3"), kv("e", "5")],
            "{}",
            kind.name()
        );
        assert!(table.scan(b"f", 10, now).is_empty(), "{}", kind.name());
    }
}

#[test]
fn test_scan_returns_newest_version_once() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "k", "v1");
        put_at(&table, "k", "v2");
        put_at(&table, "k", "v3");
        put_at(&table, "z", "last");

        assert_eq!(
            live(&table.scan(b"k", 5, clock::now())),
            vec![kv("k", "v3"), kv("z", "last")],
            "{}",
            kind.name()
        );
    }
}

#[test]
fn test_zero_count_returns_nothing() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "k", "v");

        assert!(table.scan(b"k", 0, clock::now()).is_empty(), "{}", kind.name());
    }
}

#[test]
fn test_keys_in_order_regardless_of_write_order() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        for key in ["d", "b", "a", "c"] {
            table.put(key.as_bytes(), b"x").unwrap();
        }
        pause();

        let keys: Vec<String> = live(&table.scan(b"", 10, clock::now()))
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"], "{}", kind.name());
    }
}

// =============================================================================
// Snapshot Reads
// =============================================================================

#[test]
fn test_snapshot_sees_version_current_at_that_instant() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        let before = clock::now();
        pause();
        let t1 = put_at(&table, "1", "v1");
        let t2 = put_at(&table, "1", "v2");
        let t3 = put_at(&table, "1", "v3");
        let t4 = put_at(&table, "1", "v4");

        assert!(table.scan(b"1", 1, before).is_empty(), "{}", kind.name());
        for (snapshot, expected) in [(t1, "v1"), (t2, "v2"), (t3, "v3"), (t4, "v4")] {
            assert_eq!(
                live(&table.scan(b"1", 1, snapshot)),
                vec![kv("1", expected)],
                "{}",
                kind.name()
            );
        }
    }
}

#[test]
fn test_snapshot_ignores_later_writes() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "a", "old");
        let snapshot = clock::now();
        pause();
        table.put(b"a", b"new").unwrap();
        table.put(b"b", b"added").unwrap();

        assert_eq!(
            live(&table.scan(b"", 10, snapshot)),
            vec![kv("a", "old")],
            "{}",
            kind.name()
        );
    }
}

#[test]
fn test_future_snapshot_reads_latest() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "k", "v1");
        put_at(&table, "k", "v2");

        let future = clock::now() + Duration::from_secs(3600).as_nanos() as u64;
        assert_eq!(
            live(&table.scan(b"k", 1, future)),
            vec![kv("k", "v2")],
            "{}",
            kind.name()
        );
    }
}

#[test]
fn test_expired_snapshot_returns_nothing() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "k", "v");

        let expired = clock::ago(table.ttl() + Duration::from_secs(1));
        assert!(table.scan(b"k", 1, expired).is_empty(), "{}", kind.name());
    }
}

// =============================================================================
// Tombstones
// =============================================================================

#[test]
fn test_delete_hides_key() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "1", "a");
        put_at(&table, "2", "b");
        put_at(&table, "3", "c");
        table.delete(b"1").unwrap();
        pause();

        let now = clock::now();
        assert_eq!(
            live(&table.scan(b"1", 3, now)),
            vec![kv("2", "b"), kv("3", "c")],
            "{}",
            kind.name()
        );
        assert_eq!(table.get(b"1", now), Lookup::Deleted, "{}", kind.name());
    }
}

#[test]
fn test_delete_does_not_rewrite_history() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        let written = put_at(&table, "k", "v");
        table.delete(b"k").unwrap();
        pause();

        assert_eq!(
            table.get(b"k", written),
            Lookup::Found("v".into()),
            "{}",
            kind.name()
        );
        assert_eq!(table.get(b"k", clock::now()), Lookup::Deleted, "{}", kind.name());
    }
}

#[test]
fn test_put_after_delete_revives_key() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "k", "v1");
        table.delete(b"k").unwrap();
        pause();
        put_at(&table, "k", "v2");

        assert_eq!(
            table.get(b"k", clock::now()),
            Lookup::Found("v2".into()),
            "{}",
            kind.name()
        );
    }
}

#[test]
fn test_include_tombstones_emits_deleted_rows() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "a", "1");
        put_at(&table, "b", "2");
        table.delete(b"a").unwrap();
        pause();

        let opts = ScanOptions::at(clock::now()).with_tombstones();
        assert_eq!(
            rows(&table.scan_with(b"", 10, opts)),
            vec![
                ("a".to_string(), None),
                ("b".to_string(), Some("2".to_string()))
            ],
            "{}",
            kind.name()
        );

        // Tombstone rows use up the count
        assert_eq!(table.scan_with(b"", 1, opts).len(), 1, "{}", kind.name());
        assert!(table.scan_with(b"", 1, opts)[0].is_tombstone(), "{}", kind.name());
    }
}

// =============================================================================
// Point Reads
// =============================================================================

#[test]
fn test_get_distinguishes_missing_from_deleted() {
    for kind in MemtableKind::ALL {
        let table = open(kind);
        put_at(&table, "present", "v");
        put_at(&table, "gone", "v");
        table.delete(b"gone").unwrap();
        pause();

        let now = clock::now();
        assert_eq!(table.get(b"present", now), Lookup::Found("v".into()), "{}", kind.name());
        assert_eq!(table.get(b"gone", now), Lookup::Deleted, "{}", kind.name());
        assert_eq!(table.get(b"absent", now), Lookup::NotFound, "{}", kind.name());
        assert_eq!(table.get(b"pres", now), Lookup::NotFound, "{}", kind.name());
    }
}
