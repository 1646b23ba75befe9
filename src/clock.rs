//! Wall-clock timestamps
//!
//! Every version is stamped with nanoseconds since the Unix epoch. Snapshot
//! reads take the same unit.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch
pub type Timestamp = u64;

/// Current wall-clock time
pub fn now() -> Timestamp {
    from_system_time(SystemTime::now())
}

/// Convert a `SystemTime`; instants before the epoch clamp to zero
pub fn from_system_time(time: SystemTime) -> Timestamp {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as Timestamp)
        .unwrap_or_default()
}

/// The instant `ago` before now
pub fn ago(ago: Duration) -> Timestamp {
    now().saturating_sub(nanos(ago))
}

/// Versions at or before this instant have outlived `ttl`
pub fn expiry_bound(ttl: Duration) -> Timestamp {
    ago(ttl)
}

/// True if `ts` is still inside the retention window
pub fn is_live(ts: Timestamp, ttl: Duration) -> bool {
    ts > expiry_bound(ttl)
}

/// Duration as whole nanoseconds, saturating at `u64::MAX`
pub fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
