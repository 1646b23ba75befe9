//! Internal key codec
//!
//! An internal key packs a user key and a version timestamp into one value
//! whose order drives every index:
//!
//! - user keys ascend lexicographically
//! - versions of the same user key descend by timestamp (newest first)
//!
//! ## Layout
//! ```text
//! ┌──────────────────────┬─────────────────────────────┐
//! │ User Key (variable)  │ u64::MAX - ts (8, big end.) │
//! └──────────────────────┴─────────────────────────────┘
//! ```
//!
//! The inverted suffix is only a storage detail. Raw byte order of the
//! encoding is NOT the key order (a user key can be a prefix of another), so
//! `Ord` decodes both parts and compares them with [`compare`].

use std::cmp::Ordering;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::clock::Timestamp;
use crate::error::{Error, Result};

/// Size of the timestamp suffix
pub const TS_SIZE: usize = 8;

/// A user key stamped with a version timestamp
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InternalKey {
    encoded: Bytes,
}

impl InternalKey {
    /// Encode `(key, ts)`
    pub fn encode(key: &[u8], ts: Timestamp) -> Self {
        let mut buf = BytesMut::with_capacity(key.len() + TS_SIZE);
        buf.put_slice(key);
        buf.put_u64(u64::MAX - ts);
        Self {
            encoded: buf.freeze(),
        }
    }

    /// Wrap an already-encoded key
    pub fn from_bytes(encoded: Bytes) -> Result<Self> {
        if encoded.len() < TS_SIZE {
            return Err(Error::InvalidKey(format!(
                "expected at least {} bytes, got {}",
                TS_SIZE,
                encoded.len()
            )));
        }
        Ok(Self { encoded })
    }

    /// The user key part
    pub fn user_key(&self) -> &[u8] {
        &self.encoded[..self.split()]
    }

    /// The user key part as a shared handle (no copy)
    pub fn user_key_bytes(&self) -> Bytes {
        self.encoded.slice(..self.split())
    }

    /// The version timestamp
    pub fn timestamp(&self) -> Timestamp {
        let mut suffix = [0u8; TS_SIZE];
        suffix.copy_from_slice(&self.encoded[self.split()..]);
        u64::MAX - u64::from_be_bytes(suffix)
    }

    /// The full encoding
    pub fn as_bytes(&self) -> &Bytes {
        &self.encoded
    }

    fn split(&self) -> usize {
        self.encoded.len() - TS_SIZE
    }
}

/// Total order over internal keys: user key ascending, then timestamp
/// descending.
pub fn compare(a: &InternalKey, b: &InternalKey) -> Ordering {
    a.user_key()
        .cmp(b.user_key())
        .then_with(|| b.timestamp().cmp(&a.timestamp()))
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self, other)
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalKey")
            .field("key", &String::from_utf8_lossy(self.user_key()))
            .field("ts", &self.timestamp())
            .finish()
    }
}
