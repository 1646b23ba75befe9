//! Per-segment value log
//!
//! Values are copied into large arena chunks and handed back as `Bytes`
//! views into the chunk. A view keeps its chunk alive, so readers need no
//! lock and a reset never invalidates a value someone is still holding.

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Arena chunk size; larger values get a chunk of their own
const CHUNK_SIZE: usize = 64 * 1024;

/// Reference to a value stored in a segment's log
#[derive(Debug, Clone)]
pub(crate) struct ValuePtr {
    /// Byte offset of the value within the log
    pub(crate) offset: usize,
    pub(crate) value: Bytes,
}

struct LogState {
    chunk: BytesMut,
    used: usize,
}

/// Append-only, capacity-bounded value storage
pub(crate) struct ValueLog {
    segment: usize,
    capacity: usize,
    state: Mutex<LogState>,
}

impl ValueLog {
    pub(crate) fn new(segment: usize, capacity: usize) -> Self {
        Self {
            segment,
            capacity,
            state: Mutex::new(LogState {
                chunk: BytesMut::new(),
                used: 0,
            }),
        }
    }

    /// Append `value`, failing once the log would exceed its capacity
    pub(crate) fn append(&self, value: &[u8]) -> Result<ValuePtr> {
        let mut state = self.state.lock();

        if state.used + value.len() > self.capacity {
            return Err(Error::ValueLogFull {
                segment: self.segment,
                requested: value.len(),
                capacity: self.capacity,
            });
        }

        if state.chunk.capacity() - state.chunk.len() < value.len() {
            state.chunk = BytesMut::with_capacity(CHUNK_SIZE.max(value.len()));
        }
        state.chunk.extend_from_slice(value);
        let value = state.chunk.split().freeze();

        let offset = state.used;
        state.used += value.len();

        Ok(ValuePtr { offset, value })
    }

    /// Bytes appended since the last reset
    #[cfg(test)]
    pub(crate) fn used(&self) -> usize {
        self.state.lock().used
    }

    /// Forget every value
    pub(crate) fn reset(&self) {
        let mut state = self.state.lock();
        state.chunk = BytesMut::new();
        state.used = 0;
    }
}
