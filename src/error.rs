//! Error types for ephemkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ephemkv's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for ephemkv operations
#[derive(Debug, Error)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Capacity Errors
    // -------------------------------------------------------------------------
    #[error("value log full: segment {segment} cannot hold {requested} more bytes (capacity {capacity})")]
    ValueLogFull {
        segment: usize,
        requested: usize,
        capacity: usize,
    },

    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("memtable is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Key Encoding Errors
    // -------------------------------------------------------------------------
    #[error("invalid internal key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Thread Errors
    // -------------------------------------------------------------------------
    #[error("failed to spawn background thread: {0}")]
    Spawn(#[from] std::io::Error),
}
