//! # Storage Error Types
//!
//! Error types for durable storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error / serde_json::Error                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StorageError (this module) ← Adds the entry name                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StateStore ← Logs it, marks the key degraded, carries on              │
//! │                                                                         │
//! │  Page modules never see a StorageError.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Durable storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    ///
    /// ## When This Occurs
    /// - Storage directory removed or read-only
    /// - Disk full
    #[error("I/O failure on '{name}': {reason}")]
    Io { name: String, reason: String },

    /// A stored entry is not valid JSON.
    #[error("Entry '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    /// Writing the entry would exceed the configured quota.
    #[error("Writing '{name}' needs {needed} bytes, quota is {quota}")]
    QuotaExceeded {
        name: String,
        needed: usize,
        quota: usize,
    },

    /// A value could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The entry name cannot be used by this backend.
    #[error("Invalid entry name: {0}")]
    InvalidName(String),
}

impl StorageError {
    /// Creates an Io error for a given entry.
    pub fn io(name: impl Into<String>, err: std::io::Error) -> Self {
        StorageError::Io {
            name: name.into(),
            reason: err.to_string(),
        }
    }

    /// Creates a Corrupt error for a given entry.
    pub fn corrupt(name: impl Into<String>, reason: impl ToString) -> Self {
        StorageError::Corrupt {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
