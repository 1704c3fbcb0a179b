//! Error types for Scenedex core operations.
//!
//! This module defines well-structured error types using `thiserror` for
//! library-level errors, while collaborator traits and the CLI use `anyhow`
//! for convenient error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ScenedexError
pub type Result<T> = std::result::Result<T, ScenedexError>;

/// Core error types for Scenedex operations.
///
/// The variants fall into three groups that callers treat differently:
/// contention (skip the operation), operation-level failures (abort the
/// operation) and per-record failures (log, count, continue the batch).
#[derive(Error, Debug)]
pub enum ScenedexError {
    // === Coordination Errors ===
    /// Another operation holds the named lock
    #[error("lock '{name}' is held by another operation")]
    LockContention { name: String },

    // === Index Errors ===
    /// The index storage could not be created or opened
    #[error("cannot open index at {path}: {reason}")]
    StorageOpen { path: PathBuf, reason: String },

    /// The index schema is missing a field this version expects
    #[error("index schema mismatch: {reason}")]
    Schema { reason: String },

    /// Writing a single document failed
    #[error("failed to index scene {id}: {reason}")]
    DocumentWrite { id: String, reason: String },

    /// Deleting a single document failed
    #[error("failed to remove scene {id} from index: {reason}")]
    DocumentDelete { id: String, reason: String },

    // === Search Errors ===
    /// The query could not be parsed or executed
    #[error("query failed: {query}: {reason}")]
    Query { query: String, reason: String },

    // === Record Store Errors ===
    /// The record store failed to answer
    #[error("record store error: {operation} failed: {reason}")]
    Store { operation: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file parsing or validation failed
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    // === I/O Errors ===
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Engine Errors ===
    /// Error raised by the search engine outside a more specific context
    #[error("search engine error: {0}")]
    Engine(#[from] tantivy::TantivyError),

    // === Internal Errors ===
    /// Internal error that should not happen
    #[error("internal error: {0}")]
    Internal(String),
}

impl ScenedexError {
    /// Returns true if the operation was skipped because another one is running
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, ScenedexError::LockContention { .. })
    }

    /// Returns true if this error concerns a single record and a batch may continue
    pub fn is_per_record(&self) -> bool {
        matches!(
            self,
            ScenedexError::DocumentWrite { .. } | ScenedexError::DocumentDelete { .. }
        )
    }

    /// Returns true if this error ends the whole operation
    pub fn aborts_operation(&self) -> bool {
        !self.is_lock_contention() && !self.is_per_record()
    }

    /// Create a storage open error
    pub fn storage_open(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ScenedexError::StorageOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a record store error
    pub fn store(operation: impl Into<String>, reason: impl ToString) -> Self {
        ScenedexError::Store {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}
