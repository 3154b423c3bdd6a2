//! Core error types for healthpass-core.
//!
//! This module defines the error hierarchy using thiserror. Failures are
//! local to one reminder's evaluation or one store operation; the scheduler
//! never aborts a whole tick because a single reminder failed.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::reminder::RepeatRule;

/// Core error type for healthpass-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistence-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// Recurrence computation errors
    #[error("Recurrence error: {0}")]
    Recurrence(#[from] RecurrenceError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Persistence errors. The backing store is an external collaborator; a
/// failed read or write is reported to the caller and the in-memory state is
/// not considered authoritative until the write is acknowledged.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store temporarily unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// Payload (de)serialization failed
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// IO errors while locating or creating the data directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Notification delivery errors. These are reported, never silently
/// dropped: the scheduler keeps the reminder due and retries on every tick.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Notification permission not granted by the user
    #[error("Notification permission not granted")]
    PermissionDenied,

    /// Delivery channel unreachable
    #[error("Delivery channel unavailable: {0}")]
    ChannelUnavailable(String),
}

/// Recurrence computation errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceError {
    /// The anchor cannot be advanced by the rule without leaving the
    /// representable date range.
    #[error("Cannot compute a forward occurrence of {rule:?} from {anchor}")]
    Unrepresentable {
        anchor: DateTime<Utc>,
        rule: RepeatRule,
    },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A goal range with a lower bound above its upper bound
    #[error("Invalid {metric} range: min ({min}) must not exceed max ({max})")]
    InvalidRange {
        metric: String,
        min: f64,
        max: f64,
    },

    /// Invalid field value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
