//! Core error types for dosewatch-core.
//!
//! This module defines the error hierarchy using thiserror. The reminder
//! workflow never panics on a failure path: every outcome resolves to a
//! variant here and the embedding layer decides presentation.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dosewatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Reminder workflow errors
    #[error("Reminder error: {0}")]
    Reminder(#[from] ReminderError),

    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Notification gateway errors
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

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

/// Errors surfaced by the reminder scheduler to its triggering caller.
#[derive(Error, Debug)]
pub enum ReminderError {
    /// The dose, its individual, or its caregiver is unknown to the store.
    #[error("Not found: {entity} {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// The resolved caregiver has no phone number on file.
    #[error("Caregiver {caregiver_id} has no phone number on file")]
    MissingContact { caregiver_id: i64 },

    /// A reminder cycle for this dose is already pending evaluation.
    #[error("A reminder cycle is already active for dose {dose_id}")]
    CycleAlreadyActive { dose_id: i64 },

    /// The initial notification could not be delivered; no cycle was armed.
    #[error("Notification delivery failed: {0}")]
    GatewayFailure(#[from] GatewayError),

    /// Reading or updating dose state failed mid-workflow.
    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

/// Store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Notification gateway errors.
///
/// `Rejected` is permanent (bad destination, refused payload) and must not
/// be retried; `Transport` covers transient network/HTTP failures.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The gateway permanently rejected the destination or payload.
    #[error("Destination rejected by gateway: {reason}")]
    Rejected { reason: String },

    /// Transport-level failure (connect, timeout, 5xx).
    #[error("Gateway transport failure: {reason}")]
    Transport { reason: String },

    /// Gateway credentials are missing or incomplete.
    #[error("Gateway not configured: {0}")]
    NotConfigured(String),
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),
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

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
