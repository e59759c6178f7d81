//! Core error types for announcer-core.
//!
//! Errors are split by concern using thiserror. Scheduling code never sees
//! `SpeechError`: speech failures are absorbed by the fallback chain inside
//! the speech engine and only show up in logs and events.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for announcer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Speech synthesis or playback errors
    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not resolve or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors for user edits and static schedules.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Interval for timer '{id}' must be between 1 and 60 minutes (got {minutes})")]
    InvalidInterval { id: String, minutes: i64 },

    #[error("Timer '{id}' needs at least one non-empty message")]
    EmptyMessages { id: String },

    #[error("Invalid clock time '{0}', expected HH:MM")]
    InvalidClockTime(String),

    #[error("Closing schedule needs exactly one entry with 0 minutes until close (found {0})")]
    ClosingMomentCount(usize),

    #[error("Unknown timer: {0}")]
    UnknownTimer(String),

    #[error("Timer id already exists: {0}")]
    DuplicateTimerId(String),

    #[error("Volume must be within 0.0..=1.0 (got {0})")]
    InvalidVolume(f32),
}

/// Speech pipeline errors. Produced by backends, consumed by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpeechError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Synthesis endpoint returned HTTP {status}")]
    Http { status: u16 },

    #[error("Synthesis rejected: {0}")]
    Rejected(String),

    #[error("Synthesis returned no audio")]
    EmptyPayload,

    #[error("Audio payload could not be decoded: {0}")]
    Decode(String),

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Local synthesis failed: {0}")]
    Synthesis(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<reqwest::Error> for SpeechError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SpeechError::Http {
                status: status.as_u16(),
            },
            None => SpeechError::Network(err.to_string()),
        }
    }
}

impl From<base64::DecodeError> for SpeechError {
    fn from(err: base64::DecodeError) -> Self {
        SpeechError::Decode(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
