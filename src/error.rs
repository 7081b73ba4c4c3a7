//! Error types for rrarchive

use thiserror::Error;

/// Main error type for archive operations.
///
/// Only setup-time faults and cancellation surface here. Failures that affect a
/// single file or registry value during a bulk run are collected as
/// [`RestoreIssue`](crate::restore::RestoreIssue) records instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Archive not found: {path}")]
    ArchiveNotFound { path: String },

    #[error("Invalid manifest: {reason}")]
    InvalidManifest { reason: String },

    #[error("Registry error: {reason}")]
    Registry { reason: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl Error {
    /// True when the operation stopped because its cancellation token fired.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, Error>;
