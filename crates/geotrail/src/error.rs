//! Error types for geotrail.
//!
//! This module defines all error types used throughout the geotrail crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for geotrail operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Location Errors ===
    /// The user or platform refused access to a capability.
    #[error("permission denied for {capability}. {instructions}")]
    PermissionDenied {
        /// The capability that was refused (e.g. "location").
        capability: String,
        /// Instructions for granting the permission.
        instructions: String,
    },

    /// No position could be obtained from the location provider.
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// The location provider did not answer within the configured timeout.
    #[error("location request timed out after {timeout_ms} ms")]
    LocationTimeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// Coordinates outside the valid WGS84 range.
    #[error("invalid coordinates: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinates {
        /// Rejected latitude.
        latitude: f64,
        /// Rejected longitude.
        longitude: f64,
    },

    // === Store Errors ===
    /// Positional access past the end of the record list.
    #[error("index {index} out of range for {len} records")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of records at the time of the call.
        len: usize,
    },

    /// Failed to write a persisted file.
    #[error("failed to write {path}: {source}")]
    FileWrite {
        /// Path that couldn't be written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A persisted file could not be decoded.
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// Path of the file that failed to decode.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The shared storage area rejected an operation.
    #[error("shared storage error: {0}")]
    SharedStorage(String),

    // === Upload Errors ===
    /// The HTTP request could not be completed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("upload rejected with status {status}: {body}")]
    UploadRejected {
        /// HTTP status code.
        status: u16,
        /// Response body, as returned by the server.
        body: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for geotrail operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new location-unavailable error.
    #[must_use]
    pub fn location_unavailable(message: impl Into<String>) -> Self {
        Self::LocationUnavailable(message.into())
    }

    /// Create a new shared storage error.
    #[must_use]
    pub fn shared_storage(message: impl Into<String>) -> Self {
        Self::SharedStorage(message.into())
    }

    /// Create a permission denied error with instructions.
    #[must_use]
    pub fn permission_denied(
        capability: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self::PermissionDenied {
            capability: capability.into(),
            instructions: instructions.into(),
        }
    }

    /// Check if this error is a permission issue.
    #[must_use]
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Check if retrying the same operation later may succeed.
    ///
    /// Upload and location failures are transient; decode and validation
    /// failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::LocationTimeout { .. } | Self::LocationUnavailable(_) => true,
            Self::UploadRejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
