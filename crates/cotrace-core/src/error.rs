//! Unified error types for the cotrace core library.
//!
//! Every fallible core operation returns [`CoreError`] through the [`Result`]
//! alias. Variants are grouped by concern: local persistence, persisted-state
//! decoding, and caller precondition violations.

use thiserror::Error;

/// The unified error type for all core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Local persistence is unavailable or rejected the operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A low-level I/O error occurred while reading or writing local data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data exists but could not be decoded.
    ///
    /// Raised by the state codec on an unrecognized state tag or malformed
    /// payload. Deliberately loud: a corrupt state blob must never be
    /// silently replaced by a default state.
    #[error("Deserialization error: {reason}")]
    Deserialization {
        /// What made the payload undecodable.
        reason: String,
    },

    /// The caller violated an operation's precondition.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// A JSON document failed to serialize or parse.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),
}

/// A specialized [`Result`] type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns `true` if this error came from local persistence or I/O.
    #[inline]
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }

    /// Returns `true` if this error means persisted data is undecodable.
    #[inline]
    #[must_use]
    pub const fn is_deserialization_error(&self) -> bool {
        matches!(self, Self::Deserialization { .. })
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigParse(_) | Self::ConfigValidation(_))
    }
}
