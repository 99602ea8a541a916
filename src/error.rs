//! Error types and handling for fortum-sync
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for fortum-sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Message fragments the provider uses when a session is no longer accepted.
pub const AUTH_FAILURE_MARKERS: [&str; 3] =
    ["Token expired", "Access forbidden", "Authentication failed"];

/// Main error type for fortum-sync
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// Provider API errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Authentication/authorization errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Statistics store errors
    #[error("Statistics error: {message}")]
    Statistics { message: String },

    /// A coordinator tick failed; the message carries the classified cause
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

/// How a failed fetch is reported to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// Session or credentials rejected by the provider
    Authentication,
    /// Any other provider or transport failure
    Api,
    /// Errors that should not come out of a fetch at all
    Unexpected,
}

impl FetchFailureKind {
    /// Prefix used in the update-failure message
    pub fn label(self) -> &'static str {
        match self {
            Self::Authentication => "Authentication error",
            Self::Api => "API error",
            Self::Unexpected => "Unexpected error",
        }
    }
}

impl SyncError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SyncError::Config {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        SyncError::Serialization {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        SyncError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SyncError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        SyncError::Network {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        SyncError::Api {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        SyncError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        SyncError::Auth {
            message: message.into(),
        }
    }

    /// Create a new statistics store error
    pub fn statistics<S: Into<String>>(message: S) -> Self {
        SyncError::Statistics {
            message: message.into(),
        }
    }

    /// Create a new update-failure error
    pub fn update_failed<S: Into<String>>(message: S) -> Self {
        SyncError::UpdateFailed {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        SyncError::Generic {
            message: message.into(),
        }
    }

    /// The message without the variant prefix
    pub fn detail(&self) -> String {
        match self {
            SyncError::Validation { field, message } => format!("{} - {}", field, message),
            SyncError::Config { message }
            | SyncError::Serialization { message }
            | SyncError::Io { message }
            | SyncError::Network { message }
            | SyncError::Api { message }
            | SyncError::Auth { message }
            | SyncError::Timeout { message }
            | SyncError::Statistics { message }
            | SyncError::UpdateFailed { message }
            | SyncError::Generic { message } => message.clone(),
        }
    }

    /// Classify an error returned by a fetch collaborator.
    ///
    /// Provider errors that carry one of [`AUTH_FAILURE_MARKERS`] count as
    /// authentication failures even when they were raised as plain API errors.
    pub fn fetch_failure_kind(&self) -> FetchFailureKind {
        match self {
            SyncError::Auth { .. } => FetchFailureKind::Authentication,
            SyncError::Api { message } if has_auth_marker(message) => {
                FetchFailureKind::Authentication
            }
            SyncError::Api { .. }
            | SyncError::Network { .. }
            | SyncError::Timeout { .. }
            | SyncError::Serialization { .. } => FetchFailureKind::Api,
            _ => FetchFailureKind::Unexpected,
        }
    }
}

fn has_auth_marker(message: &str) -> bool {
    AUTH_FAILURE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SyncError {
    fn from(err: serde_yaml::Error) -> Self {
        SyncError::serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::timeout(err.to_string())
        } else if err.is_decode() {
            SyncError::serialization(err.to_string())
        } else {
            SyncError::network(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for SyncError {
    fn from(err: chrono::ParseError) -> Self {
        SyncError::validation("datetime".to_string(), err.to_string())
    }
}
