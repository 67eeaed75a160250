//! Error types for uploader construction.
//!
//! Upload sessions themselves never fail with an error: every batch ends in a
//! [`crate::BatchOutcome`]. These errors cover programmer and configuration
//! mistakes, which surface synchronously before any request is sent.

use thiserror::Error;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Upload policy value out of range
    E001InvalidPolicy,
    /// E002: Endpoint URL cannot be parsed
    E002InvalidEndpoint,
    /// E003: HTTP client could not be constructed
    E003ClientBuild,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E001InvalidPolicy => "E001",
            Self::E002InvalidEndpoint => "E002",
            Self::E003ClientBuild => "E003",
        }
    }
}

/// Errors that can occur while building an uploader
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("[{code}] Invalid upload policy: {message}")]
    InvalidPolicy { code: &'static str, message: String },

    #[error("[{code}] Invalid endpoint URL '{url}': {message}")]
    InvalidEndpoint {
        code: &'static str,
        url: String,
        message: String,
    },

    #[error("[{code}] Failed to build HTTP client: {source}")]
    ClientBuild {
        code: &'static str,
        source: reqwest::Error,
    },
}

impl UploadError {
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            code: ErrorCode::E001InvalidPolicy.as_str(),
            message: message.into(),
        }
    }

    pub fn invalid_endpoint(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::InvalidEndpoint {
            code: ErrorCode::E002InvalidEndpoint.as_str(),
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn client_build(source: reqwest::Error) -> Self {
        Self::ClientBuild {
            code: ErrorCode::E003ClientBuild.as_str(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPolicy { code, .. }
            | Self::InvalidEndpoint { code, .. }
            | Self::ClientBuild { code, .. } => *code,
        }
    }
}

/// Result type alias for UploadError
pub type Result<T> = std::result::Result<T, UploadError>;
