//! # Remote Error Types
//!
//! Error types for the REST backend.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Remote Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Response            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Timeout        │  │  Server { status }      │ │
//! │  │  InvalidUrl     │  │  Network        │  │  Decode                 │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Dataset errors from estate-core pass through as `Core`.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use estate_core::CoreError;
use thiserror::Error;

/// Result type alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// REST backend failures.
///
/// Every request is made once. The categorisers below let callers decide
/// whether to try again.
#[derive(Debug, Error)]
pub enum RemoteError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid client configuration.
    #[error("Invalid remote configuration: {0}")]
    InvalidConfig(String),

    /// Base URL could not be parsed or joined.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// No response within the configured timeout.
    ///
    /// ## When This Occurs
    /// - Server is overloaded or hung
    /// - A very large backup upload on a slow link
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection could not be made or was dropped.
    ///
    /// ## When This Occurs
    /// - Server not running
    /// - DNS failure, offline machine
    #[error("Network error: {0}")]
    Network(String),

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// Server answered with a non-success status.
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// Response body was not the JSON we expected.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Dataset could not be migrated or decoded.
    #[error(transparent)]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<url::ParseError> for RemoteError {
    fn from(err: url::ParseError) -> Self {
        RemoteError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl RemoteError {
    /// Maps a reqwest failure, keeping timeouts apart from other failures.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout(timeout_secs)
        } else if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            RemoteError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            RemoteError::Network(err.to_string())
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RemoteError::Timeout(_))
    }

    /// Returns true if the same request may succeed later.
    ///
    /// ## Retryable Errors
    /// - Timeouts
    /// - Network failures
    /// - 5xx, 408 and 429 responses
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Timeout(_) | RemoteError::Network(_) => true,
            RemoteError::Server { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            _ => false,
        }
    }

    /// Returns true if the server reported the resource missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Server { status: 404, .. })
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, RemoteError::InvalidConfig(_) | RemoteError::InvalidUrl(_))
    }
}
