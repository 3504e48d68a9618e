//! # Store Error Types
//!
//! Error types for local persistence and configuration.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  sqlx::Error / io::Error / toml errors                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  estate-cli prints a one-line message                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use estate_core::CoreError;
use thiserror::Error;

/// Persistence and configuration errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Named backup does not exist.
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    /// Backup name contains characters we do not allow in keys.
    ///
    /// ## When This Occurs
    /// - Empty name
    /// - Spaces, slashes or other punctuation besides `-` and `_`
    #[error("Invalid backup name '{0}': use letters, digits, '-' or '_'")]
    InvalidBackupName(String),

    /// Stored value is not a readable dataset.
    ///
    /// ## When This Occurs
    /// - Manual edits to the database left invalid JSON behind
    /// - A backup written by an incompatible tool
    #[error("Stored data under '{key}' is unreadable: {reason}")]
    Corrupt { key: String, reason: String },

    /// Reconciliation rejected the payload as a whole.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Invalid application configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// Internal storage error.
    #[error("Internal storage error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StoreError::InvalidConfig(_) | StoreError::ConfigLoadFailed(_) | StoreError::ConfigSaveFailed(_)
        )
    }
}

/// Convert sqlx errors to StoreError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database       → StoreError::QueryFailed
/// sqlx::Error::PoolTimedOut   → StoreError::PoolExhausted
/// sqlx::Error::PoolClosed     → StoreError::ConnectionFailed
/// Other                       → StoreError::Internal
/// ```
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => StoreError::PoolExhausted,
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("Pool is closed".to_string()),
            _ => StoreError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::MigrationFailed(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(err: toml::de::Error) -> Self {
        StoreError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for StoreError {
    fn from(err: toml::ser::Error) -> Self {
        StoreError::ConfigSaveFailed(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            StoreError::BackupNotFound("monthly".into()).to_string(),
            "Backup not found: monthly"
        );
        let err = StoreError::corrupt("crm_data", "expected value at line 1");
        assert!(err.to_string().starts_with("Stored data under 'crm_data'"));
    }

    #[test]
    fn test_config_category() {
        assert!(StoreError::InvalidConfig("x".into()).is_config_error());
        assert!(!StoreError::PoolExhausted.is_config_error());
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: StoreError = CoreError::NotAnObject("array".into()).into();
        assert_eq!(err.to_string(), CoreError::NotAnObject("array".into()).to_string());
    }
}
