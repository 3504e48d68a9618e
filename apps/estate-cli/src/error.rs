//! # CLI Error Type
//!
//! One error type for every command, printed as a single line.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in estate-cli                             │
//! │                                                                         │
//! │  Command handler: CliResult<()>                                        │
//! │       │                                                                 │
//! │       ├── StoreError   (estate-store)  ─┐                               │
//! │       ├── RemoteError  (estate-remote) ─┤                               │
//! │       ├── SheetError   (estate-sheets) ─┼──► CliError { code, message } │
//! │       ├── CoreError    (estate-core)   ─┤                               │
//! │       └── io / json                    ─┘                               │
//! │                                                                         │
//! │  main: eprintln!("error: [CODE] message"), exit code 2 for usage,      │
//! │        1 for everything else                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use estate_core::CoreError;
use estate_remote::RemoteError;
use estate_sheets::SheetError;
use estate_store::StoreError;
use serde::Serialize;

/// Error reported by a command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CliError {
    /// Machine-readable category
    pub code: ErrorCode,

    /// Human-readable message
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad command line
    Usage,

    /// Record, backup or file missing
    NotFound,

    /// Payload rejected
    ValidationError,

    /// Local database failure
    StorageError,

    /// REST backend unreachable or failing
    NetworkError,

    /// REST backend did not answer in time
    Timeout,

    /// Configuration invalid
    ConfigError,

    /// File read/write failure
    IoError,
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::Usage, message)
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self.code {
            ErrorCode::Usage => 2,
            _ => 1,
        }
    }
}

/// Result type for command handlers.
pub type CliResult<T> = Result<T, CliError>;

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            other => CliError::validation(other.to_string()),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BackupNotFound(name) => CliError::not_found("Backup", &name),
            StoreError::InvalidBackupName(_) => CliError::usage(err.to_string()),
            StoreError::Core(core) => core.into(),
            ref e if e.is_config_error() => CliError::new(ErrorCode::ConfigError, e.to_string()),
            StoreError::Internal(e) => {
                // Keep details in the log, show a short message
                tracing::error!("Internal storage error: {}", e);
                CliError::new(ErrorCode::StorageError, "Storage operation failed")
            }
            other => CliError::new(ErrorCode::StorageError, other.to_string()),
        }
    }
}

impl From<RemoteError> for CliError {
    fn from(err: RemoteError) -> Self {
        if err.is_timeout() {
            return CliError::new(ErrorCode::Timeout, err.to_string());
        }
        if err.is_config_error() {
            return CliError::new(ErrorCode::ConfigError, err.to_string());
        }
        match err {
            RemoteError::Core(core) => core.into(),
            RemoteError::Server { status: 404, message } => CliError::new(ErrorCode::NotFound, message),
            RemoteError::Server { status, message } if (400..500).contains(&status) => {
                CliError::validation(format!("Server rejected the request ({status}): {message}"))
            }
            other => CliError::new(ErrorCode::NetworkError, other.to_string()),
        }
    }
}

impl From<SheetError> for CliError {
    fn from(err: SheetError) -> Self {
        match err {
            SheetError::Import(core) => core.into(),
            SheetError::Io(e) => CliError::new(ErrorCode::IoError, e.to_string()),
            other => CliError::validation(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            CliError::new(ErrorCode::NotFound, err.to_string())
        } else {
            CliError::new(ErrorCode::IoError, err.to_string())
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::validation(format!("Invalid JSON: {err}"))
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = serde_json::to_value(self.code)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| format!("{:?}", self.code));
        write!(f, "[{}] {}", code, self.message)
    }
}

impl std::error::Error for CliError {}
