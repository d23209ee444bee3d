use std::time::Duration;

use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration errors, always reported before any job starts
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Batch input errors
    #[error("input error: {0}")]
    Input(#[from] InputError),
    /// Automation bridge errors
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),
    /// File operation errors
    #[error("file error: {0}")]
    File(#[from] FileError),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Pool size must be a positive integer
    #[error("max_concurrent must be a positive integer, got {value}")]
    InvalidPoolSize { value: usize },
    /// A shared (non-isolated) session cannot run more than one job at a time
    #[error(
        "bridge instances from '{factory}' share browser state; max_concurrent={requested} \
         requires isolated instances (set allow_shared_session_concurrency to override)"
    )]
    SharedSessionConcurrency { factory: String, requested: usize },
    /// A configuration field or environment variable could not be parsed
    #[error("invalid value '{value}' for {field}: expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
    /// Two jobs in the same batch share an index
    #[error("job index {index} appears more than once in the batch")]
    DuplicateJobIndex { index: usize },
}

/// Batch input errors
#[derive(Debug, Error)]
pub enum InputError {
    /// The batch document is not what we expect
    #[error("malformed batch input: {reason}")]
    Malformed { reason: String },
    /// An entry has none of the identifying fields required by its job kind
    #[error("entry {position} has none of the required fields: {expected}")]
    MissingIdentifier { position: usize, expected: String },
    /// No items were provided
    #[error("no items provided")]
    Empty,
}

/// Automation bridge errors
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Launching a browser instance failed
    #[error("failed to launch browser for slot {slot}: {message}")]
    LaunchFailed { slot: usize, message: String },
    /// Attaching to an existing browser failed
    #[error("failed to connect to browser on port {port}: {message}")]
    ConnectionFailed { port: u16, message: String },
    /// Opening a page failed
    #[error("failed to open page: {message}")]
    PageCreationFailed { message: String },
    /// The operation itself raised an error
    #[error("operation '{operation}' failed: {message}")]
    OperationFailed { operation: String, message: String },
    /// The bridge does not know the operation
    #[error("unsupported operation '{operation}'")]
    UnsupportedOperation { operation: String },
    /// Arguments were missing or of the wrong type
    #[error("invalid arguments for '{operation}': {message}")]
    InvalidArguments { operation: String, message: String },
    /// The operation did not finish in time
    #[error("operation '{operation}' timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
    /// Every pool member failed to shut down
    #[error("failed to tear down {failed} bridge instance(s)")]
    TeardownFailed { failed: usize },
}

/// File operation errors
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML file {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors raised while pulling a structured payload out of a bridge response
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("response text has no result block")]
    MissingResultBlock,
    #[error("result block is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

// ========== Convenience constructors ==========

impl FileError {
    pub fn read(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        FileError::ReadFailed {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    pub fn write(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        FileError::WriteFailed {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl BridgeError {
    pub fn operation_failed(operation: impl Into<String>, err: impl std::fmt::Display) -> Self {
        BridgeError::OperationFailed {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    pub fn invalid_arguments(operation: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::InvalidArguments {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl InputError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        InputError::Malformed {
            reason: reason.into(),
        }
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::from(ConfigError::InvalidPoolSize { value: 0 });
        assert_eq!(
            err.to_string(),
            "configuration error: max_concurrent must be a positive integer, got 0"
        );
    }

    #[test]
    fn test_timeout_names_operation() {
        let err = BridgeError::Timeout {
            operation: "browser_navigate".to_string(),
            after: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("browser_navigate"));
        assert!(err.to_string().contains("30s"));
    }
}
