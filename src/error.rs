//! Errors returned by daemon controllers

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while managing a native service
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("You must have root privileges")]
    InsufficientPrivilege,

    #[error("Service {name} is not installed")]
    NotInstalled { name: String },

    /// Negative branch of `status`: the service is installed but not running.
    #[error("Service {name} is stopped")]
    Stopped { name: String },

    #[error("{operation} failed: {detail}")]
    NativeCallFailure { operation: String, detail: String },

    #[error("Stop {name} timeout")]
    StopTimeout { name: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set permissions on {path}: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Template rendering failed for {template}: {source}")]
    Template {
        template: String,
        #[source]
        source: handlebars::RenderError,
    },

    #[error("Invalid configuration in {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl DaemonError {
    pub fn native(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        DaemonError::NativeCallFailure {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DaemonError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the `status` sentinel, which callers render as "dead" rather than a failure.
    pub fn is_stopped(&self) -> bool {
        matches!(self, DaemonError::Stopped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_timeout_names_service() {
        let err = DaemonError::StopTimeout {
            name: "backupd".to_string(),
        };
        assert_eq!(err.to_string(), "Stop backupd timeout");
    }

    #[test]
    fn test_stopped_is_distinguished() {
        let stopped = DaemonError::Stopped {
            name: "backupd".to_string(),
        };
        assert!(stopped.is_stopped());
        assert!(!DaemonError::InsufficientPrivilege.is_stopped());
        assert!(!DaemonError::native("systemctl start", "exit 1").is_stopped());
    }
}
