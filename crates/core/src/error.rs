//! Error types for catalogs, execution and update status.

use std::path::PathBuf;
use std::time::Duration;

/// Errors raised while listing or resolving scripts and programs.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The name contains path separators or other traversal.
    #[error("Invalid name '{0}': must be a plain file name inside the directory")]
    InvalidName(String),

    /// No such file in the directory.
    #[error("Not found: {name} (looked in {})", .root.display())]
    NotFound { name: String, root: PathBuf },

    /// The name resolves outside the directory (e.g. through a symlink).
    #[error("Access denied: {0} resolves outside its directory")]
    OutsideRoot(String),

    /// Reading the directory or a file failed.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that prevent a child process from producing a result.
///
/// A non-zero exit code is not an error; it is reported in the result.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// The target could not be resolved.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The process could not be started.
    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran past the configured timeout and was killed.
    #[error("`{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The interpreter or runner is not configured.
    #[error("No runner configured for {0}")]
    NoRunner(&'static str),
}

/// Errors reading the update checker's files.
#[derive(Debug, thiserror::Error)]
pub enum UpdateStatusError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed update state in {}: {reason}", .path.display())]
    MalformedState { path: PathBuf, reason: String },

    #[error("Malformed update config in {}: {reason}", .path.display())]
    MalformedConfig { path: PathBuf, reason: String },
}
