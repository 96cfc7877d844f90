//! Unified error type for the gpuvol workspace.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum GpuvolError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// An ELF object could not be parsed or lacks required metadata.
    #[error("malformed ELF object {path}: {message}")]
    Elf {
        /// Object being inspected.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// A symlink already exists and points somewhere else.
    #[error("symlink {link} already points to {existing}, expected {target}")]
    SymlinkConflict {
        /// Location of the link.
        link: PathBuf,
        /// Target the existing link resolves to.
        existing: PathBuf,
        /// Target we tried to install.
        target: PathBuf,
    },

    /// An external helper program failed.
    #[error("{program} failed: {message}")]
    Command {
        /// Program that was run.
        program: String,
        /// Failure description (exit status or stderr).
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl GpuvolError {
    /// Builds a [`GpuvolError::Io`] bound to `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`GpuvolError::Elf`] for the object at `path`.
    pub fn elf(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Elf {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, GpuvolError>;
