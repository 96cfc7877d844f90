//! `PATH` search for driver executables.

use std::ffi::OsString;
use std::path::PathBuf;

use gpuvol_common::error::{GpuvolError, Result};

use super::BinaryResolver;

/// Finds executables on a search path and canonicalizes them.
///
/// Names that cannot be found are skipped: optional tools such as
/// `nvidia-persistenced` are often missing and callers accept partial sets.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    search_path: Option<OsString>,
}

impl PathResolver {
    /// Searches the process `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Searches an explicit colon-separated path list instead of `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => which::which_in(name, Some(paths), "/"),
            None => which::which(name),
        };
        match found {
            Ok(path) if path.is_absolute() => Some(path),
            Ok(path) => {
                tracing::debug!(name, path = %path.display(), "ignoring relative match");
                None
            }
            Err(e) => {
                tracing::debug!(name, error = %e, "binary not found");
                None
            }
        }
    }
}

impl BinaryResolver for PathResolver {
    fn resolve(&self, names: &[String]) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(names.len());
        for name in names {
            let Some(found) = self.find(name) else {
                continue;
            };
            let real = std::fs::canonicalize(&found).map_err(|e| GpuvolError::io(&found, e))?;
            tracing::debug!(name, path = %real.display(), "resolved binary");
            paths.push(real);
        }
        Ok(paths)
    }
}
