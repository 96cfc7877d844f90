//! Configuration model for volume lookup and construction.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GpuvolError, Result};
use crate::types::CloneMode;

/// Root configuration for gpuvol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuvolConfig {
    /// Directory under which `<volume>/<version>` trees are built.
    pub prefix: PathBuf,
    /// File duplication policy used when building volumes.
    pub clone_mode: CloneMode,
    /// Optional JSON catalog replacing the built-in one.
    pub catalog: Option<PathBuf>,
    /// Driver version to use instead of querying the host.
    pub driver_version: Option<String>,
}

impl Default for GpuvolConfig {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from(crate::constants::DEFAULT_PREFIX),
            clone_mode: CloneMode::default(),
            catalog: None,
            driver_version: None,
        }
    }
}

impl GpuvolConfig {
    /// Loads a configuration from a JSON file. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GpuvolError::io(path, e))?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
