//! Host driver version discovery.
//!
//! The version is an opaque token used as a path segment under each
//! volume; it is never interpreted.

use std::path::PathBuf;

use gpuvol_common::constants::DRIVER_VERSION_FILE;
use gpuvol_common::error::{GpuvolError, Result};

/// Reports the version of the installed driver.
pub trait DriverVersionSource {
    /// Returns the driver version.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be determined.
    fn driver_version(&self) -> Result<String>;
}

/// Reads the version from the kernel module's procfs banner, e.g.
/// `NVRM version: NVIDIA UNIX x86_64 Kernel Module  535.104.05  Sat Aug 19 ...`.
#[derive(Debug, Clone)]
pub struct ProcDriverVersion {
    path: PathBuf,
}

impl Default for ProcDriverVersion {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DRIVER_VERSION_FILE),
        }
    }
}

impl ProcDriverVersion {
    /// Reads `/proc/driver/nvidia/version`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the banner from another file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Extracts the first numeric token after `Kernel Module` from the banner.
pub fn parse_banner(banner: &str) -> Option<&str> {
    banner
        .lines()
        .find_map(|line| line.split_once("Kernel Module"))
        .and_then(|(_, rest)| {
            rest.split_whitespace()
                .find(|token| token.starts_with(|c: char| c.is_ascii_digit()))
        })
}

impl DriverVersionSource for ProcDriverVersion {
    fn driver_version(&self) -> Result<String> {
        let banner =
            std::fs::read_to_string(&self.path).map_err(|e| GpuvolError::io(&self.path, e))?;
        let version = parse_banner(&banner).ok_or_else(|| GpuvolError::NotFound {
            kind: "driver version",
            id: self.path.display().to_string(),
        })?;
        tracing::debug!(version, "detected driver version");
        Ok(version.to_owned())
    }
}

/// A fixed version, for overrides and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDriverVersion(pub String);

impl DriverVersionSource for StaticDriverVersion {
    fn driver_version(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
