//! Formatted output helpers for CLI commands.

use std::fmt::Write as _;
use std::path::PathBuf;

use gpuvol_core::Volume;
use serde::Serialize;

/// Serializable view of a resolved volume.
#[derive(Debug, Serialize)]
pub struct VolumeSummary {
    /// Volume name.
    pub name: String,
    /// In-container mountpoint.
    pub mountpoint: PathBuf,
    /// Host directory the tree is built in.
    pub path: PathBuf,
    /// Driver version segment.
    pub version: String,
    /// Resolved files per subdirectory.
    pub dirs: Vec<DirSummary>,
}

/// Files destined for one subdirectory.
#[derive(Debug, Serialize)]
pub struct DirSummary {
    /// Subdirectory name.
    pub name: String,
    /// Host files.
    pub files: Vec<PathBuf>,
}

impl From<&Volume<'_>> for VolumeSummary {
    fn from(vol: &Volume<'_>) -> Self {
        Self {
            name: vol.name().to_owned(),
            mountpoint: vol.mountpoint().to_path_buf(),
            path: vol.version_path(),
            version: vol.version.clone(),
            dirs: vol
                .dirs()
                .iter()
                .map(|d| DirSummary {
                    name: d.name.clone(),
                    files: d.files.clone(),
                })
                .collect(),
        }
    }
}

/// Renders a volume as an indented listing.
#[must_use]
pub fn format_volume(summary: &VolumeSummary) -> String {
    let mut out = format!(
        "{} ({}) -> {}\n",
        summary.name,
        summary.version,
        summary.mountpoint.display()
    );
    for dir in &summary.dirs {
        let _ = writeln!(out, "  {}/ ({} files)", dir.name, dir.files.len());
        for file in &dir.files {
            let _ = writeln!(out, "    {}", file.display());
        }
    }
    out
}
