//! Construction and lifecycle of on-host volume trees.
//!
//! A built volume lives at `<path>/<version>/{bin,lib,lib64}`. Creation is
//! all-or-nothing: any failure removes the whole version tree before the
//! error is returned, so [`Volume::exists`] never reports a half-built
//! volume.

use std::collections::BTreeMap;
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use gpuvol_common::constants::DIR_MODE;
use gpuvol_common::error::{GpuvolError, Result};

use crate::blacklist;
use crate::catalog::VolumeInfo;
use crate::clone::CloneStrategy;
use crate::elf::ElfFile;

/// SONAME prefix of the GLVND GLX vendor library.
const GLX_VENDOR: &str = "GLX_nvidia";
/// Vendor name GLVND falls back to for indirect rendering.
const GLX_INDIRECT: &str = "GLX_indirect";

/// Files destined for one subdirectory of a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeDir {
    /// Subdirectory name (`bin`, `lib`, `lib64`).
    pub name: String,
    /// Absolute, symlink-resolved host files, in resolver order.
    pub files: Vec<PathBuf>,
}

/// A catalog volume bound to a host location and driver version.
#[derive(Debug, Clone)]
pub struct Volume<'a> {
    info: &'a VolumeInfo,
    /// Host base directory (`<prefix>/<name>`).
    pub path: PathBuf,
    /// Driver version; empty for unversioned volumes.
    pub version: String,
    dirs: Vec<VolumeDir>,
}

/// Volumes keyed by name.
pub type VolumeMap<'a> = BTreeMap<String, Volume<'a>>;

impl<'a> Volume<'a> {
    /// Creates a volume with no resolved files.
    pub fn new(info: &'a VolumeInfo, path: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            info,
            path: path.into(),
            version: version.into(),
            dirs: Vec::new(),
        }
    }

    /// Catalog definition this volume was built from.
    pub const fn info(&self) -> &'a VolumeInfo {
        self.info
    }

    /// Volume name.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// In-container mountpoint.
    pub fn mountpoint(&self) -> &Path {
        &self.info.mountpoint
    }

    /// Resolved directories, in on-disk creation order.
    pub fn dirs(&self) -> &[VolumeDir] {
        &self.dirs
    }

    /// Appends a directory; directories are created in the order added.
    pub fn add_dir(&mut self, name: impl Into<String>, files: Vec<PathBuf>) {
        self.dirs.push(VolumeDir {
            name: name.into(),
            files,
        });
    }

    fn scoped(&self, version: &str) -> PathBuf {
        if version.is_empty() {
            self.path.clone()
        } else {
            self.path.join(version)
        }
    }

    /// Host directory holding this version of the volume.
    pub fn version_path(&self) -> PathBuf {
        self.scoped(&self.version)
    }

    /// Builds the volume tree under [`Volume::version_path`].
    ///
    /// # Errors
    ///
    /// Returns the first inspection or filesystem error; the version tree
    /// has been removed by then.
    pub fn create(&self, strategy: &dyn CloneStrategy) -> Result<()> {
        let root = self.version_path();
        tracing::info!(volume = %self.name(), path = %root.display(), "creating volume");
        make_dir(&root)?;

        if let Err(e) = self.populate(&root, strategy) {
            tracing::warn!(volume = %self.name(), error = %e, "volume creation failed, rolling back");
            if let Err(cleanup) = self.remove(None) {
                tracing::error!(
                    volume = %self.name(),
                    path = %root.display(),
                    error = %cleanup,
                    "rollback failed"
                );
            }
            return Err(e);
        }
        tracing::info!(volume = %self.name(), path = %root.display(), "volume created");
        Ok(())
    }

    /// Points the volume at `path` with no version segment, then creates it.
    ///
    /// # Errors
    ///
    /// See [`Volume::create`].
    pub fn create_at(&mut self, path: impl Into<PathBuf>, strategy: &dyn CloneStrategy) -> Result<()> {
        self.path = path.into();
        self.version.clear();
        self.create(strategy)
    }

    /// Deletes `<path>/<version>`, defaulting to this volume's version.
    /// Removing a tree that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree exists but cannot be deleted.
    pub fn remove(&self, version: Option<&str>) -> Result<()> {
        let path = self.scoped(version.unwrap_or(&self.version));
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                tracing::info!(volume = %self.name(), path = %path.display(), "volume removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GpuvolError::io(path, e)),
        }
    }

    /// Reports whether this version of the volume is present on disk.
    ///
    /// # Errors
    ///
    /// Returns an error for any stat failure other than "not found".
    pub fn exists(&self) -> Result<bool> {
        let path = self.version_path();
        match std::fs::metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GpuvolError::io(path, e)),
        }
    }

    fn populate(&self, root: &Path, strategy: &dyn CloneStrategy) -> Result<()> {
        for dir in &self.dirs {
            let dest = root.join(&dir.name);
            make_dir(&dest)?;
            for file in &dir.files {
                self.install(file, &dir.name, &dest, strategy)?;
            }
        }
        Ok(())
    }

    /// Clones one host file into `dest` and adds its SONAME links.
    fn install(
        &self,
        src: &Path,
        category: &str,
        dest: &Path,
        strategy: &dyn CloneStrategy,
    ) -> Result<()> {
        let obj = ElfFile::open(src)?;
        if blacklist::is_blacklisted(src, &obj)? {
            tracing::warn!(path = %src.display(), "skipping blacklisted file");
            return Ok(());
        }

        let base = src
            .file_name()
            .ok_or_else(|| GpuvolError::elf(src, "path has no file name"))?;
        strategy.clone_file(src, &dest.join(base))?;
        tracing::debug!(src = %src.display(), dest = %dest.display(), class = ?obj.class(), "cloned");

        let Some(soname) = obj.soname()? else {
            return Ok(());
        };
        if soname.contains('/') {
            return Err(GpuvolError::elf(src, format!("invalid SONAME {soname}")));
        }
        if base == soname.as_str() {
            return Ok(());
        }

        // Links resolve inside the container, wherever the tree is mounted.
        let target = self.mountpoint().join(category).join(base);
        install_link(&target, &dest.join(&soname))?;
        if let Some(indirect) = indirect_glx_name(&soname) {
            install_link(&target, &dest.join(indirect))?;
        }
        Ok(())
    }
}

fn make_dir(path: &Path) -> Result<()> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(path)
        .map_err(|e| GpuvolError::io(path, e))
}

/// GLVND looks up `libGLX_indirect.so.0` for indirect GLX contexts.
fn indirect_glx_name(soname: &str) -> Option<String> {
    soname
        .starts_with(&format!("lib{GLX_VENDOR}"))
        .then(|| soname.replacen(GLX_VENDOR, GLX_INDIRECT, 1))
}

/// Creates `link -> target`. An identical existing link is accepted.
fn install_link(target: &Path, link: &Path) -> Result<()> {
    match std::os::unix::fs::symlink(target, link) {
        Ok(()) => {
            tracing::debug!(link = %link.display(), target = %target.display(), "symlinked");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let existing = std::fs::read_link(link).map_err(|_| GpuvolError::io(link, e))?;
            if existing == target {
                Ok(())
            } else {
                Err(GpuvolError::SymlinkConflict {
                    link: link.to_path_buf(),
                    existing,
                    target: target.to_path_buf(),
                })
            }
        }
        Err(e) => Err(GpuvolError::io(link, e)),
    }
}
