//! File duplication policies used when populating a volume.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use gpuvol_common::error::{GpuvolError, Result};
use gpuvol_common::types::CloneMode;

/// Places a copy of a host file at a destination inside a volume.
pub trait CloneStrategy {
    /// Makes `dst` refer to the contents of `src`.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be produced.
    fn clone_file(&self, src: &Path, dst: &Path) -> Result<()>;
}

/// Hard links only. Fails across filesystem boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Link;

impl CloneStrategy for Link {
    fn clone_file(&self, src: &Path, dst: &Path) -> Result<()> {
        std::fs::hard_link(src, dst).map_err(|e| GpuvolError::io(dst, e))
    }
}

/// Hard links when possible, otherwise copies the file.
///
/// An existing destination is reported, never overwritten: it may be a
/// hard link to the host file itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkOrCopy;

impl CloneStrategy for LinkOrCopy {
    fn clone_file(&self, src: &Path, dst: &Path) -> Result<()> {
        match std::fs::hard_link(src, dst) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(GpuvolError::io(dst, e)),
            Err(e) => {
                tracing::debug!(
                    src = %src.display(),
                    dst = %dst.display(),
                    error = %e,
                    "hard link failed, copying"
                );
                copy_file(src, dst)
            }
        }
    }
}

/// Returns the strategy selected by a configuration value.
pub fn strategy_for(mode: CloneMode) -> &'static dyn CloneStrategy {
    match mode {
        CloneMode::Link => &Link,
        CloneMode::Copy => &LinkOrCopy,
    }
}

/// Copies `src` to `dst` byte for byte, preserving the permission mode.
///
/// `dst` must not exist yet. A failed copy removes whatever it wrote to
/// `dst`.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the destination
/// cannot be written.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    let mut source = File::open(src).map_err(|e| GpuvolError::io(src, e))?;
    let permissions = source
        .metadata()
        .map_err(|e| GpuvolError::io(src, e))?
        .permissions();

    let mut dest = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(|e| GpuvolError::io(dst, e))?;
    let result = std::io::copy(&mut source, &mut dest)
        .and_then(|_| dest.set_permissions(permissions))
        .and_then(|()| dest.sync_all());
    drop(dest);

    if let Err(e) = result {
        if let Err(cleanup) = std::fs::remove_file(dst) {
            tracing::warn!(path = %dst.display(), error = %cleanup, "failed to remove partial copy");
        }
        return Err(GpuvolError::io(dst, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    use super::*;

    #[test]
    fn link_shares_the_inode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("libcuda.so.535");
        let dst = dir.path().join("clone");
        std::fs::write(&src, b"cuda").expect("write");

        Link.clone_file(&src, &dst).expect("link");
        let a = std::fs::metadata(&src).unwrap();
        let b = std::fs::metadata(&dst).unwrap();
        assert_eq!(a.ino(), b.ino());
    }

    #[test]
    fn link_fails_when_source_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Link
            .clone_file(&dir.path().join("missing"), &dir.path().join("dst"))
            .unwrap_err();
        assert!(matches!(err, GpuvolError::Io { .. }));
    }

    #[test]
    fn link_or_copy_reports_copy_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("nvidia-smi");
        let dst = dir.path().join("nvidia-smi.clone");
        std::fs::write(&src, b"smi").expect("write");
        // The directory already occupies the destination.
        std::fs::create_dir(&dst).expect("mkdir");

        assert!(LinkOrCopy.clone_file(&src, &dst).is_err());
    }

    #[test]
    fn link_or_copy_keeps_an_existing_hard_link_intact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("libcuda.so.535");
        let dst = dir.path().join("libcuda.so.535.clone");
        std::fs::write(&src, b"cuda driver").expect("write");
        std::fs::hard_link(&src, &dst).expect("link");

        let err = LinkOrCopy.clone_file(&src, &dst).unwrap_err();
        assert!(matches!(
            err,
            GpuvolError::Io { ref source, .. } if source.kind() == ErrorKind::AlreadyExists
        ));
        assert_eq!(std::fs::read(&src).unwrap(), b"cuda driver");
    }

    #[test]
    fn copy_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("nvidia-smi");
        let dst = dir.path().join("copy");
        std::fs::write(&src, b"new").expect("write");
        std::fs::write(&dst, b"old").expect("write");

        assert!(copy_file(&src, &dst).is_err());
        assert_eq!(std::fs::read(&dst).unwrap(), b"old");
        assert_eq!(std::fs::read(&src).unwrap(), b"new");
    }

    #[test]
    fn copy_preserves_contents_and_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("nvidia-smi");
        let dst = dir.path().join("copy");
        std::fs::write(&src, b"#!binary").expect("write");
        std::fs::set_permissions(&src, std::fs::Permissions::from_mode(0o751)).expect("chmod");

        copy_file(&src, &dst).expect("copy");
        assert_eq!(std::fs::read(&dst).unwrap(), b"#!binary");
        let mode = std::fs::metadata(&dst).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o751);
        assert_ne!(
            std::fs::metadata(&src).unwrap().ino(),
            std::fs::metadata(&dst).unwrap().ino()
        );
    }

    #[test]
    fn copy_missing_source_leaves_no_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dst = dir.path().join("copy");
        assert!(copy_file(&dir.path().join("missing"), &dst).is_err());
        assert!(!dst.exists());
    }

    #[test]
    fn strategy_for_maps_modes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src");
        std::fs::write(&src, b"x").expect("write");
        strategy_for(CloneMode::Link)
            .clone_file(&src, &dir.path().join("a"))
            .expect("link");
        strategy_for(CloneMode::Copy)
            .clone_file(&src, &dir.path().join("b"))
            .expect("copy");
    }
}
