//! Mapping logical component names to host files.
//!
//! Executables are found on `PATH`; shared libraries through the dynamic
//! linker cache. Both are capabilities so lookup can run against fakes.

pub mod binary;
pub mod library;

use std::path::PathBuf;

use gpuvol_common::error::Result;

pub use binary::PathResolver;
pub use library::{LdconfigCache, LdconfigSource};

/// Resolves executable names to absolute, symlink-free host paths.
pub trait BinaryResolver {
    /// Resolves `names`, omitting those that are not installed.
    ///
    /// # Errors
    ///
    /// Returns an error if a found executable cannot be canonicalized.
    fn resolve(&self, names: &[String]) -> Result<Vec<PathBuf>>;
}

/// Libraries matching a cache lookup, split by word size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryPaths {
    /// 32-bit objects.
    pub lib32: Vec<PathBuf>,
    /// 64-bit objects.
    pub lib64: Vec<PathBuf>,
}

/// An open handle on the dynamic linker cache.
pub trait LibraryCache {
    /// Returns every cached library whose name starts with one of `names`.
    fn lookup(&self, names: &[String]) -> LibraryPaths;

    /// Releases the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource fails to close.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens [`LibraryCache`] handles.
pub trait LibraryCacheSource {
    /// Opens a fresh handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read.
    fn open(&self) -> Result<Box<dyn LibraryCache>>;
}
