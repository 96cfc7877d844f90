//! Turns the catalog into volumes ready to build.

use std::path::Path;

use gpuvol_common::constants::{BIN_DIR, COMPONENT_BINARIES, COMPONENT_LIBRARIES, LIB32_DIR, LIB64_DIR};
use gpuvol_common::error::Result;

use crate::catalog::Catalog;
use crate::driver::{DriverVersionSource, ProcDriverVersion};
use crate::resolver::{BinaryResolver, LdconfigSource, LibraryCache, LibraryCacheSource, PathResolver};
use crate::volume::{Volume, VolumeMap};

/// Resolves every catalog volume against the host.
pub struct VolumeLookup<'a> {
    catalog: &'a Catalog,
    driver: Box<dyn DriverVersionSource>,
    libraries: Box<dyn LibraryCacheSource>,
    binaries: Box<dyn BinaryResolver>,
}

impl std::fmt::Debug for VolumeLookup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeLookup")
            .field("volumes", &self.catalog.volumes.len())
            .finish_non_exhaustive()
    }
}

impl<'a> VolumeLookup<'a> {
    /// Assembles a lookup from explicit collaborators.
    pub fn new(
        catalog: &'a Catalog,
        driver: Box<dyn DriverVersionSource>,
        libraries: Box<dyn LibraryCacheSource>,
        binaries: Box<dyn BinaryResolver>,
    ) -> Self {
        Self {
            catalog,
            driver,
            libraries,
            binaries,
        }
    }

    /// Uses the procfs driver version, `ldconfig -p` and `PATH`.
    pub fn host(catalog: &'a Catalog) -> Self {
        Self::new(
            catalog,
            Box::new(ProcDriverVersion::new()),
            Box::new(LdconfigSource::new()),
            Box::new(PathResolver::new()),
        )
    }

    /// Replaces the driver version source.
    #[must_use]
    pub fn with_driver(mut self, driver: Box<dyn DriverVersionSource>) -> Self {
        self.driver = driver;
        self
    }

    /// Builds one [`Volume`] per catalog entry under `prefix/<name>`.
    ///
    /// The linker cache is opened once and closed before returning; when
    /// both resolution and close fail, the resolution error is reported.
    ///
    /// # Errors
    ///
    /// Returns the first driver, cache or resolution error. No partial map
    /// is returned.
    pub fn lookup(&self, prefix: &Path) -> Result<VolumeMap<'a>> {
        let version = self.driver.driver_version()?;
        tracing::info!(prefix = %prefix.display(), version = %version, "looking up volumes");

        let cache = self.libraries.open()?;
        let resolved = self.resolve_all(prefix, &version, cache.as_ref());
        let closed = cache.close();
        match (resolved, closed) {
            (Ok(volumes), closed) => closed.map(|()| volumes),
            (Err(e), Err(close)) => {
                tracing::warn!(error = %close, "failed to close library cache");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
        }
    }

    fn resolve_all(&self, prefix: &Path, version: &str, cache: &dyn LibraryCache) -> Result<VolumeMap<'a>> {
        let mut volumes = VolumeMap::new();

        for info in self.catalog {
            let mut vol = Volume::new(info, prefix.join(&info.name), version);

            for category in info.components.keys() {
                if category != COMPONENT_BINARIES && category != COMPONENT_LIBRARIES {
                    tracing::debug!(volume = %info.name, category = %category, "ignoring unknown component");
                }
            }

            if let Some(names) = info.components.get(COMPONENT_BINARIES) {
                let bins = self.binaries.resolve(names)?;
                vol.add_dir(BIN_DIR, bins);
            }
            if let Some(names) = info.components.get(COMPONENT_LIBRARIES) {
                let libs = cache.lookup(names);
                vol.add_dir(LIB32_DIR, libs.lib32);
                vol.add_dir(LIB64_DIR, libs.lib64);
            }

            tracing::debug!(
                volume = %info.name,
                files = vol.dirs().iter().map(|d| d.files.len()).sum::<usize>(),
                "volume resolved"
            );
            let _ = volumes.insert(info.name.clone(), vol);
        }
        Ok(volumes)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::rc::Rc;

    use gpuvol_common::error::GpuvolError;

    use super::*;
    use crate::catalog::VolumeInfo;
    use crate::driver::StaticDriverVersion;
    use crate::resolver::LibraryPaths;

    struct FakeBinaries;

    impl BinaryResolver for FakeBinaries {
        fn resolve(&self, names: &[String]) -> Result<Vec<PathBuf>> {
            Ok(names
                .iter()
                .filter(|n| *n != "missing")
                .map(|n| PathBuf::from("/usr/bin").join(n))
                .collect())
        }
    }

    struct BrokenBinaries;

    impl BinaryResolver for BrokenBinaries {
        fn resolve(&self, _names: &[String]) -> Result<Vec<PathBuf>> {
            Err(GpuvolError::io("/usr/bin/nvidia-smi", std::io::Error::from(std::io::ErrorKind::PermissionDenied)))
        }
    }

    #[derive(Default)]
    struct FakeCache {
        opened: Rc<Cell<usize>>,
        closed: Rc<Cell<usize>>,
        fail_close: bool,
    }

    struct FakeHandle {
        closed: Rc<Cell<usize>>,
        fail_close: bool,
    }

    impl LibraryCache for FakeHandle {
        fn lookup(&self, names: &[String]) -> LibraryPaths {
            LibraryPaths {
                lib32: names.iter().map(|n| PathBuf::from("/usr/lib32").join(format!("{n}.1"))).collect(),
                lib64: names.iter().map(|n| PathBuf::from("/usr/lib64").join(format!("{n}.1"))).collect(),
            }
        }

        fn close(self: Box<Self>) -> Result<()> {
            self.closed.set(self.closed.get() + 1);
            if self.fail_close {
                return Err(GpuvolError::Command {
                    program: "ldcache".into(),
                    message: "close failed".into(),
                });
            }
            Ok(())
        }
    }

    impl LibraryCacheSource for FakeCache {
        fn open(&self) -> Result<Box<dyn LibraryCache>> {
            self.opened.set(self.opened.get() + 1);
            Ok(Box::new(FakeHandle {
                closed: Rc::clone(&self.closed),
                fail_close: self.fail_close,
            }))
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            VolumeInfo {
                name: "nvidia_driver".into(),
                mountpoint: PathBuf::from("/usr/local/nvidia"),
                components: BTreeMap::from([
                    ("binaries".to_owned(), vec!["nvidia-smi".to_owned(), "missing".to_owned()]),
                    ("libraries".to_owned(), vec!["libcuda.so".to_owned()]),
                    ("firmware".to_owned(), vec!["gsp.bin".to_owned()]),
                ]),
            },
            VolumeInfo {
                name: "libs_only".into(),
                mountpoint: PathBuf::from("/opt/libs"),
                components: BTreeMap::from([("libraries".to_owned(), vec!["libEGL.so".to_owned()])]),
            },
        ])
        .unwrap()
    }

    fn lookup_with<'a>(catalog: &'a Catalog, cache: FakeCache, bins: Box<dyn BinaryResolver>) -> VolumeLookup<'a> {
        VolumeLookup::new(
            catalog,
            Box::new(StaticDriverVersion("535.104.05".into())),
            Box::new(cache),
            bins,
        )
    }

    #[test]
    fn builds_one_volume_per_catalog_entry() {
        let catalog = catalog();
        let cache = FakeCache::default();
        let (opened, closed) = (Rc::clone(&cache.opened), Rc::clone(&cache.closed));

        let vols = lookup_with(&catalog, cache, Box::new(FakeBinaries))
            .lookup(Path::new("/var/lib/gpuvol"))
            .expect("lookup");

        assert_eq!(vols.len(), 2);
        assert_eq!((opened.get(), closed.get()), (1, 1));

        let driver = &vols["nvidia_driver"];
        assert_eq!(driver.path, PathBuf::from("/var/lib/gpuvol/nvidia_driver"));
        assert_eq!(driver.version, "535.104.05");
        let names: Vec<_> = driver.dirs().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["bin", "lib", "lib64"]);
        assert_eq!(driver.dirs()[0].files, vec![PathBuf::from("/usr/bin/nvidia-smi")]);
        assert_eq!(driver.dirs()[2].files, vec![PathBuf::from("/usr/lib64/libcuda.so.1")]);
    }

    #[test]
    fn volume_without_binaries_has_only_library_dirs() {
        let catalog = catalog();
        let vols = lookup_with(&catalog, FakeCache::default(), Box::new(FakeBinaries))
            .lookup(Path::new("/prefix"))
            .expect("lookup");
        let names: Vec<_> = vols["libs_only"].dirs().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["lib", "lib64"]);
        assert_eq!(vols["libs_only"].mountpoint(), Path::new("/opt/libs"));
    }

    #[test]
    fn resolution_error_still_closes_cache() {
        let catalog = catalog();
        let cache = FakeCache::default();
        let closed = Rc::clone(&cache.closed);

        let err = lookup_with(&catalog, cache, Box::new(BrokenBinaries))
            .lookup(Path::new("/prefix"))
            .unwrap_err();
        assert!(matches!(err, GpuvolError::Io { .. }));
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn close_error_surfaces_when_lookup_succeeded() {
        let catalog = catalog();
        let cache = FakeCache {
            fail_close: true,
            ..FakeCache::default()
        };
        let err = lookup_with(&catalog, cache, Box::new(FakeBinaries))
            .lookup(Path::new("/prefix"))
            .unwrap_err();
        assert!(matches!(err, GpuvolError::Command { .. }));
    }

    #[test]
    fn first_error_wins_over_close_error() {
        let catalog = catalog();
        let cache = FakeCache {
            fail_close: true,
            ..FakeCache::default()
        };
        let err = lookup_with(&catalog, cache, Box::new(BrokenBinaries))
            .lookup(Path::new("/prefix"))
            .unwrap_err();
        assert!(matches!(err, GpuvolError::Io { .. }));
    }

    #[test]
    fn driver_error_skips_cache() {
        struct NoDriver;
        impl DriverVersionSource for NoDriver {
            fn driver_version(&self) -> Result<String> {
                Err(GpuvolError::NotFound {
                    kind: "driver version",
                    id: "/proc/driver/nvidia/version".into(),
                })
            }
        }

        let catalog = catalog();
        let cache = FakeCache::default();
        let opened = Rc::clone(&cache.opened);
        let lookup = lookup_with(&catalog, cache, Box::new(FakeBinaries)).with_driver(Box::new(NoDriver));
        assert!(lookup.lookup(Path::new("/prefix")).is_err());
        assert_eq!(opened.get(), 0);
    }
}
