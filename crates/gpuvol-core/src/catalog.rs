//! Definitions of the volumes gpuvol knows how to build.
//!
//! Entries are name fragments (`libcuda.so`), not file names: the resolvers
//! match them against installed files carrying version suffixes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gpuvol_common::constants::{COMPONENT_BINARIES, COMPONENT_LIBRARIES};
use gpuvol_common::error::{GpuvolError, Result};
use serde::{Deserialize, Serialize};

/// Static description of one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    /// Unique volume name; also the directory name under the prefix.
    pub name: String,
    /// Where the volume is mounted inside containers.
    pub mountpoint: PathBuf,
    /// Category label (`binaries`, `libraries`) to ordered name fragments.
    /// Unknown labels are carried but never resolved.
    pub components: BTreeMap<String, Vec<String>>,
}

impl VolumeInfo {
    /// Name fragments listed under `category`.
    pub fn component(&self, category: &str) -> &[String] {
        self.components.get(category).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Ordered, immutable set of volume definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// Volume definitions in declaration order.
    pub volumes: Vec<VolumeInfo>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::nvidia()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl Catalog {
    /// Wraps a list of definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if two definitions share a name or a mountpoint is
    /// not absolute.
    pub fn new(volumes: Vec<VolumeInfo>) -> Result<Self> {
        let catalog = Self { volumes };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for (i, vol) in self.volumes.iter().enumerate() {
            if self.volumes[..i].iter().any(|v| v.name == vol.name) {
                return Err(GpuvolError::Config {
                    message: format!("duplicate volume `{}` in catalog", vol.name),
                });
            }
            if !vol.mountpoint.is_absolute() {
                return Err(GpuvolError::Config {
                    message: format!(
                        "volume `{}` mountpoint {} is not absolute",
                        vol.name,
                        vol.mountpoint.display()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Parses a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Loads a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GpuvolError::io(path, e))?;
        Self::from_json(&content)
    }

    /// Looks up a definition by name.
    pub fn get(&self, name: &str) -> Option<&VolumeInfo> {
        self.volumes.iter().find(|v| v.name == name)
    }

    /// Iterates definitions in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, VolumeInfo> {
        self.volumes.iter()
    }

    /// The built-in NVIDIA driver catalog.
    pub fn nvidia() -> Self {
        let binaries = strings(&[
            "nvidia-cuda-mps-control", // Multi process service CLI
            "nvidia-cuda-mps-server",  // Multi process service server
            "nvidia-debugdump",        // GPU coredump utility
            "nvidia-persistenced",     // Persistence mode utility
            "nvidia-smi",              // System management interface
        ]);

        // X11 pieces (libnvidia-cfg, -gtk2, -gtk3, -wfb, libglx) are only
        // used by host-side tools and stay out.
        let libraries = strings(&[
            // Compute
            "libnvidia-ml.so",
            "libcuda.so",
            "libnvidia-ptxjitcompiler.so",
            "libnvidia-fatbinaryloader.so",
            "libnvidia-opencl.so",
            "libnvidia-compiler.so",
            // Video
            "libvdpau_nvidia.so",
            "libnvidia-encode.so",
            "libnvcuvid.so",
            "libnvidia-fbc.so",
            "libnvidia-ifr.so",
            // Graphics: GLVND loaders and legacy libraries share names, the
            // blacklist keeps only the NVIDIA variants.
            "libGL.so",
            "libGLX.so",
            "libOpenGL.so",
            "libGLESv1_CM.so",
            "libGLESv2.so",
            "libEGL.so",
            "libGLdispatch.so",
            // GLVND vendor libraries
            "libGLX_nvidia.so",
            "libEGL_nvidia.so",
            "libGLESv2_nvidia.so",
            "libGLESv1_CM_nvidia.so",
            "libnvidia-eglcore.so",
            "libnvidia-glcore.so",
            "libnvidia-tls.so",
            "libnvidia-glsi.so",
        ]);

        Self {
            volumes: vec![VolumeInfo {
                name: "nvidia_driver".into(),
                mountpoint: PathBuf::from("/usr/local/nvidia"),
                components: BTreeMap::from([
                    (COMPONENT_BINARIES.to_owned(), binaries),
                    (COMPONENT_LIBRARIES.to_owned(), libraries),
                ]),
            }],
        }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a VolumeInfo;
    type IntoIter = std::slice::Iter<'a, VolumeInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
