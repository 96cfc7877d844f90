//! Domain primitive types used across the gpuvol workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GpuvolError;

/// How files are duplicated from the host into a volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneMode {
    /// Hard link only; fails across filesystems.
    #[default]
    Link,
    /// Hard link, falling back to a full copy.
    Copy,
}

impl fmt::Display for CloneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "link"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

impl FromStr for CloneMode {
    type Err = GpuvolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link" => Ok(Self::Link),
            "copy" => Ok(Self::Copy),
            other => Err(GpuvolError::Config {
                message: format!("unknown clone mode `{other}` (expected link or copy)"),
            }),
        }
    }
}

/// Machine word size a library was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordSize {
    /// 32-bit objects, installed under `lib`.
    Bits32,
    /// 64-bit objects, installed under `lib64`.
    Bits64,
}

impl fmt::Display for WordSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bits32 => write!(f, "32-bit"),
            Self::Bits64 => write!(f, "64-bit"),
        }
    }
}
