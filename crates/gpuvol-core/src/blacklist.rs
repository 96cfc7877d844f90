//! Rejection of foreign or incompatible library variants.
//!
//! Several libraries share a file name across vendors (`libGL.so.1` may
//! come from Mesa or from GLVND) or across ABI generations
//! (`libnvidia-tls`). Only the variants wired to the NVIDIA implementation
//! and built for the current TLS ABI may enter a volume.

use std::path::Path;
use std::sync::LazyLock;

use gpuvol_common::error::{GpuvolError, Result};
use regex::Regex;

use crate::elf::ElfFile;

/// ABI-tag fingerprint accepted for `libnvidia-tls` (minor 3, patch 99,
/// i.e. the 2.3.99 ABI). Fixed compatibility constant, compared for
/// equality only.
pub const TLS_ABI: u64 = 0x63_0000_0003;

const ABI_TAG_SECTION: &str = ".note.ABI-tag";

/// Offset of the second quad-word of the note descriptor.
const ABI_TAG_OFFSET: usize = 24;

#[allow(clippy::expect_used)]
static LIBRARY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^lib([A-Za-z0-9_-]+)\.so[0-9.]*$").expect("valid regex"));
#[allow(clippy::expect_used)]
static GL_CORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"libnvidia-e?glcore\.so").expect("valid regex"));
#[allow(clippy::expect_used)]
static GL_DISPATCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"libGLdispatch\.so").expect("valid regex"));

/// Extracts `<name>` from a `lib<name>.so[.<version>]` file name.
pub fn library_stem(file_name: &str) -> Option<&str> {
    LIBRARY_NAME
        .captures(file_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Decides whether the object at `path` must be left out of a volume.
///
/// # Errors
///
/// Returns an error if metadata required by a rule cannot be read.
pub fn is_blacklisted(path: &Path, obj: &ElfFile) -> Result<bool> {
    let Some(stem) = path.file_name().and_then(|n| n.to_str()).and_then(library_stem) else {
        return Ok(false);
    };

    match stem {
        "GL" | "GLESv1_CM" | "GLESv2" => Ok(is_foreign_gl(&obj.needed()?)),
        "nvidia-tls" => {
            let note = obj.section_data(ABI_TAG_SECTION)?;
            is_legacy_tls(note).map_err(|message| GpuvolError::elf(path, message))
        }
        _ => Ok(false),
    }
}

/// A GL/GLES library is foreign unless it depends on the NVIDIA GL core or
/// on the GLVND dispatcher.
pub fn is_foreign_gl<S: AsRef<str>>(needed: &[S]) -> bool {
    !needed.iter().any(|dep| {
        let dep = dep.as_ref();
        GL_CORE.is_match(dep) || GL_DISPATCH.is_match(dep)
    })
}

/// A TLS library is legacy unless its ABI-tag note carries [`TLS_ABI`].
///
/// # Errors
///
/// Returns a description of the problem if the note is too short.
pub fn is_legacy_tls(note: &[u8]) -> std::result::Result<bool, String> {
    let word: [u8; 8] = note
        .get(ABI_TAG_OFFSET..ABI_TAG_OFFSET + 8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| format!("{ABI_TAG_SECTION} is only {} bytes", note.len()))?;
    Ok(u64::from_le_bytes(word) != TLS_ABI)
}
