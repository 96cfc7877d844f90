//! Dynamic linker cache lookups backed by `ldconfig -p`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use gpuvol_common::constants::LDCONFIG_FALLBACK;
use gpuvol_common::error::{GpuvolError, Result};
use gpuvol_common::types::WordSize;

use super::{LibraryCache, LibraryCacheSource, LibraryPaths};

/// Architecture tags `ldconfig` prints for 64-bit libraries.
const WIDE_ARCHES: &[&str] = &["x86-64", "64bit", "AArch64", "IA-64", "N64"];

/// One library known to the linker cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Library file name as recorded in the cache (usually the SONAME).
    pub name: String,
    /// Word size the library was built for.
    pub word_size: WordSize,
    /// Path the cache points at; may be a symlink.
    pub path: PathBuf,
}

/// Classifies the flag field of an `ldconfig -p` line, e.g. `libc6,x86-64`.
fn word_size(flags: &str) -> Option<WordSize> {
    let flags = flags.split(", ").next().unwrap_or_default();
    let mut parts = flags.split(',');
    let _kind = parts.next()?;
    let arches: Vec<&str> = parts.collect();
    if arches.iter().any(|a| WIDE_ARCHES.contains(a)) {
        Some(WordSize::Bits64)
    } else if arches.is_empty() {
        Some(WordSize::Bits32)
    } else {
        None
    }
}

/// Parses one `\tname (flags) => path` line.
fn parse_line(line: &str) -> Option<CacheEntry> {
    let (lhs, path) = line.trim().split_once(" => ")?;
    let (name, flags) = lhs.split_once(" (")?;
    let word_size = word_size(flags.strip_suffix(')')?)?;
    Some(CacheEntry {
        name: name.to_owned(),
        word_size,
        path: PathBuf::from(path),
    })
}

/// Parses the full output of `ldconfig -p`, skipping header, footer and
/// entries for ABIs other than plain 32/64-bit.
pub fn parse_ldconfig_output(output: &str) -> Vec<CacheEntry> {
    output.lines().filter_map(parse_line).collect()
}

/// Snapshot of the linker cache taken when the handle was opened.
#[derive(Debug, Clone, Default)]
pub struct LdconfigCache {
    entries: Vec<CacheEntry>,
}

impl LdconfigCache {
    /// Wraps already-parsed entries.
    pub const fn from_entries(entries: Vec<CacheEntry>) -> Self {
        Self { entries }
    }
}

impl LibraryCache for LdconfigCache {
    fn lookup(&self, names: &[String]) -> LibraryPaths {
        let mut seen = HashSet::new();
        let mut paths = LibraryPaths::default();

        for entry in &self.entries {
            if !names.iter().any(|n| entry.name.starts_with(n.as_str())) {
                continue;
            }
            let real = match std::fs::canonicalize(&entry.path) {
                Ok(real) => real,
                Err(e) => {
                    tracing::debug!(path = %entry.path.display(), error = %e, "skipping dangling cache entry");
                    continue;
                }
            };
            if !seen.insert(real.clone()) {
                continue;
            }
            match entry.word_size {
                WordSize::Bits32 => paths.lib32.push(real),
                WordSize::Bits64 => paths.lib64.push(real),
            }
        }

        tracing::debug!(
            lib32 = paths.lib32.len(),
            lib64 = paths.lib64.len(),
            "linker cache lookup"
        );
        paths
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Opens [`LdconfigCache`] snapshots by running `ldconfig -p`.
#[derive(Debug, Clone, Default)]
pub struct LdconfigSource {
    program: Option<PathBuf>,
}

impl LdconfigSource {
    /// Uses `ldconfig` from `PATH`, or `/sbin/ldconfig`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a specific `ldconfig` binary.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    fn program(&self) -> PathBuf {
        self.program
            .clone()
            .or_else(|| which::which("ldconfig").ok())
            .unwrap_or_else(|| PathBuf::from(LDCONFIG_FALLBACK))
    }
}

fn run_ldconfig(program: &Path) -> Result<String> {
    let output = Command::new(program)
        .arg("-p")
        .output()
        .map_err(|e| GpuvolError::io(program, e))?;
    if !output.status.success() {
        return Err(GpuvolError::Command {
            program: program.display().to_string(),
            message: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl LibraryCacheSource for LdconfigSource {
    fn open(&self) -> Result<Box<dyn LibraryCache>> {
        let program = self.program();
        let entries = parse_ldconfig_output(&run_ldconfig(&program)?);
        tracing::debug!(program = %program.display(), entries = entries.len(), "linker cache opened");
        Ok(Box::new(LdconfigCache::from_entries(entries)))
    }
}
