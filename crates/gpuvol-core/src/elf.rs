//! ELF object inspection.
//!
//! Reads only what volume construction needs: the dynamic section with its
//! linked string table, and raw section contents. Both classes (ELF32 for
//! `lib`, ELF64 for `lib64`) and both byte orders are accepted.

use std::fmt;
use std::path::{Path, PathBuf};

use object::elf::{DT_NEEDED, DT_NULL, DT_SONAME, FileHeader32, FileHeader64};
use object::read::elf::{Dyn, FileHeader, SectionHeader};
use object::{Endianness, FileKind};

use gpuvol_common::error::{GpuvolError, Result};

/// ELF file class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// 32-bit object.
    Elf32,
    /// 64-bit object.
    Elf64,
}

/// An ELF object loaded into memory.
pub struct ElfFile {
    path: PathBuf,
    data: Vec<u8>,
    class: Class,
}

impl fmt::Debug for ElfFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElfFile")
            .field("path", &self.path)
            .field("class", &self.class)
            .field("len", &self.data.len())
            .finish()
    }
}

impl ElfFile {
    /// Reads `path` and checks its file and section headers.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or an ELF error if
    /// it is not a well-formed ELF object.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| GpuvolError::io(path, e))?;

        let class = match FileKind::parse(&*data) {
            Ok(FileKind::Elf32) => Class::Elf32,
            Ok(FileKind::Elf64) => Class::Elf64,
            _ => return Err(GpuvolError::elf(path, "not an ELF object")),
        };

        let elf = Self {
            path: path.to_path_buf(),
            data,
            class,
        };
        let checked = match elf.class {
            Class::Elf32 => check::<FileHeader32<Endianness>>(&elf.data),
            Class::Elf64 => check::<FileHeader64<Endianness>>(&elf.data),
        };
        checked.map_err(|e| elf.error(e))?;
        Ok(elf)
    }

    /// Object class.
    pub const fn class(&self) -> Class {
        self.class
    }

    /// Returns the contents of the section called `name`. `SHT_NOBITS`
    /// sections are empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the section does not exist or lies outside the
    /// file.
    pub fn section_data(&self, name: &str) -> Result<&[u8]> {
        let found = match self.class {
            Class::Elf32 => section::<FileHeader32<Endianness>>(&self.data, name),
            Class::Elf64 => section::<FileHeader64<Endianness>>(&self.data, name),
        };
        found
            .map_err(|e| self.error(e))?
            .ok_or_else(|| GpuvolError::elf(&self.path, format!("missing section {name}")))
    }

    /// Returns the strings referenced by every dynamic entry tagged `tag`.
    ///
    /// Objects without a dynamic section yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the dynamic section or its string table is
    /// malformed.
    pub fn dyn_strings(&self, tag: u32) -> Result<Vec<String>> {
        let strings = match self.class {
            Class::Elf32 => dynamic_strings::<FileHeader32<Endianness>>(&self.data, tag),
            Class::Elf64 => dynamic_strings::<FileHeader64<Endianness>>(&self.data, tag),
        };
        strings.map_err(|e| self.error(e))
    }

    /// Libraries listed as `DT_NEEDED`.
    ///
    /// # Errors
    ///
    /// See [`ElfFile::dyn_strings`].
    pub fn needed(&self) -> Result<Vec<String>> {
        self.dyn_strings(DT_NEEDED)
    }

    /// The object's `DT_SONAME`, if it declares one.
    ///
    /// # Errors
    ///
    /// See [`ElfFile::dyn_strings`].
    pub fn soname(&self) -> Result<Option<String>> {
        Ok(self.dyn_strings(DT_SONAME)?.into_iter().next())
    }

    fn error(&self, err: object::read::Error) -> GpuvolError {
        GpuvolError::elf(&self.path, err.to_string())
    }
}

fn check<Elf: FileHeader<Endian = Endianness>>(data: &[u8]) -> object::read::Result<()> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let _sections = header.sections(endian, data)?;
    Ok(())
}

fn section<'data, Elf: FileHeader<Endian = Endianness>>(
    data: &'data [u8],
    name: &str,
) -> object::read::Result<Option<&'data [u8]>> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let sections = header.sections(endian, data)?;
    sections
        .section_by_name(endian, name.as_bytes())
        .map(|(_, section)| section.data(endian, data))
        .transpose()
}

fn dynamic_strings<Elf: FileHeader<Endian = Endianness>>(
    data: &[u8],
    tag: u32,
) -> object::read::Result<Vec<String>> {
    let header = Elf::parse(data)?;
    let endian = header.endian()?;
    let sections = header.sections(endian, data)?;
    let Some((entries, link)) = sections.dynamic(endian, data)? else {
        return Ok(Vec::new());
    };
    let strings = sections.strings(endian, data, link)?;

    let mut out = Vec::new();
    for entry in entries {
        match entry.tag32(endian) {
            Some(DT_NULL) => break,
            Some(t) if t == tag => {
                let value = entry.string(endian, strings)?;
                out.push(String::from_utf8_lossy(value).into_owned());
            }
            _ => {}
        }
    }
    Ok(out)
}
