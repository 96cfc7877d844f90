//! Synthetic ELF objects for tests.

use std::path::Path;

use object::Endianness;
use object::elf::{
    DT_NEEDED, DT_NULL, DT_SONAME, EM_386, EM_PPC, EM_PPC64, EM_X86_64, ET_DYN, SHF_ALLOC, SHT_NOTE,
};
use object::write::elf::{FileHeader, SectionHeader, Writer};

/// Writes minimal shared objects carrying exactly the metadata the volume
/// builder reads.
#[derive(Debug, Clone)]
pub struct ElfBuilder {
    elf32: bool,
    endian: Endianness,
    needed: Vec<String>,
    soname: Option<String>,
    abi_tag: Option<[u32; 4]>,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self {
            elf32: false,
            endian: Endianness::Little,
            needed: Vec::new(),
            soname: None,
            abi_tag: None,
        }
    }
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elf32(mut self) -> Self {
        self.elf32 = true;
        self
    }

    pub fn endian(mut self, endian: Endianness) -> Self {
        self.endian = endian;
        self
    }

    pub fn needed(mut self, lib: &str) -> Self {
        self.needed.push(lib.to_owned());
        self
    }

    pub fn soname(mut self, soname: &str) -> Self {
        self.soname = Some(soname.to_owned());
        self
    }

    pub fn abi_tag(mut self, os: u32, major: u32, minor: u32, patch: u32) -> Self {
        self.abi_tag = Some([os, major, minor, patch]);
        self
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write synthetic ELF");
    }

    pub fn build(&self) -> Vec<u8> {
        let note = self.abi_tag.map(|desc| self.abi_note(desc));
        let machine = match (self.elf32, self.endian) {
            (false, Endianness::Little) => EM_X86_64,
            (true, Endianness::Little) => EM_386,
            (false, Endianness::Big) => EM_PPC64,
            (true, Endianness::Big) => EM_PPC,
        };

        let mut out = Vec::new();
        let mut writer = Writer::new(self.endian, !self.elf32, &mut out);

        let needed: Vec<_> = self
            .needed
            .iter()
            .map(|lib| writer.add_dynamic_string(lib.as_bytes()))
            .collect();
        let soname = self
            .soname
            .as_ref()
            .map(|name| writer.add_dynamic_string(name.as_bytes()));

        writer.reserve_file_header();
        let _ = writer.reserve_null_section_index();
        let _ = writer.reserve_dynstr_section_index();
        let _ = writer.reserve_dynamic_section_index();
        let note_name = note
            .as_ref()
            .map(|_| (writer.add_section_name(b".note.ABI-tag"), writer.reserve_section_index()));
        let _ = writer.reserve_shstrtab_section_index();

        let _ = writer.reserve_dynstr();
        let _ = writer.reserve_dynamic(needed.len() + usize::from(soname.is_some()) + 1);
        let note_offset = note.as_ref().map(|bytes| writer.reserve(bytes.len(), 4));
        writer.reserve_shstrtab();
        writer.reserve_section_headers();

        writer
            .write_file_header(&FileHeader {
                os_abi: 0,
                abi_version: 0,
                e_type: ET_DYN,
                e_machine: machine,
                e_entry: 0,
                e_flags: 0,
            })
            .expect("file header");
        writer.write_dynstr();
        writer.write_align_dynamic();
        for id in needed {
            writer.write_dynamic_string(DT_NEEDED, id);
        }
        if let Some(id) = soname {
            writer.write_dynamic_string(DT_SONAME, id);
        }
        writer.write_dynamic(DT_NULL, 0);
        if let Some(bytes) = &note {
            writer.write_align(4);
            writer.write(bytes);
        }
        writer.write_shstrtab();

        writer.write_null_section_header();
        writer.write_dynstr_section_header(0);
        writer.write_dynamic_section_header(0);
        if let (Some(bytes), Some((name, _)), Some(offset)) = (&note, note_name, note_offset) {
            writer.write_section_header(&SectionHeader {
                name: Some(name),
                sh_type: SHT_NOTE,
                sh_flags: u64::from(SHF_ALLOC),
                sh_addr: 0,
                sh_offset: offset as u64,
                sh_size: bytes.len() as u64,
                sh_link: 0,
                sh_info: 0,
                sh_addralign: 4,
                sh_entsize: 0,
            });
        }
        writer.write_shstrtab_section_header();

        out
    }

    /// `NT_GNU_ABI_TAG` note: namesz, descsz, type, "GNU\0", descriptor.
    fn abi_note(&self, desc: [u32; 4]) -> Vec<u8> {
        let word = |w: u32| match self.endian {
            Endianness::Little => w.to_le_bytes(),
            Endianness::Big => w.to_be_bytes(),
        };
        let mut note = Vec::new();
        for w in [4, 16, 1] {
            note.extend_from_slice(&word(w));
        }
        note.extend_from_slice(b"GNU\0");
        for w in desc {
            note.extend_from_slice(&word(w));
        }
        note
    }
}
