//! # gpuvol-core
//!
//! Builds container-mountable volumes exposing the host GPU driver.
//!
//! This crate provides:
//! - **Catalog**: the table of known volumes and the files they carry.
//! - **Resolvers**: `PATH` lookup for executables and dynamic-linker cache
//!   lookup for shared libraries.
//! - **ELF inspection**: dynamic-section and note reading used to reject
//!   foreign or incompatible library variants.
//! - **Clone strategies**: hard link, or hard link with copy fallback.
//! - **Volumes**: directory tree assembly with SONAME symlinks and
//!   all-or-nothing rollback.
//! - **Lookup**: ties catalog, resolvers and driver version together.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod blacklist;
pub mod catalog;
pub mod clone;
pub mod driver;
pub mod elf;
pub mod lookup;
pub mod resolver;
pub mod volume;

#[cfg(test)]
pub(crate) mod testutil;

pub use catalog::{Catalog, VolumeInfo};
pub use clone::{CloneStrategy, Link, LinkOrCopy};
pub use lookup::VolumeLookup;
pub use volume::{Volume, VolumeMap};
