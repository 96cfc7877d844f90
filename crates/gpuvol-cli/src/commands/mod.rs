//! CLI command definitions and dispatch.

pub mod create;
pub mod exists;
pub mod list;
pub mod remove;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gpuvol_common::config::GpuvolConfig;
use gpuvol_core::catalog::{Catalog, VolumeInfo};
use gpuvol_core::driver::{DriverVersionSource, ProcDriverVersion, StaticDriverVersion};
use gpuvol_core::VolumeLookup;

/// gpuvol — GPU driver volumes for containers.
#[derive(Parser, Debug)]
#[command(name = "gpuvol", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file.
    #[arg(long, global = true, env = "GPUVOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the volume trees.
    #[arg(long, global = true, env = "GPUVOL_PREFIX")]
    pub prefix: Option<PathBuf>,

    /// JSON catalog replacing the built-in volume definitions.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Driver version to use instead of querying the kernel module.
    #[arg(long, global = true)]
    pub driver_version: Option<String>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve volumes and print the host files they would contain.
    List(list::ListArgs),
    /// Build volume trees for the current driver.
    Create(create::CreateArgs),
    /// Delete a volume version.
    Remove(remove::RemoveArgs),
    /// Report whether a volume is built for the current driver.
    Exists(exists::ExistsArgs),
}

/// Effective configuration and catalog shared by all commands.
#[derive(Debug)]
pub struct Context {
    /// Merged configuration (file, then flags).
    pub config: GpuvolConfig,
    /// Volume definitions.
    pub catalog: Catalog,
}

impl Context {
    /// Merges the configuration file with command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or catalog cannot be loaded.
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => GpuvolConfig::from_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => GpuvolConfig::default(),
        };
        if let Some(prefix) = &cli.prefix {
            config.prefix.clone_from(prefix);
        }
        if let Some(catalog) = &cli.catalog {
            config.catalog = Some(catalog.clone());
        }
        if let Some(version) = &cli.driver_version {
            config.driver_version = Some(version.clone());
        }

        let catalog = match &config.catalog {
            Some(path) => Catalog::from_file(path)
                .with_context(|| format!("loading catalog {}", path.display()))?,
            None => Catalog::nvidia(),
        };
        tracing::debug!(prefix = %config.prefix.display(), volumes = catalog.volumes.len(), "configuration loaded");
        Ok(Self { config, catalog })
    }

    fn driver(&self) -> Box<dyn DriverVersionSource> {
        match &self.config.driver_version {
            Some(version) => Box::new(StaticDriverVersion(version.clone())),
            None => Box::new(ProcDriverVersion::new()),
        }
    }

    /// Host lookup honoring the driver version override.
    pub fn lookup(&self) -> VolumeLookup<'_> {
        VolumeLookup::host(&self.catalog).with_driver(self.driver())
    }

    /// Driver version from the override or the kernel module.
    ///
    /// # Errors
    ///
    /// Returns an error if the version cannot be determined.
    pub fn driver_version(&self) -> anyhow::Result<String> {
        Ok(self.driver().driver_version()?)
    }

    /// Catalog entry called `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog has no such volume.
    pub fn volume_info(&self, name: &str) -> anyhow::Result<&VolumeInfo> {
        self.catalog
            .get(name)
            .with_context(|| format!("unknown volume `{name}`"))
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::from_cli(&cli)?;
    match cli.command {
        Command::List(args) => list::execute(&ctx, &args),
        Command::Create(args) => create::execute(&ctx, &args),
        Command::Remove(args) => remove::execute(&ctx, &args),
        Command::Exists(args) => exists::execute(&ctx, &args),
    }
}
