//! `gpuvol create` — Build volume trees for the current driver.

use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use gpuvol_common::types::CloneMode;
use gpuvol_core::clone::strategy_for;

use super::Context;

/// Arguments for the `create` command.
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Volumes to build (default: every catalog volume).
    pub names: Vec<String>,

    /// Clone mode, overriding the configuration.
    #[arg(long)]
    pub clone: Option<CloneMode>,

    /// Build unversioned trees under this directory instead of the prefix.
    #[arg(long)]
    pub at: Option<PathBuf>,
}

/// Executes the `create` command.
///
/// # Errors
///
/// Returns an error if lookup fails, a name is unknown, or a build fails.
pub fn execute(ctx: &Context, args: &CreateArgs) -> anyhow::Result<()> {
    for name in &args.names {
        let _ = ctx.volume_info(name)?;
    }

    let strategy = strategy_for(args.clone.unwrap_or(ctx.config.clone_mode));
    let mut vols = ctx.lookup().lookup(&ctx.config.prefix)?;

    for (name, vol) in &mut vols {
        if !args.names.is_empty() && !args.names.contains(name) {
            continue;
        }
        match &args.at {
            Some(dir) => {
                let target = dir.join(name);
                if target.exists() {
                    bail!("{} already exists", target.display());
                }
                vol.create_at(target, strategy)?;
            }
            None => {
                if vol.exists()? {
                    tracing::info!(volume = %name, version = %vol.version, "volume already built");
                    println!("{name}: already exists at {}", vol.version_path().display());
                    continue;
                }
                vol.create(strategy)?;
            }
        }
        println!("{name}: created at {}", vol.version_path().display());
    }
    Ok(())
}
