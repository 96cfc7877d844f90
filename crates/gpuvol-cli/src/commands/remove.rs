//! `gpuvol remove` — Delete a volume version.

use clap::Args;
use gpuvol_core::Volume;

use super::Context;

/// Arguments for the `remove` command.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Volume name.
    pub name: String,

    /// Version to delete (default: the current driver version).
    #[arg(long)]
    pub version: Option<String>,
}

/// Executes the `remove` command.
///
/// # Errors
///
/// Returns an error if the volume is unknown or deletion fails.
pub fn execute(ctx: &Context, args: &RemoveArgs) -> anyhow::Result<()> {
    let info = ctx.volume_info(&args.name)?;
    let version = match &args.version {
        Some(version) => version.clone(),
        None => ctx.driver_version()?,
    };

    let vol = Volume::new(info, ctx.config.prefix.join(&info.name), version);
    vol.remove(None)?;
    println!("{}: removed {}", vol.name(), vol.version_path().display());
    Ok(())
}
