//! `gpuvol exists` — Report whether a volume is built.

use clap::Args;
use gpuvol_core::Volume;

use super::Context;

/// Arguments for the `exists` command.
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Volume name.
    pub name: String,
}

/// Executes the `exists` command.
///
/// # Errors
///
/// Returns an error if the volume is unknown or cannot be inspected.
pub fn execute(ctx: &Context, args: &ExistsArgs) -> anyhow::Result<()> {
    let info = ctx.volume_info(&args.name)?;
    let vol = Volume::new(info, ctx.config.prefix.join(&info.name), ctx.driver_version()?);
    println!("{}", vol.exists()?);
    Ok(())
}
