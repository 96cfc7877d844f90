//! `gpuvol list` — Resolve volumes and print their host files.

use clap::Args;

use super::Context;
use crate::output::{VolumeSummary, format_volume};

/// Arguments for the `list` command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of a listing.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `list` command.
///
/// # Errors
///
/// Returns an error if volume lookup fails.
pub fn execute(ctx: &Context, args: &ListArgs) -> anyhow::Result<()> {
    let vols = ctx.lookup().lookup(&ctx.config.prefix)?;
    let summaries: Vec<VolumeSummary> = vols.values().map(VolumeSummary::from).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            print!("{}", format_volume(summary));
        }
    }
    Ok(())
}
