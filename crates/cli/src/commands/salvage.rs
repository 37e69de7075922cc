//! Salvage command.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use satchel_wallet::{recover, recover_keys_only_filter};
use std::path::Path;

#[derive(Args)]
pub struct SalvageArgs {
    /// Keep only private key material
    #[arg(short, long)]
    keys_only: bool,
}

pub fn run(wallet: &Path, args: SalvageArgs) -> Result<()> {
    println!("{}", "Salvaging wallet records...".bold().cyan());

    let report = if args.keys_only {
        recover(wallet, recover_keys_only_filter)
    } else {
        recover(wallet, |_, _| true)
    }
    .with_context(|| format!("Salvage of {} failed", wallet.display()))?;

    println!();
    println!("{}  Wrote backup store", "✓".green().bold());
    println!(
        "    Path:    {}",
        report.backup_path.display().to_string().bright_black()
    );
    println!("    Kept:    {}", report.kept.to_string().bright_green());
    println!("    Dropped: {}", report.dropped);
    for warning in &report.warnings {
        println!("    {} {}", "warning:".yellow(), warning);
    }
    Ok(())
}
