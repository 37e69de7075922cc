//! CLI commands module.

use anyhow::Result;
use clap::Subcommand;
use std::path::Path;

mod create;
mod dump;
mod info;
mod salvage;
mod verify;
mod zaptx;

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new wallet store
    Create(create::CreateArgs),
    /// Load the wallet and print a summary
    Info,
    /// Print every record as a JSON line
    Dump(dump::DumpArgs),
    /// Check the store location and contents
    Verify,
    /// Copy readable records into a backup store
    Salvage(salvage::SalvageArgs),
    /// Erase stored transactions
    Zaptx(zaptx::ZapArgs),
}

pub fn run(cmd: Commands, wallet: &Path) -> Result<()> {
    match cmd {
        Commands::Create(args) => create::run(wallet, args),
        Commands::Info => info::run(wallet),
        Commands::Dump(args) => dump::run(wallet, args),
        Commands::Verify => verify::run(wallet),
        Commands::Salvage(args) => salvage::run(wallet, args),
        Commands::Zaptx(args) => zaptx::run(wallet, args),
    }
}

/// Colored one-word rendering of a load outcome.
pub(crate) fn status_label(status: satchel_wallet::DbStatus) -> colored::ColoredString {
    use colored::Colorize;
    use satchel_wallet::DbStatus;

    let text = status.to_string();
    match status {
        DbStatus::LoadOk => text.green().bold(),
        DbStatus::NoncriticalError | DbStatus::NeedRewrite => text.yellow().bold(),
        _ => text.red().bold(),
    }
}
