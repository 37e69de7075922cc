//! Transaction zap command.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;
use satchel_core::TxId;
use satchel_storage::Database;
use satchel_wallet::WalletBatch;
use std::path::Path;

#[derive(Args)]
pub struct ZapArgs {
    /// Transaction id (hex) to erase; repeat for several. Erases every
    /// transaction when omitted.
    #[arg(short, long = "txid")]
    txids: Vec<String>,
}

pub fn run(wallet: &Path, args: ZapArgs) -> Result<()> {
    if !wallet.exists() {
        bail!("no wallet store at {}", wallet.display());
    }
    let requested = args
        .txids
        .iter()
        .map(|s| TxId::from_hex(s).with_context(|| format!("Invalid transaction id: {}", s)))
        .collect::<Result<Vec<_>>>()?;

    let db = Database::open(wallet)
        .with_context(|| format!("Failed to open wallet store: {}", wallet.display()))?;
    let mut batch = WalletBatch::new(&db);

    if requested.is_empty() {
        let removed = batch
            .zap_wallet_transactions()
            .map_err(|status| anyhow!("zap failed: {}", status))?;
        println!(
            "{}  Erased {} transaction(s)",
            "✓".green().bold(),
            removed.len()
        );
        return Ok(());
    }

    let (removed, not_found) = batch
        .zap_selected_transactions(&requested)
        .map_err(|status| anyhow!("zap failed: {}", status))?;
    for txid in &removed {
        println!("{}  Erased {}", "✓".green().bold(), txid.to_hex().bright_yellow());
    }
    for txid in &not_found {
        println!("{}  Not found {}", "-".yellow().bold(), txid.to_hex().bright_black());
    }
    Ok(())
}
