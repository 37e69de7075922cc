//! Wallet summary command.

use super::status_label;
use anyhow::{bail, Result};
use colored::Colorize;
use satchel_storage::DatabaseConfig;
use satchel_wallet::flags::{
    WALLET_FLAG_AVOID_REUSE, WALLET_FLAG_BLANK_WALLET, WALLET_FLAG_DESCRIPTORS,
    WALLET_FLAG_DISABLE_PRIVATE_KEYS, WALLET_FLAG_KEY_ORIGIN_METADATA,
};
use satchel_wallet::{open_and_load, WalletState};
use std::path::Path;

const FLAG_NAMES: [(u64, &str); 5] = [
    (WALLET_FLAG_AVOID_REUSE, "avoid_reuse"),
    (WALLET_FLAG_KEY_ORIGIN_METADATA, "key_origin_metadata"),
    (WALLET_FLAG_DISABLE_PRIVATE_KEYS, "disable_private_keys"),
    (WALLET_FLAG_BLANK_WALLET, "blank"),
    (WALLET_FLAG_DESCRIPTORS, "descriptors"),
];

pub fn run(wallet: &Path) -> Result<()> {
    if !wallet.exists() {
        bail!("no wallet store at {}", wallet.display());
    }

    let mut state = WalletState::new();
    let (db, status) = open_and_load(wallet, DatabaseConfig::default(), &mut state);
    let Some(db) = db else {
        bail!("failed to open wallet store at {}", wallet.display());
    };

    println!("{}", "Wallet Information".bold().cyan());
    println!("{}", "─".repeat(60).bright_black());
    println!("  {:<18} {}", "Path:".bold(), wallet.display());
    println!("  {:<18} {}", "Status:".bold(), status_label(status));
    println!("  {:<18} {}", "Records:".bold(), db.len());
    println!("  {:<18} {}", "Client version:".bold(), state.last_client_version);
    println!("  {:<18} {}", "Min version:".bold(), state.min_version);
    println!("  {:<18} {}", "Encrypted:".bold(), state.is_crypted());

    let flags: Vec<&str> = FLAG_NAMES
        .iter()
        .filter(|(bit, _)| state.flags & bit != 0)
        .map(|(_, name)| *name)
        .collect();
    let flags = if flags.is_empty() {
        "none".to_string()
    } else {
        flags.join(", ")
    };
    println!("  {:<18} {}", "Flags:".bold(), flags);

    println!();
    println!("  {:<18} {}", "Keys:".bold(), state.key_count().to_string().bright_green());
    println!("  {:<18} {}", "Scripts:".bold(), state.scripts.len());
    println!("  {:<18} {}", "Watch-only:".bold(), state.watch_only.len());
    println!("  {:<18} {}", "Address book:".bold(), state.address_book.len());
    println!("  {:<18} {}", "Transactions:".bold(), state.transactions.len());
    println!("  {:<18} {}", "Key pool:".bold(), state.key_pool.len());
    println!("  {:<18} {}", "Descriptors:".bold(), state.descriptors.len());

    if let Some(chain) = &state.hd_chain {
        println!();
        println!("{}", "HD Chain".bold().cyan());
        println!("  {:<18} {}", "Version:".bold(), chain.version);
        println!("  {:<18} {}", "Seed id:".bold(), chain.seed_id.to_hex().bright_yellow());
        println!("  {:<18} {}", "External index:".bold(), chain.external_counter);
        println!("  {:<18} {}", "Internal index:".bold(), chain.internal_counter);
    }

    if let Some(tip) = state.best_block.as_ref().and_then(|l| l.tip()) {
        println!();
        println!("  {:<18} {}", "Best block:".bold(), tip.to_hex().bright_yellow());
    }

    Ok(())
}
