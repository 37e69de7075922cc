//! Create wallet command.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use satchel_core::{Destination, Keypair};
use satchel_storage::Database;
use satchel_wallet::flags::{CLIENT_VERSION, FEATURE_LATEST, WALLET_FLAG_KEY_ORIGIN_METADATA};
use satchel_wallet::records::{KeyOriginInfo, HARDENED};
use satchel_wallet::{verify_environment, HdChain, KeyMetadata, WalletBatch};
use std::path::Path;

#[derive(Args)]
pub struct CreateArgs {
    /// Label for the first receiving key
    #[arg(short, long, default_value = "default")]
    label: String,
}

pub fn run(wallet: &Path, args: CreateArgs) -> Result<()> {
    println!("{}", "Creating wallet store...".bold().cyan());
    println!();

    let env = verify_environment(wallet);
    if let Some(error) = env.error {
        bail!(error);
    }
    if wallet.exists() {
        bail!("{} already exists", wallet.display());
    }

    let db = Database::open(wallet)
        .with_context(|| format!("Failed to create wallet store: {}", wallet.display()))?;
    println!("{}  Created store directory", "✓".green().bold());

    let now = chrono::Utc::now().timestamp();
    let seed = Keypair::generate();
    let mut chain = HdChain::new(seed.id());

    let mut seed_meta = KeyMetadata::new(now);
    seed_meta.hd_keypath = "s".into();
    seed_meta.hd_seed_id = seed.id();

    let receive = Keypair::generate();
    let index = chain.next_index(false);
    let mut receive_meta = KeyMetadata::new(now);
    receive_meta.hd_keypath = format!("m/0'/0'/{}'", index);
    receive_meta.hd_seed_id = seed.id();
    receive_meta.key_origin = KeyOriginInfo {
        fingerprint: fingerprint(&seed),
        path: vec![HARDENED, HARDENED, index | HARDENED],
    };
    receive_meta.has_key_origin = true;
    let dest = Destination::KeyHash(receive.id());

    let mut batch = WalletBatch::new(&db);
    batch
        .atomically(|b| {
            b.write_min_version(FEATURE_LATEST)?;
            b.write_version(CLIENT_VERSION)?;
            b.write_wallet_flags(WALLET_FLAG_KEY_ORIGIN_METADATA)?;
            b.write_key(&seed.public_key(), &seed.private_key(), &seed_meta)?;
            b.write_key(&receive.public_key(), &receive.private_key(), &receive_meta)?;
            b.write_hd_chain(&chain)?;
            b.write_name(&dest, &args.label)?;
            b.write_purpose(&dest, "receive")
        })
        .with_context(|| "Failed to write initial wallet records")?;
    batch.flush()?;
    batch.close()?;

    println!("{}  Generated HD seed", "✓".green().bold());
    println!("    Seed id: {}", seed.id().to_hex().bright_yellow());
    println!("{}  Generated receiving key", "✓".green().bold());
    println!("    Key id:  {}", receive.id().to_hex().bright_yellow());
    println!("    Path:    {}", receive_meta.hd_keypath.bright_cyan());
    println!("    Label:   {}", args.label);

    println!();
    println!("{}", "Wallet created successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  • Use {} to inspect it", "satchel info".bright_cyan());
    println!("  • Use {} to check it", "satchel verify".bright_cyan());

    Ok(())
}

fn fingerprint(seed: &Keypair) -> [u8; 4] {
    let id = seed.id();
    let bytes: &[u8] = id.as_ref();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}
