//! Raw record dump command.

use anyhow::{bail, Context, Result};
use clap::Args;
use satchel_storage::Database;
use satchel_wallet::parse_tag;
use std::path::Path;

#[derive(Args)]
pub struct DumpArgs {
    /// Only dump records with this tag
    #[arg(short, long)]
    tag: Option<String>,
}

pub fn run(wallet: &Path, args: DumpArgs) -> Result<()> {
    if !wallet.exists() {
        bail!("no wallet store at {}", wallet.display());
    }
    let db = Database::open(wallet)
        .with_context(|| format!("Failed to open wallet store: {}", wallet.display()))?;

    for item in db.iter() {
        let (key, value) = item.with_context(|| "Store scan failed")?;
        let tag = parse_tag(&key);
        if args.tag.is_some() && tag != args.tag {
            continue;
        }
        let line = serde_json::json!({
            "tag": tag,
            "key": hex::encode(&key),
            "value": hex::encode(&value),
        });
        println!("{}", line);
    }
    Ok(())
}
