//! Verify command.

use anyhow::{bail, Result};
use colored::Colorize;
use satchel_wallet::{verify_database_file, verify_environment, Verification};
use std::path::Path;

pub fn run(wallet: &Path) -> Result<()> {
    println!("{}", "Verifying wallet store...".bold().cyan());
    println!();

    let env = verify_environment(wallet);
    report("Environment", &env);
    if let Some(error) = env.error {
        bail!(error);
    }

    let file = verify_database_file(wallet);
    report("Records", &file);
    if let Some(error) = file.error {
        bail!(error);
    }

    println!();
    println!("{}", "Wallet store verified.".green().bold());
    Ok(())
}

fn report(stage: &str, result: &Verification) {
    let mark = if result.is_ok() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{}  {}", mark, stage);
    for warning in &result.warnings {
        println!("    {} {}", "warning:".yellow(), warning);
    }
    if let Some(error) = &result.error {
        println!("    {} {}", "error:".red(), error);
    }
}
