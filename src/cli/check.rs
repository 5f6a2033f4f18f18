//! `bulkdeck check`: lenient cross-referencing with a report.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bulkdeck::{DeckConfig, XrefMode};
use clap::Args;

use crate::cli::utils::read_model;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Deck file to check.
    pub deck: PathBuf,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn handle(args: CheckArgs, config: DeckConfig) -> Result<()> {
    let options = config.read.with_xref(Some(XrefMode::Lenient));
    let model = read_model(&args.deck, &options)?;
    let report = model.xref_report().cloned().unwrap_or_default();

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{text}");
    } else {
        println!("Deck: {}", args.deck.display());
        println!("Resolved references: {}", report.resolved);
        for dangling in &report.dangling {
            println!("  {dangling}");
        }
    }
    if !report.is_clean() {
        bail!("{} dangling references in {}", report.dangling.len(), args.deck.display());
    }
    Ok(())
}
