//! `bulkdeck info`: entity counts per keyword.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bulkdeck::DeckConfig;
use clap::Args;

use crate::cli::utils::read_model;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Deck file to inspect.
    pub deck: PathBuf,
    /// Print the statistics as JSON.
    #[arg(long)]
    pub json: bool,
    /// Read the deck as bulk data only.
    #[arg(long)]
    pub punch: bool,
}

pub fn handle(args: InfoArgs, config: DeckConfig) -> Result<()> {
    let mut options = config.read.with_xref(None);
    if args.punch {
        options = options.with_punch(true);
    }
    let model = read_model(&args.deck, &options)?;
    let stats = model.stats();

    if args.json {
        let text = serde_json::to_string_pretty(&stats).context("failed to serialize statistics")?;
        println!("{text}");
        return Ok(());
    }

    println!("Deck: {}", args.deck.display());
    println!("Mode: {}", if stats.punch { "punch" } else { "full" });
    println!("Entities: {}", stats.total());
    for (keyword, count) in &stats.entities {
        println!("  {keyword:<8} {count:>8}");
    }
    if !stats.rejected.is_empty() {
        println!("Rejected cards:");
        for (keyword, count) in &stats.rejected {
            println!("  {keyword:<8} {count:>8}");
        }
    }
    println!("ENDDATA: {}", if stats.enddata { "yes" } else { "no" });
    Ok(())
}
