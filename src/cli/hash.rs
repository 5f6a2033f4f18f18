//! `bulkdeck hash`: digest of a deck's canonical form.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bulkdeck::{DeckConfig, WriteOptions};
use clap::Args;

use crate::cli::utils::read_model;

#[derive(Args, Debug)]
pub struct HashArgs {
    /// Deck files to hash.
    #[arg(required = true)]
    pub decks: Vec<PathBuf>,
}

pub fn handle(args: HashArgs, config: DeckConfig) -> Result<()> {
    let options = config.read.with_xref(None);
    let canonical = WriteOptions::default();
    for deck in &args.decks {
        let model = read_model(deck, &options)?;
        let digest = model
            .digest(&canonical)
            .with_context(|| format!("failed to hash {}", deck.display()))?;
        println!("{digest}  {}", deck.display());
    }
    Ok(())
}
