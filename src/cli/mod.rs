//! Command-line interface wiring for the `bulkdeck` binary.
//!
//! This module owns the clap definitions and delegates execution to one
//! submodule per command.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod check;
pub mod common;
pub mod convert;
pub mod hash;
pub mod info;
pub mod logger;
pub mod utils;

/// Parsed CLI entrypoint for the `bulkdeck` binary.
#[derive(Parser, Debug)]
#[command(name = "bulkdeck", version, about = "Read, check and rewrite bulk data decks")]
pub struct Cli {
    /// Log debug events as well.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with [read] and [write] options; flags override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count the entities of a deck by keyword.
    Info(info::InfoArgs),
    /// Read a deck and write it back in another layout.
    Convert(convert::ConvertArgs),
    /// Cross-reference a deck and list dangling references.
    Check(check::CheckArgs),
    /// Print the digest of each deck's canonical form.
    Hash(hash::HashArgs),
}

/// Execute the requested command.
pub fn run(cli: Cli) -> Result<()> {
    let config = utils::load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Info(args) => info::handle(args, config),
        Command::Convert(args) => convert::handle(args, config),
        Command::Check(args) => check::handle(args, config),
        Command::Hash(args) => hash::handle(args, config),
    }
}
