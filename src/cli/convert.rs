//! `bulkdeck convert`: read a deck and write it back.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bulkdeck::{DeckConfig, Precision};
use clap::Args;

use crate::cli::common::{EnddataArg, OrderArg, SizeArg};
use crate::cli::utils::{is_stdout, read_model, write_output};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Source deck.
    pub deck: PathBuf,
    /// Output file path (`-` for stdout).
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Field layout of the written cards.
    #[arg(long, value_enum)]
    pub size: Option<SizeArg>,
    /// Card ordering.
    #[arg(long, value_enum)]
    pub order: Option<OrderArg>,
    /// Write reals in double precision (implies large fields).
    #[arg(long)]
    pub double: bool,
    /// ENDDATA handling.
    #[arg(long, value_enum)]
    pub enddata: Option<EnddataArg>,
    /// Skip cross-referencing.
    #[arg(long)]
    pub no_xref: bool,
}

pub fn handle(args: ConvertArgs, config: DeckConfig) -> Result<()> {
    let mut read = config.read;
    if args.no_xref {
        read = read.with_xref(None);
    }
    let mut write = config.write;
    if let Some(size) = args.size {
        write = write.with_field_width(size.into());
    }
    if let Some(order) = args.order {
        write = write.with_order(order.into());
    }
    if args.double {
        write = write.with_precision(Precision::Double);
    }
    if let Some(enddata) = args.enddata {
        write = write.with_enddata(enddata.into());
    }

    let model = read_model(&args.deck, &read)?;
    if is_stdout(&args.output) {
        let text = model.write(&write).context("failed to write deck to stdout")?;
        let bytes = write
            .encoding
            .encode(&text)
            .with_context(|| format!("failed to encode deck as {}", write.encoding))?;
        return write_output(&args.output, &bytes);
    }
    model
        .write_file(&args.output, &write)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "Converted {} entities from {} -> {} ({} fields)",
        model.entity_count(),
        args.deck.display(),
        args.output.display(),
        write.card_format().width
    );
    Ok(())
}
