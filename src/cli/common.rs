//! Shared clap helper types for CLI commands.

use bulkdeck::{CardOrder, FieldWidth, TerminatorPolicy};
use clap::ValueEnum;

/// Field layout of written cards.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SizeArg {
    Small,
    Large,
    Free,
}

impl From<SizeArg> for FieldWidth {
    fn from(value: SizeArg) -> FieldWidth {
        match value {
            SizeArg::Small => FieldWidth::Small,
            SizeArg::Large => FieldWidth::Large,
            SizeArg::Free => FieldWidth::Free,
        }
    }
}

/// Card ordering of written decks.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OrderArg {
    Grouped,
    Interspersed,
}

impl From<OrderArg> for CardOrder {
    fn from(value: OrderArg) -> CardOrder {
        match value {
            OrderArg::Grouped => CardOrder::Grouped,
            OrderArg::Interspersed => CardOrder::Interspersed,
        }
    }
}

/// Whether written decks end with ENDDATA.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum EnddataArg {
    Preserve,
    Present,
    Absent,
}

impl From<EnddataArg> for TerminatorPolicy {
    fn from(value: EnddataArg) -> TerminatorPolicy {
        match value {
            EnddataArg::Preserve => TerminatorPolicy::Preserve,
            EnddataArg::Present => TerminatorPolicy::ForcePresent,
            EnddataArg::Absent => TerminatorPolicy::ForceAbsent,
        }
    }
}
