//! Core library for reading, cross-referencing and writing finite-element
//! bulk data decks.
//!
//! A deck is flattened through its INCLUDE tree, split into fixed or free
//! fields, assembled into cards and filed by keyword into typed containers.
//! A built [`Model`] can be written back in any field layout.

pub mod card;
pub mod cards;
pub mod config;
pub mod container;
pub mod error;
pub mod field;
pub mod format;
pub mod include;
pub mod location;
pub mod model;
pub mod registry;
pub mod writer;
pub mod xref;

pub use card::{AssembledDeck, Card, CardAssembler};
pub use config::{DeckConfig, ReadOptions, TextEncoding, WriteOptions};
pub use container::{CardContainer, DuplicatePolicy, Entity, EntityContainer};
pub use error::{DeckError, Result, StructuralKind};
pub use field::{FieldWidth, LineKind, RawField, TokenizedLine, tokenize_line};
pub use format::{CardFormat, FieldValue, Precision, collapse_thru, expand_thru, print_card};
pub use include::{DeckLine, IncludeOptions, Includer};
pub use location::SourceLocation;
pub use model::{DeckStats, Model, RejectedCard};
pub use registry::{CardRegistry, ContainerSpec};
pub use writer::{CardOrder, TerminatorPolicy};
pub use xref::{DanglingReference, Link, Reference, ResolvedLink, XrefMode, XrefReport};
