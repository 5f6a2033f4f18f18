//! Built-in record types.
//!
//! Each type reads its fields from a [`Card`](crate::card::Card) through the
//! typed accessors and prints them back with blanks wherever the reader
//! would fill in the same default.

mod contact;
mod coord;
mod elements;
mod grid;
mod materials;
mod properties;

pub use contact::Bsurf;
pub use coord::Cord2r;
pub use elements::{Cquad4, Ctria3, Orientation};
pub use grid::Grid;
pub use materials::Mat1;
pub use properties::Pshell;
