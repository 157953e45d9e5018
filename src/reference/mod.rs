//! Static GTFS reference data.
//!
//! [`tables`] parses the delimited files into row records, and [`index`]
//! compiles them into the lookups the trace engine joins against.

pub mod index;
pub mod tables;

pub use index::{DuplicateCounts, ReferenceIndex};
pub use tables::ReferenceTables;
