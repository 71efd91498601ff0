//! Data structures for STAR particle metadata.
//!
//! A [`document::StarDocument`] is an ordered list of data blocks; a block
//! carries key/value pairs, a [`table::Table`] (a `loop_`), or both. Column
//! identity is the typed [`label::Label`], which resolves the RELION tags
//! the toolkit understands while passing every other tag through verbatim.

pub mod document;
pub mod label;
pub mod optics;
pub mod table;

pub use document::{DataBlock, StarDocument};
pub use label::Label;
pub use optics::OpticsGroups;
pub use table::{Column, Table, TableError};
