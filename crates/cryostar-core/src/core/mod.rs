//! # Core Module
//!
//! The fundamental building blocks for particle-metadata processing: data
//! models, file I/O, orientation geometry, and particle-table operations.
//!
//! ## Architecture
//!
//! - **Metadata Representation** ([`models`]) - STAR documents, loop tables,
//!   and the RELION label registry
//! - **File I/O** ([`io`]) - Reading/writing the STAR format and emitting
//!   Chimera BILD annotation files
//! - **Orientation Math** ([`geom`]) - ZYZ Euler angle conversions and
//!   point-group symmetry operators in RELION's conventions
//! - **Particle Operations** ([`particles`]) - Pure transformations over
//!   particle tables: selection, recentering, origin/orientation updates

pub mod geom;
pub mod io;
pub mod models;
pub mod particles;
