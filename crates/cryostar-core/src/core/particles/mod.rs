//! Pure operations over particle tables.
//!
//! Everything here takes a [`Table`](crate::core::models::Table) (or a
//! whole document) and either computes a derived quantity or rewrites
//! columns in place; no I/O, no terminal output.

pub mod ops;
pub mod transform;

pub use ops::{
    calculate_apix, downgrade_relion2, ensure_pixel_origins, interleave, recenter,
    select_classes, sync_origins_angst,
};
pub use transform::{TransformOptions, transform_particles};
