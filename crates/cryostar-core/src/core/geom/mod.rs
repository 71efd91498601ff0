//! Orientation mathematics in RELION's conventions.
//!
//! [`euler`] converts between ZYZ intrinsic Euler angles and rotation
//! matrices; [`symmetry`] parses point-group specifiers and generates their
//! rotation operators.

pub mod euler;
pub mod symmetry;

pub use euler::{euler_to_rot, rot_to_euler, vec_to_rot};
pub use symmetry::{IcosahedralVariant, SymmetryError, SymmetryGroup, find_subgroup_members};
