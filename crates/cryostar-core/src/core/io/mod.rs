//! Reading and writing metadata file formats.
//!
//! The STAR format is the interchange format for everything in this
//! toolkit; BILD is write-only, for visual inspection of particle
//! positions and orientations in UCSF Chimera.

pub mod bild;
pub mod star;
pub mod traits;

pub use star::{StarError, StarFile};
pub use traits::MetadataFile;
