//! Multi-step processing pipelines built on the core layers.

pub mod error;
pub mod normalize;
pub mod progress;
pub mod subparticles;

pub use error::WorkflowError;
pub use normalize::{NormalizeOptions, NormalizeReport, Normalizer};
pub use progress::{Progress, ProgressCallback, ProgressReporter};
pub use subparticles::{
    AxisPreset, MatrixTransform, SubparticleOptions, SubparticleOutput, run as run_subparticles,
};
