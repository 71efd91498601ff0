use crate::core::geom::SymmetryError;
use crate::core::io::StarError;
use crate::core::models::TableError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("STAR file error: {0}")]
    Star(#[from] StarError),

    #[error("Metadata table error: {0}")]
    Table(#[from] TableError),

    #[error("Symmetry error: {0}")]
    Symmetry(#[from] SymmetryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Input contains no particles")]
    NoParticles,

    #[error("Input lacks Euler angle columns required for subparticle expansion")]
    MissingAngles,

    #[error(
        "A target, displacement, transformation matrix, Euler angles, or a symmetry group must be provided"
    )]
    NothingToExpand,

    #[error("A target or transformation matrix requires an origin, explicit or via box size")]
    MissingOrigin,

    #[error("An axis preset requires symmetry I1, or no symmetry at all")]
    PresetRequiresI1,

    #[error("Executable '{name}' was not found on PATH")]
    ExecutableNotFound { name: String },

    #[error("No particle stacks (*.{extension}) found in '{dir}'", dir = dir.display())]
    NoInputStacks { dir: PathBuf, extension: String },
}
