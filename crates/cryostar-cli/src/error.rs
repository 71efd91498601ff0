use cryostar::core::geom::SymmetryError;
use cryostar::core::io::StarError;
use cryostar::core::io::bild::BildError;
use cryostar::core::models::TableError;
use cryostar::metadata::JobError;
use cryostar::workflows::WorkflowError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Star(#[from] StarError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Symmetry(#[from] SymmetryError),

    #[error(transparent)]
    Bild(#[from] BildError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
