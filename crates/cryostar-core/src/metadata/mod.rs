//! Readers for third-party processing metadata, currently cryoSPARC job
//! descriptions.

pub mod jobs;

pub use jobs::{FileSet, JobDocument, JobError, JobParser, OutputResult};
