//! # cryostar Core Library
//!
//! A library for manipulating single-particle cryo-EM metadata: RELION STAR
//! files, particle orientation geometry, symmetry expansion, and the batch
//! processing workflows built on top of them.
//!
//! ## Architectural Philosophy
//!
//! The library is organized into three layers with a strict dependency
//! direction, so that each layer can be tested in isolation:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`StarDocument`,
//!   `Table`), file-format I/O (STAR, BILD), orientation math (ZYZ Euler
//!   conventions, point-group symmetry operators), and pure particle-table
//!   operations (class selection, recentering, origin transforms).
//!
//! - **[`metadata`]: External Metadata.** Readers for metadata produced by
//!   other packages, currently the cryoSPARC job-directory graph.
//!
//! - **[`workflows`]: The Public API.** User-facing procedures that tie the
//!   core together: symmetry-derived subparticle generation and parallel
//!   particle-stack normalization. Each workflow reports progress through a
//!   caller-supplied callback and never touches the terminal itself.

pub mod core;
pub mod metadata;
pub mod workflows;
