//! # confsort Core Library
//!
//! A library for sorting conformer ensembles through a sequence of increasingly
//! expensive screening stages, keeping only the conformers whose free energy stays
//! within a stage threshold of the current minimum.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers throughout, each depending only on the
//! layers below it.
//!
//! - **[`core`]: The Foundation.** Settings registries with typed, validated values,
//!   the `Conformer`/`Ensemble` model with its per-stage result history, and file I/O
//!   for XYZ ensembles, TOML settings files and JSON stage snapshots.
//!
//! - **[`engine`]: The Logic Core.** The `Stage` contract and its three stock
//!   implementations (prescreening, screening, optimization), the `ComputeBackend`
//!   seam through which property calculations are delegated, parallel dispatch over a
//!   bounded worker pool, and the threshold/Boltzmann scoring that decides survivors.
//!
//! - **[`workflows`]: The Public API.** Runs an ordered list of stages over one
//!   ensemble, persists a snapshot after each stage and applies settings files.

pub mod core;
pub mod engine;
pub mod workflows;
