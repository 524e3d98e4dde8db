//! # Core Module
//!
//! Data structures and file formats shared by every stage of a conformer sorting run.
//!
//! ## Architecture
//!
//! - **Settings** ([`settings`]) - Typed setting schemas, per-stage registries and the
//!   shared general store
//! - **Molecular Representation** ([`models`]) - Geometries, conformers, ensembles and
//!   the per-stage result records they carry
//! - **File I/O** ([`io`]) - Multi-frame XYZ, TOML settings files and JSON stage snapshots
//!
//! Nothing in this layer performs a calculation; energies enter through the
//! [`crate::engine`] layer and are stored here.

pub mod io;
pub mod models;
pub mod settings;
