//! # Core Models Module
//!
//! Data structures for a conformer population and the results stages attach to it.
//!
//! ## Key Components
//!
//! - [`ensemble`] - The ordered population, its run metadata and removal history
//! - [`conformer`] - One geometry candidate with immutable charge and spin
//! - [`geometry`] - Element symbols and Cartesian positions
//! - [`results`] - Typed per-stage records (`stage → category → field`)
//! - [`ids`] - Conformer identifiers
//!
//! ## Usage
//!
//! ```ignore
//! use confsort::core::models::ensemble::Ensemble;
//! use confsort::core::models::results::{Category, Field};
//!
//! let ensemble = Ensemble::read_input("run", Path::new("crest_conformers.xyz"), 0, 0, None)?;
//! // ... run stages ...
//! let energy = ensemble
//!     .get("CONF1")
//!     .and_then(|c| c.results().value("prescreening", Category::SinglePoint, Field::Energy));
//! ```

pub mod conformer;
pub mod ensemble;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod results;
