//! # Engine Module
//!
//! Runs a single pipeline stage over an ensemble.
//!
//! ## Overview
//!
//! A stage asks the compute collaborator for a set of property categories per
//! conformer, ranks the results and filters the population by an energy
//! window. The engine owns everything around those calls: validating the core
//! count, fanning work out over a bounded worker pool, absorbing per-conformer
//! failures, cancelling on fatal ones, and committing the outcome atomically.
//!
//! ## Architecture
//!
//! - **Stage contract** ([`stage`]) - The [`Stage`](stage::Stage) trait and the shared execution algorithm
//! - **Built-in stages** ([`stages`]) - Prescreening, screening and optimization
//! - **Compute seam** ([`compute`]) - Requests, results and the backend trait, plus an external-program backend
//! - **Execution context** ([`context`]) - Backend, progress reporter and cancellation flag for one run
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Stage-level errors, each naming its stage

pub mod compute;
pub mod context;
pub mod error;
pub mod progress;
pub mod stage;
pub mod stages;
