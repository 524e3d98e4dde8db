//! # Workflows Module
//!
//! High-level entry points that drive a complete conformer sorting run.
//!
//! ## Overview
//!
//! A run threads one [`crate::core::models::ensemble::Ensemble`] through an ordered
//! list of stages. Each stage shrinks the population, and after each one a JSON
//! snapshot of its settings, survivors, rejections and failures is written to the
//! ensemble's working directory. The first failing stage halts the run.
//!
//! ## Architecture
//!
//! - **Pipeline** ([`pipeline`]) - `PipelineRunner`, snapshot placement policies and
//!   settings-file application
//!
//! ## Key Capabilities
//!
//! - **Sequential stage execution** with parallel per-conformer computation inside each stage
//! - **Durable per-stage snapshots** that either overwrite or version earlier runs
//! - **Settings files** applied atomically across general and stage scopes
//! - **Progress reporting** and cooperative cancellation

pub mod pipeline;
