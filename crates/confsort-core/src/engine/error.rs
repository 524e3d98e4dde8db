use thiserror::Error;

use crate::core::io::settings_file::SettingsFileError;
use crate::core::io::snapshot::SnapshotError;
use crate::core::models::error::ModelError;
use crate::core::models::ids::ConformerId;
use crate::core::settings::error::SettingsError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Settings error: {source}")]
    Settings {
        #[from]
        source: SettingsError,
    },

    #[error("Stage '{stage}' requested {requested} core(s), but the allowed range is 1..={max}")]
    ResourceLimit {
        stage: String,
        requested: usize,
        max: usize,
    },

    #[error("Stage '{stage}' cannot run on an empty ensemble")]
    EmptyEnsemble { stage: String },

    #[error("Stage '{stage}' left no survivors: {failures} conformer computation(s) failed")]
    StageExhausted { stage: String, failures: usize },

    #[error("Stage '{stage}' aborted on conformer '{conformer}': {reason}")]
    StageAborted {
        stage: String,
        conformer: ConformerId,
        reason: String,
    },

    #[error("Stage '{stage}' was cancelled before all conformers were computed")]
    Cancelled { stage: String },

    #[error("Failed to build a worker pool for stage '{stage}': {reason}")]
    WorkerPool { stage: String, reason: String },

    #[error("Stage '{stage}' could not update the ensemble: {source}")]
    Model {
        stage: String,
        #[source]
        source: ModelError,
    },

    #[error("Failed to persist the snapshot of stage '{stage}' to '{path}': {source}")]
    Snapshot {
        stage: String,
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },

    #[error("Failed to load settings file '{path}': {source}")]
    SettingsFile {
        path: PathBuf,
        #[source]
        source: SettingsFileError,
    },
}

impl EngineError {
    /// The stage the error was raised in, if it belongs to one.
    pub fn stage(&self) -> Option<&str> {
        match self {
            EngineError::ResourceLimit { stage, .. }
            | EngineError::EmptyEnsemble { stage }
            | EngineError::StageExhausted { stage, .. }
            | EngineError::StageAborted { stage, .. }
            | EngineError::Cancelled { stage }
            | EngineError::WorkerPool { stage, .. }
            | EngineError::Model { stage, .. }
            | EngineError::Snapshot { stage, .. } => Some(stage.as_str()),
            EngineError::Settings { .. } | EngineError::SettingsFile { .. } => None,
        }
    }
}
