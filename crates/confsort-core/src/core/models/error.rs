use super::ids::ConformerId;
use crate::core::io::xyz::XyzError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Conformer '{id}' already exists in the ensemble")]
    DuplicateConformer { id: ConformerId },

    #[error("Conformer '{id}' is not part of the active ensemble")]
    UnknownConformer { id: ConformerId },

    #[error(
        "Conformer '{id}' has a different topology ({found} atoms) than the ensemble ({expected} atoms)"
    )]
    TopologyMismatch {
        id: ConformerId,
        expected: usize,
        found: usize,
    },

    #[error("Stage '{stage}' did not account for conformer '{id}'")]
    IncompleteCommit { stage: String, id: ConformerId },

    #[error("The input contains no conformers")]
    NoConformers,

    #[error("Failed to read input ensemble: {0}")]
    Input(#[from] XyzError),
}
