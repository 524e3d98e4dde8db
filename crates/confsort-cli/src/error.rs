use confsort::core::io::settings_file::SettingsFileError;
use confsort::core::models::error::ModelError;
use confsort::engine::error::EngineError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read ensemble '{path}': {source}", path = path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("Failed to write settings file '{path}': {source}", path = path.display())]
    SettingsFile {
        path: PathBuf,
        #[source]
        source: SettingsFileError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
