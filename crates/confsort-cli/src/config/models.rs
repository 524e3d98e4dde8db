use confsort::core::io::settings_file::SettingsDocument;
use std::path::PathBuf;

/// Everything `run` needs, resolved from the command line and the working directory.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub workdir: PathBuf,
    pub input_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub charge: i32,
    pub unpaired: u32,
    pub nconf: Option<usize>,
    pub stages: Vec<String>,
    pub ncores: Option<usize>,
    pub program: PathBuf,
    pub program_args: Vec<String>,
    /// `-S` values, applied after the settings file as partial updates.
    pub overrides: SettingsDocument,
}
