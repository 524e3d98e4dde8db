use crate::core::io::traits::EnsembleFile;
use crate::core::io::xyz::XyzFile;
use crate::core::models::conformer::Conformer;
use crate::core::models::geometry::Geometry;
use crate::core::models::results::{Category, Field, PropertyFields};
use crate::core::settings::scope::SettingsSnapshot;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, trace};

/// One property calculation for one conformer under one stage's frozen settings.
#[derive(Debug, Clone, Copy)]
pub struct ComputeRequest<'a> {
    pub stage: &'a str,
    pub category: Category,
    pub conformer: &'a Conformer,
    /// The structure to compute on. Starts as the conformer's geometry and
    /// becomes the optimized one for jobs queued after an optimization.
    pub geometry: &'a Geometry,
    pub settings: &'a SettingsSnapshot,
    /// The ensemble's working directory.
    pub workdir: &'a Path,
}

impl<'a> ComputeRequest<'a> {
    pub fn new(
        stage: &'a str,
        category: Category,
        conformer: &'a Conformer,
        settings: &'a SettingsSnapshot,
        workdir: &'a Path,
    ) -> Self {
        Self {
            stage,
            category,
            conformer,
            geometry: conformer.geometry(),
            settings,
            workdir,
        }
    }

    pub fn with_geometry(mut self, geometry: &'a Geometry) -> Self {
        self.geometry = geometry;
        self
    }
}

/// Numeric fields returned for one category, plus an optimized geometry for `opt`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyResult {
    pub fields: PropertyFields,
    pub geometry: Option<Geometry>,
}

impl PropertyResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A result holding only an `energy` field.
    pub fn energy(value: f64) -> Self {
        Self::new().with_field(Field::Energy, value)
    }

    pub fn with_field(mut self, field: Field, value: f64) -> Self {
        self.fields.insert(field, value);
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.fields.get(&field).copied()
    }
}

/// Failure of a single compute call.
///
/// All variants except [`ComputeError::Fatal`] only exclude the conformer from
/// the stage. A fatal error cancels the remaining work of the whole stage.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComputeError {
    #[error("Calculation failed: {0}")]
    Failed(String),

    #[error("Calculation did not converge: {0}")]
    NotConverged(String),

    #[error("Result of category '{category}' is missing field '{field}'")]
    MissingField { category: Category, field: Field },

    #[error("Unrecoverable compute failure: {0}")]
    Fatal(String),
}

impl ComputeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ComputeError::Fatal(_))
    }
}

/// The external collaborator that evaluates properties.
///
/// Implementations are called concurrently from the stage worker pool.
pub trait ComputeBackend: Sync {
    fn compute(&self, request: &ComputeRequest<'_>) -> Result<PropertyResult, ComputeError>;
}

impl<F> ComputeBackend for F
where
    F: Fn(&ComputeRequest<'_>) -> Result<PropertyResult, ComputeError> + Sync,
{
    fn compute(&self, request: &ComputeRequest<'_>) -> Result<PropertyResult, ComputeError> {
        self(request)
    }
}

/// Environment variable prefix for everything passed to an [`ExternalProgram`].
pub const ENV_PREFIX: &str = "CONFSORT_";

const INPUT_FILE: &str = "input.xyz";
const OUTPUT_FILE: &str = "output.xyz";

/// Runs an executable once per request.
///
/// The program is started inside `<workdir>/<stage>/<conformer>/<category>/`
/// with the request geometry in `input.xyz`. The request is described through
/// environment variables (`CONFSORT_STAGE`, `CONFSORT_CATEGORY`,
/// `CONFSORT_CHARGE`, `CONFSORT_UNPAIRED` and one `CONFSORT_<SETTING>` per
/// visible setting). The program prints its fields as TOML `key = value`
/// lines on stdout (`energy`, `gsolv`, `grrho`, and optionally
/// `converged = false`). An `output.xyz` left behind is read as the optimized
/// geometry.
#[derive(Debug, Clone)]
pub struct ExternalProgram {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalProgram {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn job_dir(request: &ComputeRequest<'_>) -> PathBuf {
        request
            .workdir
            .join(request.stage)
            .join(request.conformer.id().as_str())
            .join(request.category.as_str())
    }

    fn prepare(&self, dir: &Path, request: &ComputeRequest<'_>) -> Result<(), ComputeError> {
        let fatal = |e: &dyn std::fmt::Display| {
            ComputeError::Fatal(format!("cannot prepare '{}': {e}", dir.display()))
        };
        fs::create_dir_all(dir).map_err(|e| fatal(&e))?;
        let stale = dir.join(OUTPUT_FILE);
        if stale.exists() {
            fs::remove_file(&stale).map_err(|e| fatal(&e))?;
        }
        XyzFile::write_to_path(&vec![request.geometry.clone()], dir.join(INPUT_FILE))
            .map_err(|e| fatal(&e))
    }

    fn command(&self, dir: &Path, request: &ComputeRequest<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(dir)
            .env(format!("{ENV_PREFIX}STAGE"), request.stage)
            .env(format!("{ENV_PREFIX}CATEGORY"), request.category.as_str())
            .env(
                format!("{ENV_PREFIX}CHARGE"),
                request.conformer.charge().to_string(),
            )
            .env(
                format!("{ENV_PREFIX}UNPAIRED"),
                request.conformer.unpaired().to_string(),
            );
        for (name, value) in request.settings.iter() {
            command.env(
                format!("{ENV_PREFIX}{}", name.to_ascii_uppercase()),
                value.to_plain_string(),
            );
        }
        command
    }
}

/// Parses the `key = value` lines a program printed.
fn parse_fields(stdout: &str) -> Result<PropertyResult, ComputeError> {
    let table: toml::Table = toml::from_str(stdout)
        .map_err(|e| ComputeError::Failed(format!("unreadable program output: {e}")))?;

    if let Some(toml::Value::Boolean(false)) = table.get("converged") {
        return Err(ComputeError::NotConverged(
            "program reported converged = false".to_string(),
        ));
    }

    let mut result = PropertyResult::new();
    for (key, value) in &table {
        let Some(field) = Field::parse(key) else {
            continue;
        };
        let number = match value {
            toml::Value::Float(x) => *x,
            toml::Value::Integer(i) => *i as f64,
            _ => {
                return Err(ComputeError::Failed(format!(
                    "field '{key}' is not a number"
                )));
            }
        };
        result.fields.insert(field, number);
    }
    Ok(result)
}

impl ComputeBackend for ExternalProgram {
    fn compute(&self, request: &ComputeRequest<'_>) -> Result<PropertyResult, ComputeError> {
        let dir = Self::job_dir(request);
        self.prepare(&dir, request)?;

        debug!(
            program = %self.program.display(),
            dir = %dir.display(),
            category = %request.category,
            "Launching external program."
        );
        let output = self.command(&dir, request).output().map_err(|e| {
            ComputeError::Fatal(format!(
                "failed to start '{}': {e}",
                self.program.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("").trim().to_string();
            return Err(ComputeError::Failed(format!(
                "'{}' exited with {}{}",
                self.program.display(),
                output.status,
                if detail.is_empty() {
                    String::new()
                } else {
                    format!(": {detail}")
                }
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!(stdout = %stdout, "Program output.");
        let mut result = parse_fields(&stdout)?;

        let optimized = dir.join(OUTPUT_FILE);
        if optimized.exists() {
            let frames = XyzFile::read_from_path(&optimized).map_err(|e| {
                ComputeError::Failed(format!("unreadable '{}': {e}", optimized.display()))
            })?;
            result.geometry = frames.into_iter().next();
        }
        Ok(result)
    }
}
