use crate::core::io::settings_file::{SettingsDocument, SettingsFile};
use crate::core::io::snapshot::SnapshotError;
use crate::core::io::traits::EnsembleFile;
use crate::core::models::ensemble::Ensemble;
use crate::core::settings::catalog::keys;
use crate::core::settings::error::SettingsError;
use crate::core::settings::scope::{GeneralSettings, SettingsSnapshot};
use crate::engine::compute::ComputeBackend;
use crate::engine::context::ExecutionContext;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::stage::{Stage, StageReport};
use crate::engine::stages::default_pipeline;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// What happens to an existing snapshot when a stage runs again in the same
/// working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotPolicy {
    /// Replace `<stage>.json` in place. The write is not atomic, and the
    /// previous run's snapshot is lost.
    Overwrite,
    /// Keep earlier snapshots; write to `<stage>.json` if it does not exist,
    /// else to the first free `<stage>.N.json`.
    Version,
}

impl SnapshotPolicy {
    pub fn from_settings(settings: &SettingsSnapshot) -> Result<Self, SettingsError> {
        Ok(match settings.string(keys::SNAPSHOT_POLICY)? {
            "version" => SnapshotPolicy::Version,
            _ => SnapshotPolicy::Overwrite,
        })
    }

    /// The file the next snapshot of `stage` goes to.
    pub fn path_for(self, workdir: &Path, stage: &str) -> PathBuf {
        let base = workdir.join(format!("{stage}.json"));
        match self {
            SnapshotPolicy::Overwrite => base,
            SnapshotPolicy::Version => {
                if !base.exists() {
                    return base;
                }
                (1..)
                    .map(|n| workdir.join(format!("{stage}.{n}.json")))
                    .find(|candidate| !candidate.exists())
                    .unwrap_or(base)
            }
        }
    }
}

/// Result of one stage inside a pipeline run.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub report: StageReport,
    pub snapshot_path: PathBuf,
    pub elapsed: Duration,
}

/// Runs stages in order over one ensemble and persists their snapshots.
pub struct PipelineRunner<'a, B: ComputeBackend> {
    backend: B,
    reporter: ProgressReporter<'a>,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, B: ComputeBackend> PipelineRunner<'a, B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            reporter: ProgressReporter::new(),
            cancel: None,
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'a>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Runs every stage in order, threading the shrinking population through.
    ///
    /// Stops at the first failing stage and returns its error; stages after it
    /// never run. Nothing is retried.
    #[instrument(skip_all, name = "pipeline_run_all")]
    pub fn run_all(
        &self,
        ensemble: &mut Ensemble,
        stages: &[Box<dyn Stage>],
        ncores: usize,
    ) -> Result<Vec<StageOutcome>, EngineError> {
        info!(
            stages = stages.len(),
            conformers = ensemble.len(),
            ncores,
            "Starting pipeline."
        );
        let mut outcomes = Vec::with_capacity(stages.len());
        for stage in stages {
            outcomes.push(self.run_stage(ensemble, stage.as_ref(), ncores)?);
        }
        let total: Duration = outcomes.iter().map(|o| o.elapsed).sum();
        info!(
            survivors = ensemble.len(),
            total_secs = total.as_secs_f64(),
            "Pipeline complete."
        );
        Ok(outcomes)
    }

    /// Runs a single stage and persists its snapshot according to the
    /// general `snapshot_policy`.
    pub fn run_stage(
        &self,
        ensemble: &mut Ensemble,
        stage: &dyn Stage,
        ncores: usize,
    ) -> Result<StageOutcome, EngineError> {
        let mut ctx = ExecutionContext::new(&self.backend, &self.reporter);
        if let Some(flag) = self.cancel {
            ctx = ctx.with_cancel_flag(flag);
        }

        let report = stage.run(ensemble, ncores, &ctx)?;

        let policy = SnapshotPolicy::from_settings(&report.settings)?;
        let snapshot_path = policy.path_for(ensemble.workdir(), stage.name());
        fs::create_dir_all(ensemble.workdir()).map_err(|e| EngineError::Snapshot {
            stage: stage.name().to_string(),
            path: snapshot_path.clone(),
            source: SnapshotError::Io(e),
        })?;
        report.persist(&snapshot_path)?;
        debug!(path = %snapshot_path.display(), ?policy, "Snapshot written.");
        self.reporter.report(Progress::Message(format!(
            "{}: {} survivor(s), snapshot at {}",
            stage.name(),
            report.survivors.len(),
            snapshot_path.display()
        )));

        Ok(StageOutcome {
            elapsed: report.elapsed,
            report,
            snapshot_path,
        })
    }
}

/// Loads a settings file and applies it to `stages` as complete updates,
/// recording the file on the ensemble.
///
/// Every scope in the file is first validated against a copy of its registry;
/// if any entry is unknown or invalid nothing is changed.
#[instrument(skip_all, name = "configure")]
pub fn configure(
    ensemble: &mut Ensemble,
    stages: &mut [Box<dyn Stage>],
    path: &Path,
) -> Result<(), EngineError> {
    let document =
        SettingsFile::read_from_path(path).map_err(|source| EngineError::SettingsFile {
            path: path.to_path_buf(),
            source,
        })?;
    apply_settings(&document, stages, true)?;
    ensemble.set_settings_file(path.to_path_buf());
    info!(path = %path.display(), "Applied settings file.");
    Ok(())
}

/// Applies a settings document to the general store(s) and to every stage
/// with a matching section.
pub fn apply_settings(
    document: &SettingsDocument,
    stages: &mut [Box<dyn Stage>],
    complete: bool,
) -> Result<(), EngineError> {
    let mut stores: Vec<GeneralSettings> = Vec::new();
    for stage in stages.iter() {
        let general = stage.settings().general();
        if !stores.iter().any(|store| store.shares_store_with(general)) {
            stores.push(general.clone());
        }
    }

    for store in &stores {
        store.registry().set_many(&document.general, complete)?;
    }
    for stage in stages.iter() {
        let empty = Default::default();
        let mapping = document.stage(stage.name()).unwrap_or(&empty);
        stage
            .settings()
            .local()
            .clone()
            .set_many(mapping, complete)?;
    }
    for section in document.stages.keys() {
        if !stages.iter().any(|stage| stage.name() == section) {
            warn!(section = %section, "Settings section does not match any stage in this run; ignoring it.");
        }
    }

    for store in &stores {
        store.set_many(&document.general, complete)?;
    }
    for stage in stages.iter_mut() {
        let empty = Default::default();
        let mapping = document.stage(stage.name()).unwrap_or(&empty);
        stage.set_settings(mapping, complete)?;
    }
    Ok(())
}

/// The default settings of the general scope and of every stock stage.
///
/// `maxcores` is left out since its default and bound depend on the host.
pub fn default_settings_document() -> SettingsDocument {
    let general = GeneralSettings::new();
    let mut document = SettingsDocument {
        general: general.to_map(),
        ..SettingsDocument::default()
    };
    document.general.remove(keys::MAXCORES);
    for stage in default_pipeline(&general) {
        document
            .stages
            .insert(stage.name().to_string(), stage.settings().local().to_map());
    }
    document
}
