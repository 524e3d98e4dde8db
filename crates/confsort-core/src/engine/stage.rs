use super::compute::{ComputeError, ComputeRequest, PropertyResult};
use super::context::ExecutionContext;
use super::error::EngineError;
use super::progress::Progress;
use crate::core::io::snapshot::{
    FailureEntry, RejectedEntry, SnapshotSettings, StageSnapshot, SurvivorEntry,
};
use crate::core::models::conformer::Conformer;
use crate::core::models::ensemble::{Ensemble, RemovalReason, StageCommit, SurvivorUpdate};
use crate::core::models::geometry::Geometry;
use crate::core::models::ids::ConformerId;
use crate::core::models::results::{Category, PropertyFields, StageRecord};
use crate::core::settings::catalog::keys;
use crate::core::settings::error::SettingsError;
use crate::core::settings::registry::SettingsMap;
use crate::core::settings::scope::{SettingsSnapshot, StageSettings};
use crate::core::settings::value::SettingValue;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Hartree to kcal/mol.
pub const AU2KCAL: f64 = 627.509_474_063;
/// Molar gas constant in kcal/(mol·K).
pub const GAS_CONSTANT_KCAL: f64 = 1.987_204_259e-3;

/// One phase of the pipeline.
///
/// A stage declares its local settings and which property categories it needs;
/// the shared [`execute`] algorithm does the rest. Mutation goes through the
/// provided `set_*` methods only, and `run` borrows the stage immutably, so a
/// stage's local settings cannot change while it runs. General settings are
/// locked for the duration of every run.
pub trait Stage: Send {
    fn name(&self) -> &'static str;

    fn settings(&self) -> &StageSettings;

    fn settings_mut(&mut self) -> &mut StageSettings;

    /// The categories to compute for every conformer under `settings`.
    fn jobs(&self, settings: &SettingsSnapshot) -> Result<Vec<Category>, SettingsError>;

    fn set_setting(&mut self, name: &str, value: SettingValue) -> Result<(), SettingsError> {
        self.settings_mut().set(name, value)
    }

    fn set_general_setting(&self, name: &str, value: SettingValue) -> Result<(), SettingsError> {
        self.settings().set_general(name, value)
    }

    fn set_settings(&mut self, mapping: &SettingsMap, complete: bool) -> Result<(), SettingsError> {
        self.settings_mut().set_many(mapping, complete)
    }

    fn run(
        &self,
        ensemble: &mut Ensemble,
        ncores: usize,
        ctx: &ExecutionContext<'_>,
    ) -> Result<StageReport, EngineError> {
        execute(self, ensemble, ncores, ctx)
    }
}

/// What a completed stage run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: String,
    pub elapsed: Duration,
    /// The settings the run read.
    pub settings: SettingsSnapshot,
    /// Survivors in ranked order, with the record each received.
    pub survivors: Vec<SurvivorEntry>,
    pub rejected: Vec<RejectedEntry>,
    pub failures: Vec<FailureEntry>,
}

impl StageReport {
    pub fn survivor_ids(&self) -> Vec<&ConformerId> {
        self.survivors.iter().map(|entry| &entry.id).collect()
    }

    pub fn to_snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            stage: self.stage.clone(),
            elapsed_seconds: self.elapsed.as_secs_f64(),
            settings: SnapshotSettings {
                stage: self.settings.stage_values(),
                general: self.settings.general_values(),
            },
            conformers: self.survivors.clone(),
            rejected: self.rejected.clone(),
            failures: self.failures.clone(),
        }
    }

    /// Writes the snapshot to `path`, replacing any existing file.
    pub fn persist(&self, path: &Path) -> Result<(), EngineError> {
        self.to_snapshot()
            .write_to_path(path)
            .map_err(|source| EngineError::Snapshot {
                stage: self.stage.clone(),
                path: path.to_path_buf(),
                source,
            })
    }
}

#[derive(Debug)]
enum UnitOutcome {
    Computed(BTreeMap<Category, PropertyResult>),
    Failed {
        category: Category,
        error: ComputeError,
    },
    Skipped,
}

#[derive(Debug)]
struct Scored {
    id: ConformerId,
    properties: BTreeMap<Category, PropertyFields>,
    geometry: Option<Geometry>,
    gtot: f64,
}

/// Runs `stage` over `ensemble`.
///
/// Nothing in the ensemble changes unless the run succeeds: every compute
/// result is collected first and the outcome is committed in one step after
/// the worker pool has drained.
///
/// # Errors
///
/// - [`EngineError::EmptyEnsemble`] for an empty population.
/// - [`EngineError::ResourceLimit`] if `ncores` is zero or above the general
///   `maxcores`; no compute call is issued.
/// - [`EngineError::StageAborted`] if a compute call fails fatally.
/// - [`EngineError::Cancelled`] if the caller's cancellation flag is set.
/// - [`EngineError::StageExhausted`] if no conformer was computed successfully.
#[instrument(skip_all, name = "stage_execute", fields(stage = stage.name()))]
pub fn execute<S>(
    stage: &S,
    ensemble: &mut Ensemble,
    ncores: usize,
    ctx: &ExecutionContext<'_>,
) -> Result<StageReport, EngineError>
where
    S: Stage + ?Sized,
{
    let start = Instant::now();
    let name = stage.name();

    if ensemble.is_empty() {
        return Err(EngineError::EmptyEnsemble {
            stage: name.to_string(),
        });
    }

    let _lock = stage.settings().general().lock_for_run();
    let settings = stage.settings().snapshot();

    let max = settings.int(keys::MAXCORES)?.max(0) as usize;
    if ncores == 0 || ncores > max {
        return Err(EngineError::ResourceLimit {
            stage: name.to_string(),
            requested: ncores,
            max,
        });
    }

    let threshold = settings.float(keys::THRESHOLD)?;
    let temperature = settings.float(keys::TEMPERATURE)?;
    let jobs = stage.jobs(&settings)?;

    info!(
        conformers = ensemble.len(),
        ncores,
        jobs = ?jobs,
        threshold,
        "Starting stage."
    );
    ctx.reporter.report(Progress::StageStart {
        name,
        conformers: ensemble.len(),
    });
    ctx.reporter.report(Progress::TaskStart {
        total_steps: ensemble.len() as u64,
    });

    let outcomes = compute_all(name, ensemble, &jobs, &settings, ncores, ctx)?;
    ctx.reporter.report(Progress::TaskFinish);

    check_interrupted(name, ensemble.conformers(), &outcomes)?;

    let mut scored = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (conformer, outcome) in ensemble.conformers().iter().zip(outcomes) {
        match outcome {
            UnitOutcome::Computed(results) => scored.push(score(conformer.id(), results)),
            UnitOutcome::Failed { category, error } => {
                warn!(
                    conformer = %conformer.id(),
                    category = %category,
                    error = %error,
                    "Computation failed; excluding conformer from this stage."
                );
                failures.push(FailureEntry {
                    id: conformer.id().clone(),
                    category,
                    message: error.to_string(),
                });
            }
            UnitOutcome::Skipped => {}
        }
    }

    if scored.is_empty() {
        return Err(EngineError::StageExhausted {
            stage: name.to_string(),
            failures: failures.len(),
        });
    }

    let (survivors, updates, rejected) = rank(scored, threshold, temperature);

    let mut removed: Vec<(ConformerId, RemovalReason)> = rejected
        .iter()
        .map(|entry| {
            (
                entry.id.clone(),
                RemovalReason::AboveThreshold {
                    relative_energy: entry.relative_energy,
                    threshold: entry.threshold,
                },
            )
        })
        .collect();
    removed.extend(failures.iter().map(|failure| {
        (
            failure.id.clone(),
            RemovalReason::ComputeFailed {
                category: failure.category,
                message: failure.message.clone(),
            },
        )
    }));

    ensemble
        .commit(StageCommit {
            stage: name.to_string(),
            survivors: updates,
            removed,
        })
        .map_err(|source| EngineError::Model {
            stage: name.to_string(),
            source,
        })?;

    let elapsed = start.elapsed();
    info!(
        survivors = survivors.len(),
        rejected = rejected.len(),
        failed = failures.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Stage finished."
    );
    ctx.reporter.report(Progress::StageFinish {
        survivors: survivors.len(),
    });

    Ok(StageReport {
        stage: name.to_string(),
        elapsed,
        settings,
        survivors,
        rejected,
        failures,
    })
}

fn compute_all(
    stage: &'static str,
    ensemble: &Ensemble,
    jobs: &[Category],
    settings: &SettingsSnapshot,
    ncores: usize,
    ctx: &ExecutionContext<'_>,
) -> Result<Vec<UnitOutcome>, EngineError> {
    let abort = AtomicBool::new(false);
    let workdir = ensemble.workdir();
    let work = |conformer: &Conformer| {
        let outcome = compute_conformer(stage, conformer, jobs, settings, workdir, ctx, &abort);
        ctx.reporter.report(Progress::TaskIncrement);
        outcome
    };

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<UnitOutcome> = {
        let _ = ncores;
        ensemble.conformers().iter().map(work).collect()
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<UnitOutcome> = {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ncores)
            .build()
            .map_err(|e| EngineError::WorkerPool {
                stage: stage.to_string(),
                reason: e.to_string(),
            })?;
        pool.install(|| ensemble.conformers().par_iter().map(work).collect())
    };

    Ok(outcomes)
}

fn compute_conformer(
    stage: &str,
    conformer: &Conformer,
    jobs: &[Category],
    settings: &SettingsSnapshot,
    workdir: &Path,
    ctx: &ExecutionContext<'_>,
    abort: &AtomicBool,
) -> UnitOutcome {
    let mut results = BTreeMap::new();
    let mut optimized: Option<Geometry> = None;
    for &category in jobs {
        if abort.load(Ordering::SeqCst) || ctx.is_cancelled() {
            return UnitOutcome::Skipped;
        }
        let geometry = optimized.as_ref().unwrap_or(conformer.geometry());
        let request = ComputeRequest::new(stage, category, conformer, settings, workdir)
            .with_geometry(geometry);
        let result = ctx
            .backend
            .compute(&request)
            .and_then(|result| validate(category, conformer, result));
        match result {
            Ok(result) => {
                debug!(conformer = %conformer.id(), category = %category, "Computed.");
                if category == Category::Optimization {
                    if let Some(geometry) = &result.geometry {
                        optimized = Some(geometry.clone());
                    }
                }
                results.insert(category, result);
            }
            Err(error) => {
                if error.is_fatal() {
                    abort.store(true, Ordering::SeqCst);
                }
                return UnitOutcome::Failed { category, error };
            }
        }
    }
    UnitOutcome::Computed(results)
}

/// Checks a raw result against what the category requires.
fn validate(
    category: Category,
    conformer: &Conformer,
    result: PropertyResult,
) -> Result<PropertyResult, ComputeError> {
    let field = category.target_field();
    if result.get(field).is_none() {
        return Err(ComputeError::MissingField { category, field });
    }
    if let Some((field, value)) = result.fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ComputeError::Failed(format!(
            "field '{field}' has non-finite value {value}"
        )));
    }
    if let Some(geometry) = &result.geometry {
        if !geometry.same_topology(conformer.geometry()) {
            return Err(ComputeError::Failed(
                "returned geometry has a different atom sequence".to_string(),
            ));
        }
    }
    Ok(result)
}

/// Turns a fatal failure or an external cancellation into the matching error.
fn check_interrupted(
    stage: &str,
    conformers: &[Conformer],
    outcomes: &[UnitOutcome],
) -> Result<(), EngineError> {
    let fatal = conformers
        .iter()
        .zip(outcomes)
        .find_map(|(conformer, outcome)| match outcome {
            UnitOutcome::Failed { error, .. } if error.is_fatal() => Some((conformer, error)),
            _ => None,
        });
    if let Some((conformer, error)) = fatal {
        warn!(conformer = %conformer.id(), error = %error, "Aborting stage.");
        return Err(EngineError::StageAborted {
            stage: stage.to_string(),
            conformer: conformer.id().clone(),
            reason: error.to_string(),
        });
    }
    if outcomes
        .iter()
        .any(|outcome| matches!(outcome, UnitOutcome::Skipped))
    {
        return Err(EngineError::Cancelled {
            stage: stage.to_string(),
        });
    }
    Ok(())
}

fn score(id: &ConformerId, results: BTreeMap<Category, PropertyResult>) -> Scored {
    let mut gtot = 0.0;
    let mut geometry = None;
    let mut properties = BTreeMap::new();
    for (category, result) in results {
        gtot += result.get(category.target_field()).unwrap_or(0.0);
        if category == Category::Optimization {
            geometry = result.geometry;
        }
        properties.insert(category, result.fields);
    }
    Scored {
        id: id.clone(),
        properties,
        geometry,
        gtot,
    }
}

/// Ranks the computed conformers and applies the energy window.
///
/// Relative energies are taken against the lowest `gtot` and converted to
/// kcal/mol; anything strictly above `threshold` is rejected. Ties keep their
/// input order.
fn rank(
    mut scored: Vec<Scored>,
    threshold: f64,
    temperature: f64,
) -> (Vec<SurvivorEntry>, Vec<SurvivorUpdate>, Vec<RejectedEntry>) {
    scored.sort_by(|a, b| a.gtot.total_cmp(&b.gtot));
    let minimum = scored.first().map_or(0.0, |s| s.gtot);

    let (kept, dropped): (Vec<_>, Vec<_>) = scored
        .into_iter()
        .map(|s| {
            let relative = (s.gtot - minimum) * AU2KCAL;
            (s, relative)
        })
        .partition(|(_, relative)| *relative <= threshold);

    let rt = GAS_CONSTANT_KCAL * temperature;
    let factors: Vec<f64> = kept.iter().map(|(_, rel)| (-rel / rt).exp()).collect();
    let partition_sum: f64 = factors.iter().sum();

    let mut survivors = Vec::with_capacity(kept.len());
    let mut updates = Vec::with_capacity(kept.len());
    for (index, ((s, relative), factor)) in kept.into_iter().zip(factors).enumerate() {
        let record = StageRecord {
            properties: s.properties,
            gtot: s.gtot,
            relative_energy: relative,
            boltzmann_weight: factor / partition_sum,
            rank: index + 1,
        };
        survivors.push(SurvivorEntry {
            id: s.id.clone(),
            pass: true,
            record: record.clone(),
        });
        updates.push(SurvivorUpdate {
            id: s.id,
            record,
            geometry: s.geometry,
        });
    }

    let rejected = dropped
        .into_iter()
        .map(|(s, relative)| RejectedEntry {
            id: s.id,
            gtot: s.gtot,
            relative_energy: relative,
            threshold,
        })
        .collect();

    (survivors, updates, rejected)
}
