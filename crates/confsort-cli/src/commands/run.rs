use crate::cli::RunArgs;
use crate::config::builder::build_config;
use crate::config::models::AppConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use confsort::core::models::ensemble::Ensemble;
use confsort::core::settings::catalog::keys;
use confsort::core::settings::scope::GeneralSettings;
use confsort::engine::compute::ExternalProgram;
use confsort::engine::error::EngineError;
use confsort::engine::progress::ProgressReporter;
use confsort::engine::stage::Stage;
use confsort::engine::stages;
use confsort::workflows::pipeline::{self, PipelineRunner, StageOutcome};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

pub async fn run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling after the running computations finish.");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting conformer sorting...");
    let result = tokio::task::block_in_place(|| execute(&config, reporter, &cancel));
    signal_task.abort();
    let (ensemble, outcomes) = result?;

    for outcome in &outcomes {
        println!(
            "✓ {:<14} {:>4} survivor(s), {:>4} rejected, {:>4} failed  ({:.1}s)  -> {}",
            outcome.report.stage,
            outcome.report.survivors.len(),
            outcome.report.rejected.len(),
            outcome.report.failures.len(),
            outcome.elapsed.as_secs_f64(),
            outcome.snapshot_path.display()
        );
    }

    if let Some(last) = outcomes.last() {
        println!("\nFinal ranking after '{}':", last.report.stage);
        println!("{:>4}  {:<12} {:>18} {:>12} {:>10}", "rank", "conformer", "G (Eh)", "ΔG (kcal/mol)", "weight");
        for entry in &last.report.survivors {
            println!(
                "{:>4}  {:<12} {:>18.8} {:>12.3} {:>10.4}",
                entry.record.rank,
                entry.id,
                entry.record.gtot,
                entry.record.relative_energy,
                entry.record.boltzmann_weight
            );
        }
    }
    info!(survivors = ensemble.len(), removed = ensemble.removed().len(), "Run finished.");
    Ok(())
}

/// Reads the ensemble, builds and configures the stages and runs them.
pub fn execute(
    config: &AppConfig,
    reporter: ProgressReporter<'_>,
    cancel: &AtomicBool,
) -> Result<(Ensemble, Vec<StageOutcome>)> {
    fs::create_dir_all(&config.workdir)?;

    info!(input = %config.input_path.display(), "Loading conformer ensemble.");
    let mut ensemble = Ensemble::read_input(
        &config.workdir,
        &config.input_path,
        config.charge,
        config.unpaired,
        config.nconf,
    )
    .map_err(|source| CliError::Input {
        path: config.input_path.clone(),
        source,
    })?;

    let general = GeneralSettings::new();
    let mut stage_list = config
        .stages
        .iter()
        .map(|name| {
            stages::by_name(name, &general)
                .ok_or_else(|| CliError::Argument(format!("Unknown stage '{}'", name)))
        })
        .collect::<Result<Vec<Box<dyn Stage>>>>()?;

    if let Some(path) = &config.settings_path {
        info!(path = %path.display(), "Applying settings file.");
        pipeline::configure(&mut ensemble, &mut stage_list, path)?;
    }
    pipeline::apply_settings(&config.overrides, &mut stage_list, false)?;

    let ncores = match config.ncores {
        Some(n) => n,
        None => general
            .get(keys::MAXCORES)
            .map_err(EngineError::from)?
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(1),
    };

    let mut backend = ExternalProgram::new(&config.program);
    for arg in &config.program_args {
        backend = backend.arg(arg);
    }

    let runner = PipelineRunner::new(backend)
        .with_reporter(reporter)
        .with_cancel_flag(cancel);
    let outcomes = runner.run_all(&mut ensemble, &stage_list, ncores)?;
    Ok((ensemble, outcomes))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use confsort::core::io::settings_file::SettingsDocument;
    use confsort::core::io::snapshot::StageSnapshot;
    use confsort::core::settings::value::SettingValue;
    use std::path::{Path, PathBuf};

    const ENSEMBLE: &str = "\
2
first
N 0.0 0.0 0.0
N 0.0 0.0 1.1
2
second
N 0.0 0.0 0.0
N 0.0 0.0 1.2
2
third
N 0.0 0.0 0.0
N 0.0 0.0 1.3
";

    // CONF3 lies ~6.3 kcal/mol above CONF1.
    const PROGRAM: &str = r#"
case "$(basename "$PWD")" in
  CONF1) e=-10.000 ;;
  CONF2) e=-9.999 ;;
  *) e=-9.990 ;;
esac
echo "energy = $e"
echo "gsolv = 0.0"
echo "grrho = 0.0"
"#;

    fn config(dir: &Path, stages: &[&str]) -> AppConfig {
        fs::write(dir.join("ensemble.xyz"), ENSEMBLE).unwrap();
        fs::write(dir.join("qc.sh"), PROGRAM).unwrap();
        AppConfig {
            workdir: dir.join("run"),
            input_path: dir.join("ensemble.xyz"),
            settings_path: None,
            charge: 0,
            unpaired: 0,
            nconf: None,
            stages: stages.iter().map(|s| s.to_string()).collect(),
            ncores: Some(1),
            program: PathBuf::from("sh"),
            program_args: vec![dir.join("qc.sh").display().to_string()],
            overrides: SettingsDocument::default(),
        }
    }

    #[test]
    fn prescreening_drops_the_high_energy_conformer() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["prescreening"]);
        let cancel = AtomicBool::new(false);

        let (ensemble, outcomes) = execute(&config, ProgressReporter::new(), &cancel).unwrap();

        let ids: Vec<_> = ensemble.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["CONF1", "CONF2"]);
        let snapshot = StageSnapshot::read_from_path(&outcomes[0].snapshot_path).unwrap();
        assert_eq!(snapshot.rejected[0].id.as_str(), "CONF3");
        assert!(config.workdir.join("prescreening/CONF1/sp/input.xyz").exists());
    }

    #[test]
    fn overrides_reach_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), &["prescreening"]);
        config
            .overrides
            .stages
            .entry("prescreening".to_string())
            .or_default()
            .insert("threshold".to_string(), SettingValue::Float(10.0));
        let cancel = AtomicBool::new(false);

        let (ensemble, _) = execute(&config, ProgressReporter::new(), &cancel).unwrap();
        assert_eq!(ensemble.len(), 3);
    }

    #[test]
    fn settings_file_is_applied_and_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), &["prescreening", "screening"]);
        let rc = dir.path().join("confsortrc.toml");
        fs::write(&rc, "[general]\ngas_phase = true\n\n[screening]\nthreshold = 0.1\n").unwrap();
        config.settings_path = Some(rc.clone());
        let cancel = AtomicBool::new(false);

        let (ensemble, outcomes) = execute(&config, ProgressReporter::new(), &cancel).unwrap();

        assert_eq!(ensemble.settings_file(), Some(rc.as_path()));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(ensemble.len(), 1);
    }

    #[test]
    fn cancelled_run_reports_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), &["prescreening"]);
        let cancel = AtomicBool::new(true);

        let err = execute(&config, ProgressReporter::new(), &cancel).unwrap_err();
        assert!(matches!(
            err,
            CliError::Engine(EngineError::Cancelled { ref stage }) if stage == "prescreening"
        ));
    }
}
