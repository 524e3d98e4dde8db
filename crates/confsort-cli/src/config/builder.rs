use super::models::AppConfig;
use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use crate::utils::parser;
use confsort::core::io::settings_file::SettingsDocument;
use confsort::core::settings::catalog::GENERAL_SCOPE;
use confsort::engine::stages::STAGE_NAMES;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SETTINGS_SUFFIX: &str = "confsortrc.toml";
const HIDDEN_SETTINGS: &str = ".confsortrc";

pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let workdir = args.workdir.clone();

    let input_path = match &args.input {
        Some(path) => path.clone(),
        None => discover_input(&workdir)?.ok_or_else(|| {
            CliError::Config(format!(
                "No --input given and no *.xyz file found in '{}'",
                workdir.display()
            ))
        })?,
    };

    let settings_path = match &args.settings {
        Some(path) => Some(path.clone()),
        None => discover_settings(&workdir)?,
    };

    let stages = validate_stages(&args.stages)?;
    let overrides = collect_overrides(&args.set_values)?;

    if args.ncores == Some(0) {
        return Err(CliError::Argument("--ncores must be at least 1".to_string()));
    }

    debug!(
        input = %input_path.display(),
        settings = ?settings_path,
        ?stages,
        "Resolved run configuration."
    );

    Ok(AppConfig {
        workdir,
        input_path,
        settings_path,
        charge: args.charge,
        unpaired: args.unpaired,
        nconf: args.nconf,
        stages,
        ncores: args.ncores,
        program: args.program.clone(),
        program_args: args.program_args.clone(),
        overrides,
    })
}

fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The first `*.xyz` file in `dir`, by name.
pub fn discover_input(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(sorted_files(dir)?
        .into_iter()
        .find(|path| path.extension().is_some_and(|ext| ext == "xyz")))
}

/// A `*confsortrc.toml` or `.confsortrc` file in `dir`, if any.
pub fn discover_settings(dir: &Path) -> Result<Option<PathBuf>> {
    Ok(sorted_files(dir)?.into_iter().find(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(SETTINGS_SUFFIX) || name == HIDDEN_SETTINGS)
    }))
}

fn validate_stages(names: &[String]) -> Result<Vec<String>> {
    if names.is_empty() {
        return Err(CliError::Argument("--stages must name at least one stage".to_string()));
    }
    let mut stages: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if !STAGE_NAMES.contains(&name) {
            return Err(CliError::Argument(format!(
                "Unknown stage '{}'. Available stages: {}",
                name,
                STAGE_NAMES.join(", ")
            )));
        }
        if stages.iter().any(|s| s == name) {
            return Err(CliError::Argument(format!(
                "Stage '{}' is listed more than once",
                name
            )));
        }
        stages.push(name.to_string());
    }
    Ok(stages)
}

fn collect_overrides(set_values: &[String]) -> Result<SettingsDocument> {
    let mut document = SettingsDocument::default();
    for raw in set_values {
        let parsed = parser::parse_override(raw).map_err(|e| CliError::Config(e.to_string()))?;
        let target = if parsed.scope == GENERAL_SCOPE {
            &mut document.general
        } else if STAGE_NAMES.contains(&parsed.scope.as_str()) {
            document.stages.entry(parsed.scope).or_default()
        } else {
            return Err(CliError::Config(format!(
                "Unsupported scope for --set: '{}'",
                parsed.scope
            )));
        };
        target.insert(parsed.key, parsed.value);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confsort::core::settings::value::SettingValue;
    use tempfile::tempdir;

    fn base_run_args(workdir: &Path) -> RunArgs {
        RunArgs {
            workdir: workdir.to_path_buf(),
            input: None,
            settings: None,
            charge: 0,
            unpaired: 0,
            nconf: None,
            stages: STAGE_NAMES.iter().map(|s| s.to_string()).collect(),
            ncores: None,
            program: PathBuf::from("qc.sh"),
            program_args: vec![],
            set_values: vec![],
        }
    }

    #[test]
    fn input_and_settings_are_discovered_in_the_workdir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.xyz"), "").unwrap();
        fs::write(dir.path().join("a.xyz"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("my.confsortrc.toml"), "").unwrap();

        let app = build_config(&base_run_args(dir.path())).unwrap();

        assert_eq!(app.input_path, dir.path().join("a.xyz"));
        assert_eq!(app.settings_path, Some(dir.path().join("my.confsortrc.toml")));
    }

    #[test]
    fn hidden_settings_file_is_discovered() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".confsortrc"), "").unwrap();
        assert_eq!(
            discover_settings(dir.path()).unwrap(),
            Some(dir.path().join(".confsortrc"))
        );
    }

    #[test]
    fn missing_input_is_a_config_error() {
        let dir = tempdir().unwrap();
        let err = build_config(&base_run_args(dir.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn explicit_paths_skip_discovery() {
        let dir = tempdir().unwrap();
        let mut args = base_run_args(dir.path());
        args.input = Some(PathBuf::from("elsewhere/ensemble.xyz"));
        args.settings = Some(PathBuf::from("elsewhere/rc.toml"));

        let app = build_config(&args).unwrap();

        assert_eq!(app.input_path, PathBuf::from("elsewhere/ensemble.xyz"));
        assert_eq!(app.settings_path, Some(PathBuf::from("elsewhere/rc.toml")));
    }

    #[test]
    fn unknown_and_repeated_stages_are_rejected() {
        let dir = tempdir().unwrap();
        let mut args = base_run_args(dir.path());
        args.input = Some(PathBuf::from("in.xyz"));

        args.stages = vec!["refinement".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));

        args.stages = vec!["screening".to_string(), "screening".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn set_values_are_grouped_by_scope() {
        let dir = tempdir().unwrap();
        let mut args = base_run_args(dir.path());
        args.input = Some(PathBuf::from("in.xyz"));
        args.set_values = vec![
            "general.solvent=dmso".to_string(),
            "screening.threshold=2".to_string(),
            "screening.implicit=false".to_string(),
        ];

        let app = build_config(&args).unwrap();

        assert_eq!(app.overrides.general["solvent"], SettingValue::from("dmso"));
        let screening = app.overrides.stage("screening").unwrap();
        assert_eq!(screening["threshold"], SettingValue::Int(2));
        assert_eq!(screening["implicit"], SettingValue::Bool(false));
    }

    #[test]
    fn set_value_with_unknown_scope_is_rejected() {
        let dir = tempdir().unwrap();
        let mut args = base_run_args(dir.path());
        args.input = Some(PathBuf::from("in.xyz"));
        args.set_values = vec!["nmr.threshold=2".to_string()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn zero_ncores_is_rejected_up_front() {
        let dir = tempdir().unwrap();
        let mut args = base_run_args(dir.path());
        args.input = Some(PathBuf::from("in.xyz"));
        args.ncores = Some(0);
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));
    }
}
