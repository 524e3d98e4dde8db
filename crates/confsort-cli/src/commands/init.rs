use crate::cli::InitArgs;
use crate::error::{CliError, Result};
use confsort::core::io::settings_file::SettingsFile;
use confsort::core::io::traits::EnsembleFile;
use confsort::workflows::pipeline::default_settings_document;
use tracing::info;

pub async fn run(args: InitArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        return Err(CliError::Argument(format!(
            "'{}' already exists; pass --force to overwrite it",
            args.path.display()
        )));
    }

    let document = default_settings_document();
    SettingsFile::write_to_path(&document, &args.path).map_err(|source| {
        CliError::SettingsFile {
            path: args.path.clone(),
            source,
        }
    })?;

    info!(path = %args.path.display(), "Wrote default settings.");
    println!("Default settings written to: {}", args.path.display());
    Ok(())
}
