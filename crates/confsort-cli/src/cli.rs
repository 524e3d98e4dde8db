use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan",
    version,
    about = "confsort - sort a conformer ensemble through prescreening, screening and optimization stages.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the stage pipeline over a conformer ensemble.
    Run(RunArgs),
    /// Write a settings file holding every default value.
    Init(InitArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    // --- Input ---
    /// Working directory; snapshots and per-conformer scratch directories go here.
    #[arg(short = 'w', long, default_value = ".", value_name = "DIR")]
    pub workdir: PathBuf,

    /// Multi-frame XYZ ensemble. Defaults to the first *.xyz file in the working directory.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Settings file in TOML format. Defaults to a *confsortrc.toml or .confsortrc
    /// file in the working directory, if one exists.
    #[arg(short, long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Molecular charge.
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    pub charge: i32,

    /// Number of unpaired electrons.
    #[arg(short, long, default_value_t = 0)]
    pub unpaired: u32,

    /// Only read the first N conformers of the input.
    #[arg(short, long, value_name = "N")]
    pub nconf: Option<usize>,

    // --- Pipeline ---
    /// Comma-separated stages to run, in order.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "prescreening,screening,optimization",
        value_name = "STAGES"
    )]
    pub stages: Vec<String>,

    /// Number of conformers computed concurrently. Defaults to the general
    /// `maxcores` setting.
    #[arg(short = 'j', long, value_name = "NUM")]
    pub ncores: Option<usize>,

    // --- Compute backend ---
    /// Program invoked once per conformer and property category.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub program: PathBuf,

    /// Extra argument passed to the program. Can be used multiple times.
    #[arg(long = "program-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub program_args: Vec<String>,

    /// Set a single setting, overriding the settings file.
    /// Can be used multiple times. Example: -S screening.threshold=2.5 -S general.solvent=dmso
    #[arg(short = 'S', long = "set", value_name = "SCOPE.KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    /// Where to write the settings file.
    #[arg(default_value = "confsortrc.toml", value_name = "PATH")]
    pub path: PathBuf,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}
