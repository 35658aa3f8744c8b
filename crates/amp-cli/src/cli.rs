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
    author = "Museum of Vertebrate Zoology, UC Berkeley",
    version,
    about = "amp - Drive the MaxEnt species distribution modeling engine: extract samples with data, draw background points and fit models.",
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
    /// Extract covariate values at occurrence locations (samples with data).
    Swd(SwdArgs),
    /// Draw random background points across the layers and extract their covariate values.
    Background(BackgroundArgs),
    /// Train a model from a samples-with-data table.
    Fit(FitArgs),
}

/// Settings shared by every subcommand. Each one overrides the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct EngineArgs {
    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory the engine's input and output files are written to.
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// An environmental layer (grid file). Can be used multiple times; replaces the
    /// layers of the configuration file.
    #[arg(short = 'l', long = "layer", value_name = "PATH")]
    pub layers: Vec<PathBuf>,

    /// The Java executable used to launch the engine.
    #[arg(long, value_name = "PATH")]
    pub java: Option<PathBuf>,

    /// The engine's jar file (maxent.jar).
    #[arg(long, value_name = "PATH")]
    pub jar: Option<PathBuf>,

    /// Abort an engine run after this many seconds. 0 disables the limit.
    #[arg(long, value_name = "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Keep the scratch files in the workspace after each engine run.
    #[arg(long)]
    pub keep_temp_files: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S options.randomseed=20
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `swd` subcommand.
#[derive(Args, Debug)]
pub struct SwdArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Occurrence CSV with `species,longitude,latitude` rows.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub samples: PathBuf,

    /// Where to write the samples-with-data CSV.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `background` subcommand.
#[derive(Args, Debug)]
pub struct BackgroundArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Number of background points to draw.
    #[arg(short = 'n', long, default_value_t = 10_000, value_name = "INT")]
    pub count: usize,

    /// Where to write the samples-with-data CSV.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

/// Arguments for the `fit` subcommand.
#[derive(Args, Debug)]
pub struct FitArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Samples-with-data CSV to train on.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory the model outputs are written to. Defaults to the workspace.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}
