use clap::{Args, Parser, Subcommand, ValueEnum};
use rexmc::engine::config::MoverOrder;
use rexmc::engine::exchange::ladder::LadderSpacing;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The rexmc Developers",
    version,
    about = "rexmc CLI - Replica-exchange Monte Carlo sampling of integrative structural models.",
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

    /// Set the number of threads used for scoring.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample a model with Metropolis Monte Carlo, exchanging temperatures between replicas.
    Sample(SampleArgs),
    /// Print the temperature ladder a replica-exchange run would use.
    Ladder(LadderArgs),
}

/// Arguments for the `sample` subcommand.
#[derive(Args, Debug)]
pub struct SampleArgs {
    // --- Core Arguments ---
    /// Path to the model description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub model: PathBuf,

    /// Path of the CSV stat file, one row per frame and replica.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to the sampling configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the best-scoring particle coordinates to this CSV file.
    #[arg(short, long, value_name = "PATH")]
    pub best: Option<PathBuf>,

    // --- Run Overrides ---
    /// Override the number of frames each replica samples.
    #[arg(short, long, value_name = "INT")]
    pub frames: Option<u64>,

    /// Override the number of Monte Carlo steps between exchange attempts.
    #[arg(long, value_name = "INT")]
    pub steps_per_frame: Option<usize>,

    /// Override the random seed. Replica `i` uses `seed + i`.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    // --- Monte Carlo Overrides ---
    /// Override the Monte Carlo temperature (kT) of a single-replica run.
    #[arg(short, long, value_name = "FLOAT")]
    pub temperature: Option<f64>,

    /// Override the order in which movers are applied.
    #[arg(long, value_enum, value_name = "ORDER")]
    pub mover_order: Option<CliMoverOrder>,

    /// Override `monte-carlo.self-adaptive` from the config file.
    #[command(flatten)]
    pub self_adaptive: SelfAdaptive,

    /// Disable simulated annealing, even if it is defined in the config file.
    #[arg(long)]
    pub no_annealing: bool,

    // --- Replica Exchange Overrides ---
    /// Override the number of replicas.
    #[arg(short = 'n', long, value_name = "INT")]
    pub replicas: Option<usize>,

    /// Override the lowest temperature of the replica ladder.
    #[arg(long, value_name = "FLOAT")]
    pub min_temperature: Option<f64>,

    /// Override the highest temperature of the replica ladder.
    #[arg(long, value_name = "FLOAT")]
    pub max_temperature: Option<f64>,

    /// Override the spacing of the replica ladder.
    #[arg(long, value_enum, value_name = "SPACING")]
    pub spacing: Option<CliSpacing>,

    /// Accept an odd number of replicas. The unpaired rung skips exchanges on alternate frames.
    #[arg(long)]
    pub allow_odd_replicas: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S replica-exchange.replicas=8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// A group to handle mutually exclusive flags for self-adaptive step sizes.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct SelfAdaptive {
    /// Rescale mover step sizes after every optimize call to target 40-60% acceptance.
    #[arg(long)]
    pub self_adaptive: bool,
    /// Keep the mover step sizes from the model file unchanged.
    #[arg(long)]
    pub fixed_steps: bool,
}

impl SelfAdaptive {
    pub fn as_override(&self) -> Option<bool> {
        match (self.self_adaptive, self.fixed_steps) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the `ladder` subcommand.
#[derive(Args, Debug)]
pub struct LadderArgs {
    /// Lowest temperature of the ladder.
    #[arg(long, required = true, value_name = "FLOAT")]
    pub min_temperature: f64,

    /// Highest temperature of the ladder.
    #[arg(long, required = true, value_name = "FLOAT")]
    pub max_temperature: f64,

    /// Number of rungs.
    #[arg(short = 'n', long, required = true, value_name = "INT")]
    pub replicas: usize,

    #[arg(long, value_enum, default_value_t = CliSpacing::Geometric)]
    pub spacing: CliSpacing,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliSpacing {
    Geometric,
    Linear,
}

impl From<CliSpacing> for LadderSpacing {
    fn from(s: CliSpacing) -> Self {
        match s {
            CliSpacing::Geometric => LadderSpacing::Geometric,
            CliSpacing::Linear => LadderSpacing::Linear,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMoverOrder {
    Sequential,
    Shuffled,
}

impl From<CliMoverOrder> for MoverOrder {
    fn from(o: CliMoverOrder) -> Self {
        match o {
            CliMoverOrder::Sequential => MoverOrder::Sequential,
            CliMoverOrder::Shuffled => MoverOrder::Shuffled,
        }
    }
}
