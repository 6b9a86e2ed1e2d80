// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `run` and `summary`, and all
// their flags.
//
// clap's derive macros generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → u64, f64, enums, paths)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::run_use_case::{DevicePreference, RunConfig};
use crate::data::splitter::ValidationPolicy;
use crate::infra::logging::LogVerbosity;
use crate::ml::evaluator::DEFAULT_EVAL_BATCH_SIZE;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, train and evaluate a network, then print the test metrics
    Run(RunArgs),

    /// Print a network's layer summary and training plan
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Seed for weight initialisation, shuffling and random data
    #[arg(long)]
    pub seed: u64,

    /// Network description (.nn); the built-in digit CNN by default
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Directory holding the MNIST IDX files (plain or .gz);
    /// downloaded through burn when omitted
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Override the number of epochs (0 evaluates an untrained model)
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Override the training batch size
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Override the optimiser's learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Fraction of the training split held out for validation, in [0, 1)
    #[arg(long)]
    pub validation_split: Option<f64>,

    /// How the validation samples are chosen
    #[arg(long, value_enum, default_value_t = PolicyArg::Tail)]
    pub validation_policy: PolicyArg,

    /// Batch size used for validation and test evaluation
    #[arg(long, default_value_t = DEFAULT_EVAL_BATCH_SIZE)]
    pub eval_batch_size: usize,

    /// Write a JSON run report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Network description (.nn); the built-in digit CNN by default
    #[arg(long)]
    pub model: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    /// NdArray on the CPU
    Cpu,
    /// WGPU
    Gpu,
}

impl From<DeviceArg> for DevicePreference {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Cpu => DevicePreference::Cpu,
            DeviceArg::Gpu => DevicePreference::Gpu,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    /// Last fraction of the training split, unshuffled
    Tail,
    /// Seeded shuffle before the split
    Shuffled,
}

impl From<PolicyArg> for ValidationPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Tail     => ValidationPolicy::Tail,
            PolicyArg::Shuffled => ValidationPolicy::Shuffled,
        }
    }
}

impl RunArgs {
    /// Convert into the application-layer RunConfig.
    /// The application layer never sees clap types.
    pub fn into_config(self, device: DevicePreference, log_verbosity: LogVerbosity) -> RunConfig {
        RunConfig {
            model_path:          self.model,
            data_dir:            self.data_dir,
            seed:                self.seed,
            device,
            log_verbosity,
            epochs:              self.epochs,
            batch_size:          self.batch_size,
            learning_rate:       self.learning_rate,
            validation_fraction: self.validation_split,
            validation_policy:   self.validation_policy.into(),
            eval_batch_size:     self.eval_batch_size,
            report_path:         self.report,
        }
    }
}
