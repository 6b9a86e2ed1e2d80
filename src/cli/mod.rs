// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, prints results, and delegates everything else to
// Layer 2 (application).
//
//   digit-cnn [--quiet|--verbose] [--device cpu|gpu] run --seed N ...
//   digit-cnn summary [--model file.nn]
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DeviceArg, RunArgs, SummaryArgs};

use crate::infra::logging::LogVerbosity;

#[derive(Parser, Debug)]
#[command(
    name = "digit-cnn",
    version,
    about = "Build, train and evaluate a small convolutional digit classifier on MNIST."
)]
pub struct Cli {
    /// Only log warnings and errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug details
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Compute device
    #[arg(long, value_enum, global = true, default_value_t = DeviceArg::Cpu)]
    pub device: DeviceArg,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_verbosity(&self) -> LogVerbosity {
        match (self.quiet, self.verbose) {
            (true, _) => LogVerbosity::Quiet,
            (_, true) => LogVerbosity::Verbose,
            _         => LogVerbosity::Normal,
        }
    }

    /// Dispatch to the matching use case. Only routes and prints.
    pub fn run(self) -> Result<()> {
        let verbosity = self.log_verbosity();
        let device    = self.device.into();
        match self.command {
            Commands::Run(args)     => run_command(args.into_config(device, verbosity)),
            Commands::Summary(args) => summary_command(args),
        }
    }
}

fn run_command(config: crate::application::run_use_case::RunConfig) -> Result<()> {
    use crate::application::run_use_case::RunUseCase;

    tracing::debug!("Run configuration: {:?}", config);
    let use_case = RunUseCase::new(config)?;

    println!("{}", use_case.summary()?);
    let report = use_case.execute()?;

    if let Some(test) = report.test {
        println!("Test loss: {}", test.loss);
        println!("Test accuracy: {}", test.accuracy);
    }
    Ok(())
}

fn summary_command(args: SummaryArgs) -> Result<()> {
    use crate::application::summary_use_case::SummaryUseCase;

    let overview = SummaryUseCase::new(args.model).execute()?;
    println!("{}", overview.summary);
    println!("Training plan: {}", overview.plan);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::run_use_case::DevicePreference;
    use crate::data::splitter::ValidationPolicy;

    #[test]
    fn test_run_requires_seed() {
        assert!(Cli::try_parse_from(["digit-cnn", "run"]).is_err());
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["digit-cnn", "run", "--seed", "42"]).unwrap();
        assert_eq!(cli.log_verbosity(), LogVerbosity::Normal);
        assert_eq!(cli.device, DeviceArg::Cpu);
        let Commands::Run(args) = cli.command else { panic!("expected run") };

        let config = args.into_config(DevicePreference::Cpu, LogVerbosity::Normal);
        assert_eq!(config.seed, 42);
        assert_eq!(config.eval_batch_size, 32);
        assert_eq!(config.validation_policy, ValidationPolicy::Tail);
        assert!(config.model_path.is_none());
        assert!(config.epochs.is_none());
    }

    #[test]
    fn test_run_with_every_flag() {
        let cli = Cli::try_parse_from([
            "digit-cnn", "--verbose", "--device", "gpu",
            "run", "--seed", "1",
            "--model", "demos/digit_cnn.nn",
            "--data-dir", "mnist",
            "--epochs", "3",
            "--batch-size", "32",
            "--learning-rate", "0.002",
            "--validation-split", "0.2",
            "--validation-policy", "shuffled",
            "--eval-batch-size", "100",
            "--report", "out/report.json",
        ])
        .unwrap();
        assert_eq!(cli.log_verbosity(), LogVerbosity::Verbose);
        assert_eq!(cli.device, DeviceArg::Gpu);
        let Commands::Run(args) = cli.command else { panic!("expected run") };

        let config = args.into_config(DevicePreference::Gpu, LogVerbosity::Verbose);
        assert_eq!(config.epochs, Some(3));
        assert_eq!(config.batch_size, Some(32));
        assert_eq!(config.learning_rate, Some(0.002));
        assert_eq!(config.validation_fraction, Some(0.2));
        assert_eq!(config.validation_policy, ValidationPolicy::Shuffled);
        assert_eq!(config.eval_batch_size, 100);
        assert_eq!(config.report_path.unwrap().to_str(), Some("out/report.json"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["digit-cnn", "summary", "--quiet"]).unwrap();
        assert_eq!(cli.log_verbosity(), LogVerbosity::Quiet);
        assert!(matches!(cli.command, Commands::Summary(SummaryArgs { model: None })));
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["digit-cnn", "-q", "-v", "summary"]).is_err());
    }

    #[test]
    fn test_unknown_device_is_rejected() {
        assert!(Cli::try_parse_from(["digit-cnn", "--device", "tpu", "summary"]).is_err());
    }

    #[test]
    fn test_zero_epochs_is_accepted() {
        let cli = Cli::try_parse_from(["digit-cnn", "run", "--seed", "5", "--epochs", "0"]).unwrap();
        assert!(matches!(cli.command, Commands::Run(RunArgs { epochs: Some(0), .. })));
    }
}
