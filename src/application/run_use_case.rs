// ============================================================
// Layer 2 — RunUseCase
// ============================================================
// Orchestrates one complete run, in order:
//
//   Step 1: Resolve the program        (built-in or .nn file)
//   Step 2: Apply command-line overrides and validate
//   Step 3: Seed the backend, build the classifier   (Layer 5)
//   Step 4: Load + preprocess the data              (Layer 4)
//   Step 5: Hold out the validation split           (Layer 4)
//   Step 6: Fit                                      (Layer 5)
//   Step 7: Evaluate on the test split               (Layer 5)
//   Step 8: Write the run report, if asked           (Layer 6)
//
// All data is acquired before training starts, so a failed
// download never costs a training run.

use anyhow::{bail, Context, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    batcher::DigitBatcher,
    dataset::{DigitDataset, DigitSample},
    loader::{BurnMnistSource, IdxDirSource},
    preprocessor::Preprocessor,
    splitter::{split_validation, ValidationPolicy},
    synthetic::RandomSource,
};
use crate::domain::{
    architecture::{Summary, DIGIT_CLASSES},
    digit::Split,
    layer::InputSpec,
    plan::{DatasetKind, Program},
    traits::DigitSource,
};
use crate::dsl;
use crate::infra::{
    logging::LogVerbosity,
    metrics::{EvalMetrics, RunReport},
};
use crate::ml::{
    backend::{cpu_device, gpu_device, CpuBackend, GpuBackend},
    evaluator::{evaluate, DEFAULT_EVAL_BATCH_SIZE},
    loss::Objective,
    model::DigitClassifier,
    trainer::{fit, FitSettings},
};

/// MNIST images are 28×28 greyscale
pub const MNIST_INPUT: InputSpec = InputSpec { height: 28, width: 28, channels: 1 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DevicePreference {
    #[default]
    Cpu,
    Gpu,
}

// ─── Run Configuration ───────────────────────────────────────────────────────
// Everything that varies between runs. Built by the CLI and passed
// down explicitly; nothing is read from the process environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// `.nn` description; the built-in digit CNN when absent
    pub model_path:          Option<PathBuf>,
    /// Directory of IDX files; burn's MNIST download when absent
    pub data_dir:            Option<PathBuf>,
    pub seed:                u64,
    pub device:              DevicePreference,
    pub log_verbosity:       LogVerbosity,
    pub epochs:              Option<usize>,
    pub batch_size:          Option<usize>,
    pub learning_rate:       Option<f64>,
    pub validation_fraction: Option<f64>,
    pub validation_policy:   ValidationPolicy,
    pub eval_batch_size:     usize,
    pub report_path:         Option<PathBuf>,
}

impl RunConfig {
    pub fn new(seed: u64) -> Self {
        Self {
            model_path:          None,
            data_dir:            None,
            seed,
            device:              DevicePreference::default(),
            log_verbosity:       LogVerbosity::default(),
            epochs:              None,
            batch_size:          None,
            learning_rate:       None,
            validation_fraction: None,
            validation_policy:   ValidationPolicy::default(),
            eval_batch_size:     DEFAULT_EVAL_BATCH_SIZE,
            report_path:         None,
        }
    }

    /// The program to run, with overrides applied.
    pub fn program(&self) -> Result<Program> {
        let mut program = match &self.model_path {
            Some(path) => dsl::load_file(path)?,
            None       => Program::digit_cnn(),
        };

        let plan = &mut program.plan;
        if let Some(epochs) = self.epochs {
            plan.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            plan.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            plan.learning_rate = Some(lr);
        }
        if let Some(fraction) = self.validation_fraction {
            plan.validation_fraction = fraction;
        }
        Ok(program)
    }
}

/// Fail fast on anything that would only break mid-run
pub fn validate_program(program: &Program, eval_batch_size: usize) -> Result<()> {
    let arch = &program.architecture;
    let plan = &program.plan;

    arch.infer()
        .with_context(|| format!("Invalid architecture for network '{}'", program.name))?;

    if let Some(output) = arch.output() {
        if output.units != DIGIT_CLASSES {
            bail!(
                "the output layer has {} units but there are {} digit classes",
                output.units,
                DIGIT_CLASSES
            );
        }
    }
    if plan.dataset == DatasetKind::Mnist && arch.input() != Some(MNIST_INPUT) {
        bail!("MNIST needs a 28x28x1 input layer, got {:?}", arch.input());
    }
    if !(0.0..1.0).contains(&plan.validation_fraction) {
        bail!(
            "validation split must be in [0, 1), got {}",
            plan.validation_fraction
        );
    }
    if plan.batch_size == 0 {
        bail!("batch size must be positive");
    }
    if eval_batch_size == 0 {
        bail!("evaluation batch size must be positive");
    }
    if let Some(lr) = plan.learning_rate {
        if !(lr.is_finite() && lr > 0.0) {
            bail!("learning rate must be a positive number, got {lr}");
        }
    }
    Ok(())
}

/// Samples a run trains, validates and tests on
struct Splits {
    train: Vec<DigitSample>,
    valid: Vec<DigitSample>,
    test:  Option<Vec<DigitSample>>,
}

// ─── RunUseCase ──────────────────────────────────────────────────────────────
pub struct RunUseCase {
    config:  RunConfig,
    program: Program,
}

impl RunUseCase {
    /// Resolve and validate the program; no data is touched yet.
    pub fn new(config: RunConfig) -> Result<Self> {
        let program = config.program()?;
        validate_program(&program, config.eval_batch_size)?;
        Ok(Self { config, program })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn summary(&self) -> Result<Summary> {
        self.program.architecture.summary(&self.program.name)
    }

    /// Train and evaluate on the configured device.
    pub fn execute(&self) -> Result<RunReport> {
        match self.config.device {
            DevicePreference::Cpu => {
                tracing::info!("Using CPU (NdArray) backend");
                self.execute_on::<CpuBackend>(cpu_device())
            }
            DevicePreference::Gpu => {
                let device = gpu_device();
                tracing::info!("Using WGPU device: {:?}", device);
                self.execute_on::<GpuBackend>(device)
            }
        }
    }

    fn execute_on<B: AutodiffBackend>(&self, device: B::Device) -> Result<RunReport> {
        let cfg     = &self.config;
        let program = &self.program;
        let input   = program.architecture.input().unwrap_or(MNIST_INPUT);

        // ── Step 3: Seed + build the classifier ──────────────────────────────
        B::seed(cfg.seed);
        let model = DigitClassifier::<B>::new(&program.architecture, &device)?;
        let total_params = program.architecture.param_count()?;
        tracing::info!("Network '{}' ready: {} parameters", program.name, total_params);

        // ── Steps 4-5: Data ───────────────────────────────────────────────────
        let Splits { train, valid, test } = self.load_splits(input)?;

        // ── Step 6: Fit ───────────────────────────────────────────────────────
        let mut settings = FitSettings::<B>::new(device.clone(), input, DIGIT_CLASSES, cfg.seed);
        settings.eval_batch_size = cfg.eval_batch_size;
        let outcome = fit(model, &program.plan, train, valid, &settings)?;

        // ── Step 7: Test evaluation on the inner backend ──────────────────────
        let test_metrics: Option<EvalMetrics> = test.map(|samples| {
            let objective = Objective::new(program.plan.loss, outcome.model.output_activation());
            let batcher   = DigitBatcher::<B::InnerBackend>::new(device.clone(), input, DIGIT_CLASSES);
            evaluate(
                &outcome.model.valid(),
                DigitDataset::new(samples),
                batcher,
                cfg.eval_batch_size,
                &objective,
            )
        });
        match &test_metrics {
            Some(m) => tracing::info!("Test loss={:.4} accuracy={:.4}", m.loss, m.accuracy),
            None    => tracing::info!("Random data has no test split; evaluation skipped"),
        }

        // ── Step 8: Report ────────────────────────────────────────────────────
        let report = RunReport {
            program: program.name.clone(),
            total_params,
            seed: cfg.seed,
            epochs: outcome.history,
            test: test_metrics,
        };
        if let Some(path) = &cfg.report_path {
            report.write_json(path)?;
        }
        Ok(report)
    }

    fn load_splits(&self, input: InputSpec) -> Result<Splits> {
        let cfg  = &self.config;
        let plan = &self.program.plan;

        let (samples, test) = match plan.dataset {
            DatasetKind::Mnist => {
                let source: Box<dyn DigitSource> = match &cfg.data_dir {
                    Some(dir) => Box::new(IdxDirSource::new(dir)),
                    None      => Box::new(BurnMnistSource::new()),
                };
                tracing::info!("Loading digits from {}", source.describe());

                let preprocessor = Preprocessor::new(input, DIGIT_CLASSES);
                let train = preprocessor.process(&source.load(Split::Train)?)?;
                let test  = preprocessor.process(&source.load(Split::Test)?)?;
                (train, Some(test))
            }
            DatasetKind::Random => {
                tracing::info!("No dataset given: training on random noise");
                (RandomSource::new(input, DIGIT_CLASSES, cfg.seed).samples(), None)
            }
        };

        let (train, valid) = split_validation(
            samples,
            plan.validation_fraction,
            cfg.validation_policy,
            cfg.seed,
        );
        Ok(Splits { train, valid, test })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::tests::{idx_images, idx_labels};
    use std::path::Path;

    fn demo(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
    }

    #[test]
    fn test_default_config_runs_builtin_program() {
        let use_case = RunUseCase::new(RunConfig::new(42)).unwrap();
        assert_eq!(use_case.program(), &Program::digit_cnn());
        assert_eq!(use_case.summary().unwrap().total_params, 402_442);
    }

    #[test]
    fn test_overrides_are_applied() {
        let mut config = RunConfig::new(1);
        config.epochs              = Some(0);
        config.batch_size          = Some(128);
        config.learning_rate       = Some(0.01);
        config.validation_fraction = Some(0.2);

        let plan = config.program().unwrap().plan;
        assert_eq!(plan.epochs, 0);
        assert_eq!(plan.batch_size, 128);
        assert_eq!(plan.learning_rate(), 0.01);
        assert_eq!(plan.validation_fraction, 0.2);
    }

    #[test]
    fn test_invalid_settings_fail_before_training() {
        let mut config = RunConfig::new(1);
        config.validation_fraction = Some(1.0);
        assert!(RunUseCase::new(config).is_err());

        let mut config = RunConfig::new(1);
        config.batch_size = Some(0);
        assert!(RunUseCase::new(config).is_err());

        let mut config = RunConfig::new(1);
        config.eval_batch_size = 0;
        assert!(RunUseCase::new(config).is_err());
    }

    #[test]
    fn test_mnist_requires_28x28x1_input() {
        let mut program = Program::digit_cnn();
        program.architecture = crate::dsl::parse(
            "network small { input(1, 14, 14) flatten output units=10 } train { dataset: mnist }",
        )
        .unwrap()
        .architecture;
        assert!(validate_program(&program, 32).is_err());
    }

    #[test]
    fn test_output_must_have_ten_units() {
        let program = crate::dsl::parse("network three { flatten output units=3 }").unwrap();
        assert!(validate_program(&program, 32).is_err());
    }

    #[test]
    fn test_oversized_descriptions_are_errors() {
        for source in [
            "network n { input(1, 28, 28) flatten dense units=18446744073709551615 output }",
            "network n { input(1, 4294967296, 4294967296) flatten output }",
        ] {
            // Numbers past usize are already parse errors on narrow targets
            let rejected = crate::dsl::parse(source)
                .map_or(true, |program| validate_program(&program, 32).is_err());
            assert!(rejected, "{source}");
        }
    }

    #[test]
    fn test_random_program_end_to_end_on_cpu() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RunConfig::new(7);
        config.model_path  = Some(demo("random_smoke.nn"));
        config.report_path = Some(dir.path().join("report.json"));

        let use_case = RunUseCase::new(config).unwrap();
        let report   = use_case.execute().unwrap();

        assert_eq!(report.program, "random_smoke");
        assert_eq!(report.seed, 7);
        assert_eq!(report.epochs.len(), 1);
        assert!(report.epochs[0].val_loss.is_none());
        assert!(report.test.is_none());
        assert!(dir.path().join("report.json").is_file());
    }

    #[test]
    fn test_idx_directory_end_to_end_on_cpu() {
        // 20 training and 10 test images, all blank
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, bytes: Vec<u8>| std::fs::write(dir.path().join(name), bytes).unwrap();
        let labels: Vec<u8> = (0..20).map(|i| (i % 10) as u8).collect();
        write("train-images-idx3-ubyte", idx_images(&vec![vec![0; 784]; 20], 28, 28));
        write("train-labels-idx1-ubyte", idx_labels(&labels));
        write("t10k-images-idx3-ubyte", idx_images(&vec![vec![0; 784]; 10], 28, 28));
        write("t10k-labels-idx1-ubyte", idx_labels(&labels[..10]));

        let mut config = RunConfig::new(3);
        config.data_dir   = Some(dir.path().to_path_buf());
        config.epochs     = Some(1);
        config.batch_size = Some(8);

        let report = RunUseCase::new(config).unwrap().execute().unwrap();
        assert_eq!(report.epochs.len(), 1);
        // 10 % of 20 samples are held out
        assert!(report.epochs[0].val_accuracy.is_some());
        let test = report.test.unwrap();
        assert!((0.0..=1.0).contains(&test.accuracy));
        assert!(test.loss.is_finite());
    }

    #[test]
    #[ignore = "downloads MNIST and trains for two epochs"]
    fn test_full_mnist_run_reaches_half_accuracy() {
        let report = RunUseCase::new(RunConfig::new(42)).unwrap().execute().unwrap();
        assert_eq!(report.epochs.len(), 2);
        assert!(report.test.unwrap().accuracy > 0.5);
    }

    #[test]
    #[ignore = "downloads MNIST"]
    fn test_untrained_mnist_evaluation_is_near_chance() {
        let mut config = RunConfig::new(42);
        config.epochs = Some(0);
        let report = RunUseCase::new(config).unwrap().execute().unwrap();
        let test   = report.test.unwrap();
        assert!((test.accuracy - 0.1).abs() <= 0.05, "accuracy {}", test.accuracy);
        assert!((test.loss - 2.3).abs() <= 0.3, "loss {}", test.loss);
    }
}
