// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Mini-batch training with Burn's DataLoader and an optimiser
// picked from the TrainingPlan.
//
// Key Burn insight:
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - the validation batcher must use B::InnerBackend too
//
// Exactly `epochs` passes; no early stopping, no retry. A NaN
// loss is reported like any other value.

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::DigitBatcher, dataset::{DigitDataset, DigitSample}};
use crate::domain::{layer::InputSpec, plan::{OptimizerKind, TrainingPlan}};
use crate::infra::metrics::{EpochLine, EpochMetrics, MetricsAccumulator};
use crate::ml::evaluator::{evaluate, DEFAULT_EVAL_BATCH_SIZE};
use crate::ml::loss::{correct_predictions, Objective};
use crate::ml::model::DigitClassifier;

/// Adam's ε, matching Keras
pub const ADAM_EPSILON: f32 = 1e-7;

/// Fixed inputs of one `fit` call
#[derive(Debug, Clone)]
pub struct FitSettings<B: AutodiffBackend> {
    pub device:          B::Device,
    pub input:           InputSpec,
    pub classes:         usize,
    /// Seeds the per-epoch shuffle of training batches
    pub seed:            u64,
    pub eval_batch_size: usize,
}

impl<B: AutodiffBackend> FitSettings<B> {
    pub fn new(device: B::Device, input: InputSpec, classes: usize, seed: u64) -> Self {
        Self { device, input, classes, seed, eval_batch_size: DEFAULT_EVAL_BATCH_SIZE }
    }
}

pub struct TrainOutcome<B: AutodiffBackend> {
    pub model:   DigitClassifier<B>,
    /// One entry per epoch, in order
    pub history: Vec<EpochMetrics>,
}

/// Train `model` for `plan.epochs` epochs on `train`, validating on
/// `valid` after each epoch when it is non-empty.
pub fn fit<B: AutodiffBackend>(
    model:    DigitClassifier<B>,
    plan:     &TrainingPlan,
    train:    Vec<DigitSample>,
    valid:    Vec<DigitSample>,
    settings: &FitSettings<B>,
) -> Result<TrainOutcome<B>> {
    if plan.batch_size == 0 {
        bail!("batch size must be positive");
    }
    if train.is_empty() && plan.epochs > 0 {
        bail!("no training samples");
    }

    let objective = Objective::new(plan.loss, model.output_activation());
    tracing::info!("Training: {}", plan);

    match plan.optimizer {
        OptimizerKind::Adam => {
            // m = β1*m + (1-β1)*g        (mean)
            // v = β2*v + (1-β2)*g²       (variance)
            // θ = θ - lr * m / (√v + ε)  (update)
            let optim = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();
            Ok(fit_with(model, optim, plan, &objective, train, valid, settings))
        }
        OptimizerKind::Sgd => {
            let optim = SgdConfig::new().init();
            Ok(fit_with(model, optim, plan, &objective, train, valid, settings))
        }
    }
}

fn fit_with<B, O>(
    mut model: DigitClassifier<B>,
    mut optim: O,
    plan:      &TrainingPlan,
    objective: &Objective,
    train:     Vec<DigitSample>,
    valid:     Vec<DigitSample>,
    settings:  &FitSettings<B>,
) -> TrainOutcome<B>
where
    B: AutodiffBackend,
    O: Optimizer<DigitClassifier<B>, B>,
{
    let learning_rate = plan.learning_rate();
    let train_samples = train.len();
    let valid_samples = valid.len();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = DigitBatcher::<B>::new(settings.device.clone(), settings.input, settings.classes);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(plan.batch_size)
        .shuffle(settings.seed)
        .num_workers(1)
        .build(DigitDataset::new(train));

    tracing::info!(
        "Fitting on {} samples, validating on {} (lr={})",
        train_samples,
        valid_samples,
        learning_rate,
    );

    let mut history = Vec::with_capacity(plan.epochs);

    for epoch in 1..=plan.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut totals = MetricsAccumulator::default();

        for batch in train_loader.iter() {
            let size   = batch.labels.dims()[0];
            let logits = model.forward_logits(batch.images);
            let loss   = objective.loss(logits.clone(), batch.targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            let correct = correct_predictions(objective.outputs(logits.detach()), batch.labels);
            totals.add(loss_val, correct, size);

            // Backward pass + optimiser update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(learning_rate, model, grads);
        }

        // ── Validation phase (InnerBackend, no autodiff overhead) ─────────────
        let valid_metrics = (valid_samples > 0).then(|| {
            let batcher = DigitBatcher::<B::InnerBackend>::new(
                settings.device.clone(),
                settings.input,
                settings.classes,
            );
            evaluate(
                &model.valid(),
                DigitDataset::new(valid.clone()),
                batcher,
                settings.eval_batch_size,
                objective,
            )
        });

        let metrics = EpochMetrics::new(epoch, totals.finish(), valid_metrics);
        let line    = EpochLine { metrics: &metrics, epochs: plan.epochs };
        println!("{line}");
        tracing::info!("{line}");
        history.push(metrics);
    }

    tracing::info!("Training complete after {} epoch(s)", plan.epochs);
    TrainOutcome { model, history }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::one_hot;
    use crate::domain::{
        architecture::Architecture,
        layer::{Activation, DenseSpec, LayerSpec},
        plan::{DatasetKind, LossKind},
    };
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    const SMALL_INPUT: InputSpec = InputSpec { height: 4, width: 4, channels: 1 };

    /// Class k lights up row k of a 4x4 image; trivially learnable
    fn stripes(count: usize) -> Vec<DigitSample> {
        (0..count)
            .map(|i| {
                let label = i % 4;
                let mut pixels = vec![0.0; 16];
                for col in 0..4 {
                    pixels[label * 4 + col] = 1.0;
                }
                DigitSample { pixels, label: label as u8, target: one_hot(label, 4) }
            })
            .collect()
    }

    fn stripe_network() -> Architecture {
        Architecture::new(vec![
            LayerSpec::Input(SMALL_INPUT),
            LayerSpec::Flatten,
            LayerSpec::Dense(DenseSpec { units: 8, activation: Activation::Relu }),
            LayerSpec::Dense(DenseSpec { units: 4, activation: Activation::Softmax }),
        ])
    }

    fn plan(epochs: usize, optimizer: OptimizerKind, learning_rate: f64) -> TrainingPlan {
        TrainingPlan {
            optimizer,
            loss:                LossKind::CategoricalCrossentropy,
            epochs,
            batch_size:          8,
            validation_fraction: 0.0,
            learning_rate:       Some(learning_rate),
            dataset:             DatasetKind::Random,
        }
    }

    fn settings() -> FitSettings<TestBackend> {
        FitSettings::new(Default::default(), SMALL_INPUT, 4, 3)
    }

    #[test]
    fn test_learns_stripe_pattern_with_adam() {
        TestBackend::seed(1);
        let settings = settings();
        let model    = DigitClassifier::new(&stripe_network(), &settings.device).unwrap();

        let outcome = fit(model, &plan(10, OptimizerKind::Adam, 0.05), stripes(64), stripes(16), &settings)
            .unwrap();

        assert_eq!(outcome.history.len(), 10);
        let first = &outcome.history[0];
        let last  = &outcome.history[9];
        assert!(last.loss < first.loss, "loss {} -> {}", first.loss, last.loss);
        assert!(last.accuracy > 0.5, "accuracy {}", last.accuracy);
        assert!(last.val_accuracy.unwrap() > 0.5);
    }

    #[test]
    fn test_sgd_reduces_loss() {
        TestBackend::seed(2);
        let settings = settings();
        let model    = DigitClassifier::new(&stripe_network(), &settings.device).unwrap();

        let outcome = fit(model, &plan(15, OptimizerKind::Sgd, 0.5), stripes(64), Vec::new(), &settings)
            .unwrap();

        let first = &outcome.history[0];
        let last  = outcome.history.last().unwrap();
        assert!(last.loss < first.loss, "loss {} -> {}", first.loss, last.loss);
        assert!(last.val_loss.is_none());
    }

    #[test]
    fn test_zero_epochs_leaves_history_empty() {
        let settings = settings();
        let model    = DigitClassifier::new(&stripe_network(), &settings.device).unwrap();
        let outcome  = fit(model, &plan(0, OptimizerKind::Adam, 0.01), stripes(8), Vec::new(), &settings)
            .unwrap();
        assert!(outcome.history.is_empty());
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let settings = settings();
        let model    = DigitClassifier::new(&stripe_network(), &settings.device).unwrap();
        let mut bad  = plan(1, OptimizerKind::Adam, 0.01);
        bad.batch_size = 0;
        assert!(fit(model, &bad, stripes(8), Vec::new(), &settings).is_err());
    }
}
