// ============================================================
// Layer 5 — Evaluator
// ============================================================
// One forward pass over a held-out set in fixed-size batches,
// no shuffling, no gradients. Loss and accuracy are averaged
// per sample, so a short final batch counts for what it holds.
//
// Used for the final test evaluation and, on the trainer's
// inner backend, for per-epoch validation.

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    data::dataset::Dataset,
    prelude::*,
};

use crate::data::{
    batcher::{DigitBatch, DigitBatcher},
    dataset::DigitDataset,
};
use crate::infra::metrics::{EvalMetrics, MetricsAccumulator};
use crate::ml::loss::{correct_predictions, Objective};
use crate::ml::model::DigitClassifier;

/// Keras' default batch size for `evaluate`
pub const DEFAULT_EVAL_BATCH_SIZE: usize = 32;

pub fn evaluate<B: Backend>(
    model:      &DigitClassifier<B>,
    dataset:    DigitDataset,
    batcher:    DigitBatcher<B>,
    batch_size: usize,
    objective:  &Objective,
) -> EvalMetrics {
    if dataset.is_empty() {
        return EvalMetrics::empty();
    }

    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(batch_size.max(1))
        .num_workers(1)
        .build(dataset);

    evaluate_loader(model, loader.as_ref(), objective)
}

/// Evaluate over batches an existing loader yields
pub fn evaluate_loader<B: Backend>(
    model:     &DigitClassifier<B>,
    loader:    &dyn DataLoader<DigitBatch<B>>,
    objective: &Objective,
) -> EvalMetrics {
    let mut totals = MetricsAccumulator::default();

    for batch in loader.iter() {
        let size   = batch.labels.dims()[0];
        let logits = model.forward_logits(batch.images);

        let loss: f64 = objective
            .loss(logits.clone(), batch.targets)
            .into_scalar()
            .elem::<f64>();
        let correct = correct_predictions(objective.outputs(logits), batch.labels);

        totals.add(loss, correct, size);
    }

    let metrics = totals.finish();
    tracing::debug!(
        "Evaluated {} samples: loss={:.4} accuracy={:.4}",
        totals.samples(),
        metrics.loss,
        metrics.accuracy,
    );
    metrics
}
