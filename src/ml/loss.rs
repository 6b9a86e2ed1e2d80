// ============================================================
// Layer 5 — Objective (loss + accuracy)
// ============================================================
// The model hands out pre-activation logits; the objective knows
// which output activation the network ends with and turns
// logits + one-hot targets into a scalar loss.
//
//   categorical cross-entropy, softmax output:
//       L = −mean_n Σ_k t_nk · log_softmax(z_n)_k
//
//   categorical cross-entropy, any other output:
//       p = f(z) / Σ_k f(z)_k, clipped to [ε, 1−ε]
//       L = −mean_n Σ_k t_nk · log p_nk
//
//   mean squared error:
//       L = mean (f(z) − t)²

use burn::{prelude::*, tensor::activation::log_softmax};

use crate::domain::layer::Activation;
use crate::domain::plan::LossKind;
use crate::ml::model::activate;

/// Probability clip for cross-entropy on non-softmax outputs
pub const EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Objective {
    pub loss:   LossKind,
    pub output: Activation,
}

impl Objective {
    pub fn new(loss: LossKind, output: Activation) -> Self {
        Self { loss, output }
    }

    /// The network output for the given logits
    pub fn outputs<B: Backend>(&self, logits: Tensor<B, 2>) -> Tensor<B, 2> {
        activate(logits, self.output)
    }

    /// logits, targets: [N, classes] → mean loss over the batch, shape [1]
    pub fn loss<B: Backend>(&self, logits: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        match (self.loss, self.output) {
            (LossKind::CategoricalCrossentropy, Activation::Softmax) => {
                (targets * log_softmax(logits, 1)).sum_dim(1).neg().mean()
            }
            (LossKind::CategoricalCrossentropy, _) => {
                let outputs = self.outputs(logits);
                let totals  = outputs.clone().sum_dim(1);
                let probs   = (outputs / totals).clamp(EPSILON, 1.0 - EPSILON);
                (targets * probs.log()).sum_dim(1).neg().mean()
            }
            (LossKind::MeanSquaredError, _) => {
                (self.outputs(logits) - targets).powf_scalar(2.0).mean()
            }
        }
    }
}

/// Number of rows whose arg-max matches the label
pub fn correct_predictions<B: Backend>(outputs: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [N, 1]; flatten to [N] before comparing
    let predicted = outputs.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as usize
}
