// ============================================================
// Layer 3 — Training Plan & Program
// ============================================================
// How a network is trained: optimiser, loss, epochs, batch size,
// validation hold-out and which dataset to use. A Program pairs a
// named Architecture with its TrainingPlan; it is what both the
// built-in default and a parsed `.nn` description produce.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::architecture::Architecture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl OptimizerKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "adam" => Some(Self::Adam),
            "sgd"  => Some(Self::Sgd),
            _ => None,
        }
    }

    /// Learning rate used when the plan does not override it
    pub fn default_learning_rate(&self) -> f64 {
        match self {
            Self::Adam => 1e-3,
            Self::Sgd  => 1e-2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossKind {
    /// Multi-class, single-label loss against one-hot targets
    CategoricalCrossentropy,
    MeanSquaredError,
}

impl LossKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "categorical_crossentropy" => Some(Self::CategoricalCrossentropy),
            "mse" | "mean_squared_error" => Some(Self::MeanSquaredError),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    /// 60,000 train / 10,000 test handwritten digits
    Mnist,
    /// Small uniform-noise dataset with random labels, for smoke runs
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub optimizer:           OptimizerKind,
    pub loss:                LossKind,
    pub epochs:              usize,
    pub batch_size:          usize,
    /// Fraction of the training split held out for per-epoch validation
    pub validation_fraction: f64,
    pub learning_rate:       Option<f64>,
    pub dataset:             DatasetKind,
}

impl TrainingPlan {
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
            .unwrap_or_else(|| self.optimizer.default_learning_rate())
    }
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            optimizer:           OptimizerKind::Adam,
            loss:                LossKind::CategoricalCrossentropy,
            epochs:              2,
            batch_size:          64,
            validation_fraction: 0.1,
            learning_rate:       None,
            dataset:             DatasetKind::Mnist,
        }
    }
}

impl fmt::Display for TrainingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "optimizer={:?} lr={} loss={:?} epochs={} batch_size={} validation={} dataset={:?}",
            self.optimizer,
            self.learning_rate(),
            self.loss,
            self.epochs,
            self.batch_size,
            self.validation_fraction,
            self.dataset,
        )
    }
}

/// A named network together with how to train it
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name:         String,
    pub architecture: Architecture,
    pub plan:         TrainingPlan,
}

impl Program {
    /// The digit CNN trained for two epochs on MNIST
    pub fn digit_cnn() -> Self {
        Self {
            name:         "digit_cnn".to_string(),
            architecture: Architecture::digit_cnn(),
            plan:         TrainingPlan::default(),
        }
    }
}
