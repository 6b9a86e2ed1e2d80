use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One preprocessed image, pixels laid out H×W×C in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitSample {
    pub pixels: Vec<f32>,
    pub label:  u8,
    /// One-hot encoding of `label`
    pub target: Vec<f32>,
}

pub struct DigitDataset {
    samples: Vec<DigitSample>,
}

impl DigitDataset {
    pub fn new(samples: Vec<DigitSample>) -> Self { Self { samples } }
}

impl Dataset<DigitSample> for DigitDataset {
    fn get(&self, index: usize) -> Option<DigitSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
