// ============================================================
// Layer 4 — Digit Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N DigitSamples into
//
//   images  [N, H, W, C]  float, channels-last
//   targets [N, classes]  float, one-hot
//   labels  [N]           int, class ids (for accuracy)
//
// Every sample has the same length after preprocessing, so the
// flat buffers reshape directly.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::DigitSample;
use crate::domain::layer::InputSpec;

#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    pub images:  Tensor<B, 4>,
    pub targets: Tensor<B, 2>,
    pub labels:  Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    pub device: B::Device,
    input:      InputSpec,
    classes:    usize,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device, input: InputSpec, classes: usize) -> Self {
        Self { device, input, classes }
    }
}

impl<B: Backend> Batcher<DigitSample, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<DigitSample>) -> DigitBatch<B> {
        let batch_size = items.len();
        let InputSpec { height, width, channels } = self.input;

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let targets: Vec<f32> = items
            .iter()
            .flat_map(|s| s.target.iter().copied())
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, height, width, channels]);

        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, self.classes]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        DigitBatch { images, targets, labels }
    }
}
