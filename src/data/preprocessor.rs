// ============================================================
// Layer 4 — Digit Preprocessor
// ============================================================
// Turns RawDigits into model-ready samples:
//
//   1. Check the pixel count matches the input layer (H×W×C)
//   2. Cast u8 → f32 and divide by 255 so every pixel is in [0, 1]
//   3. One-hot encode the label into a `classes`-wide vector
//
// The pixel buffer is already row-major, so "reshaping" to
// (H, W, C) is only a length check; the batcher attaches the
// actual tensor shape.

use anyhow::{ensure, Result};

use crate::data::dataset::DigitSample;
use crate::domain::digit::RawDigit;
use crate::domain::layer::InputSpec;

pub struct Preprocessor {
    input:   InputSpec,
    classes: usize,
}

impl Preprocessor {
    pub fn new(input: InputSpec, classes: usize) -> Self {
        Self { input, classes }
    }

    /// Number of scalars one sample must provide
    pub fn sample_len(&self) -> usize {
        self.input.height * self.input.width * self.input.channels
    }

    /// Preprocess a single image
    pub fn sample(&self, raw: &RawDigit) -> Result<DigitSample> {
        ensure!(
            raw.pixels.len() == self.sample_len(),
            "image has {} pixels but the input layer expects {}x{}x{} = {}",
            raw.pixels.len(),
            self.input.height,
            self.input.width,
            self.input.channels,
            self.sample_len()
        );
        ensure!(
            (raw.label as usize) < self.classes,
            "label {} is outside 0..{}",
            raw.label,
            self.classes
        );

        Ok(DigitSample {
            pixels: normalize(&raw.pixels),
            label:  raw.label,
            target: one_hot(raw.label as usize, self.classes),
        })
    }

    /// Preprocess a whole split, keeping order
    pub fn process(&self, raws: &[RawDigit]) -> Result<Vec<DigitSample>> {
        raws.iter().map(|raw| self.sample(raw)).collect()
    }
}

/// 0..=255 → 0.0..=1.0
pub fn normalize(pixels: &[u8]) -> Vec<f32> {
    pixels.iter().map(|&p| p as f32 / 255.0).collect()
}

/// A `classes`-wide vector with a single 1.0 at `label`
pub fn one_hot(label: usize, classes: usize) -> Vec<f32> {
    let mut v = vec![0.0; classes];
    if let Some(slot) = v.get_mut(label) {
        *slot = 1.0;
    }
    v
}
