// ============================================================
// Layer 4 — Random Dataset
// ============================================================
// When a description names no dataset, training runs on 100
// images of uniform noise in [0, 1) with uniformly drawn labels.
// Nothing can be learned from it; it exercises the full
// build → fit path quickly and without a download.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::dataset::DigitSample;
use crate::data::preprocessor::one_hot;
use crate::domain::layer::InputSpec;

/// Size of the random training set
pub const RANDOM_SAMPLES: usize = 100;

pub struct RandomSource {
    input:   InputSpec,
    classes: usize,
    seed:    u64,
}

impl RandomSource {
    pub fn new(input: InputSpec, classes: usize, seed: u64) -> Self {
        Self { input, classes, seed }
    }

    pub fn samples(&self) -> Vec<DigitSample> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let len = self.input.height * self.input.width * self.input.channels;

        (0..RANDOM_SAMPLES)
            .map(|_| {
                let pixels: Vec<f32> = (0..len).map(|_| rng.gen::<f32>()).collect();
                let label = rng.gen_range(0..self.classes);
                DigitSample { pixels, label: label as u8, target: one_hot(label, self.classes) }
            })
            .collect()
    }
}
