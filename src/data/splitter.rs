// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Holds out a fraction of the training split for per-epoch
// validation. Two policies:
//
//   Tail     — the validation set is the contiguous, unshuffled
//              last part of the split: train = first ⌊n·(1−f)⌋,
//              validation = the rest. This is what Keras'
//              `validation_split` does.
//   Shuffled — Fisher-Yates shuffle with a seeded StdRng first,
//              then the same cut.
//
// MNIST's training file is not sorted by class, so Tail still
// yields a mixed validation set.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationPolicy {
    #[default]
    Tail,
    Shuffled,
}

/// Split `samples` into (train, validation) holding out `validation_fraction`.
///
/// `validation_fraction` is expected in [0, 1); values outside are clamped.
pub fn split_validation<T>(
    mut samples: Vec<T>,
    validation_fraction: f64,
    policy: ValidationPolicy,
    seed: u64,
) -> (Vec<T>, Vec<T>) {
    if policy == ValidationPolicy::Shuffled {
        let mut rng = StdRng::seed_from_u64(seed);
        samples.shuffle(&mut rng);
    }

    let total    = samples.len();
    let fraction = validation_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * (1.0 - fraction)).floor() as usize;
    let split_at = split_at.min(total);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Validation split ({:?}): {} training, {} validation",
        policy,
        samples.len(),
        val.len(),
    );

    (samples, val)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_split_of_full_mnist_training_set() {
        let items: Vec<usize> = (0..60_000).collect();
        let (train, val) = split_validation(items, 0.1, ValidationPolicy::Tail, 0);
        assert_eq!(train.len(), 54_000);
        assert_eq!(val.len(), 6_000);
    }

    #[test]
    fn test_tail_split_is_contiguous_and_ordered() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val) = split_validation(items, 0.1, ValidationPolicy::Tail, 0);
        assert_eq!(train, (0..90).collect::<Vec<_>>());
        assert_eq!(val, (90..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_fraction_keeps_everything_for_training() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val) = split_validation(items, 0.0, ValidationPolicy::Tail, 0);
        assert_eq!(train.len(), 10);
        assert!(val.is_empty());
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val) = split_validation(Vec::<usize>::new(), 0.1, ValidationPolicy::Tail, 0);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }

    #[test]
    fn test_shuffled_split_preserves_items_and_is_seeded() {
        let items: Vec<usize> = (0..200).collect();
        let (train_a, val_a) = split_validation(items.clone(), 0.25, ValidationPolicy::Shuffled, 7);
        let (train_b, val_b) = split_validation(items, 0.25, ValidationPolicy::Shuffled, 7);
        assert_eq!(train_a.len(), 150);
        assert_eq!(val_a.len(), 50);
        assert_eq!(train_a, train_b);
        assert_eq!(val_a, val_b);

        let mut all: Vec<usize> = train_a.into_iter().chain(val_a).collect();
        all.sort_unstable();
        assert_eq!(all, (0..200).collect::<Vec<_>>());
    }
}
