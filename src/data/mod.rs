// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a dataset on disk (or the network) to tensor batches:
//
//   DigitSource (loader)   → RawDigit: u8 pixels + label
//       │
//       ▼
//   Preprocessor           → DigitSample: [0,1] pixels + one-hot
//       │
//       ▼
//   split_validation       → train / validation hold-out
//       │
//       ▼
//   DigitDataset           → Burn's Dataset trait
//       │
//       ▼
//   DigitBatcher           → [N,H,W,C] images, [N,10] targets
//
// RandomSource skips the first two steps and yields samples directly.

/// MNIST via burn's downloader, or IDX files from a directory
pub mod loader;

/// Normalisation and one-hot encoding
pub mod preprocessor;

/// Random-noise fallback dataset
pub mod synthetic;

/// Implements Burn's Dataset trait for digit samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Validation hold-out
pub mod splitter;
