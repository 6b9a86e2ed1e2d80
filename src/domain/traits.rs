// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer loads data through DigitSource and never
// learns whether the images came from burn's MNIST downloader or
// from IDX files already on disk.
//
// Implementations:
//   - BurnMnistSource → downloads and caches MNIST via burn
//   - IdxDirSource    → reads IDX files from a local directory

use anyhow::Result;

use crate::domain::digit::{RawDigit, Split};

/// Any component that can deliver a labelled digit split.
pub trait DigitSource {
    /// Load every image of the requested split, in file order.
    fn load(&self, split: Split) -> Result<Vec<RawDigit>>;

    /// Short human-readable origin, used in log lines
    fn describe(&self) -> String;
}
