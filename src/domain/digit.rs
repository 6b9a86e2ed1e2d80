// ============================================================
// Layer 3 — Digit Domain Types
// ============================================================
// Plain data records for the two dataset splits. A RawDigit is
// what a source hands over: 8-bit grayscale pixels in row-major
// order plus the integer class. Preprocessing into float tensors
// happens in the data layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of the dataset to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test  => write!(f, "test"),
        }
    }
}

/// One unprocessed image as delivered by a DigitSource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDigit {
    /// Row-major pixel intensities, 0 = background, 255 = ink
    pub pixels: Vec<u8>,
    /// Class id in 0..=9
    pub label:  u8,
}

impl RawDigit {
    pub fn new(pixels: Vec<u8>, label: u8) -> Self {
        Self { pixels, label }
    }
}
