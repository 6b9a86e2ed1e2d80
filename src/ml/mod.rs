// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All tensor work lives here: building the classifier from an
// Architecture, the loss, the training loop and evaluation.
//
//   model.rs     — DigitClassifier: conv/pool feature extractor
//                  followed by a dense head, NHWC input
//
//   loss.rs      — Objective: categorical cross-entropy or MSE
//                  on top of the network's output activation,
//                  plus arg-max accuracy
//
//   trainer.rs   — Epoch loop: forward, loss, backward, Adam or
//                  SGD step, per-epoch validation
//
//   evaluator.rs — Batched, gradient-free loss/accuracy over a
//                  held-out set
//
//   backend.rs   — CPU (NdArray) and GPU (Wgpu) backend aliases
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Kingma & Ba (2015) Adam

/// CNN classifier built from an Architecture
pub mod model;

/// Loss functions and accuracy
pub mod loss;

/// Training loop with per-epoch validation
pub mod trainer;

/// Held-out evaluation
pub mod evaluator;

/// Backend aliases and devices
pub mod backend;
