// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal each: a full training run, or a look at a network.
//
// Rules for this layer:
//   - No tensor math or model code here
//   - No command-line parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Build → load → train → evaluate
pub mod run_use_case;

// Summary table and training plan only
pub mod summary_use_case;
