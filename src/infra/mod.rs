// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that belong to no single layer:
//
//   logging.rs — tracing subscriber setup from the chosen
//                verbosity
//
//   metrics.rs — epoch and evaluation metrics, the epoch
//                progress line and the JSON run report
//
// Reference: Rust Book §9 (Error Handling with anyhow)

/// tracing-subscriber initialisation
pub mod logging;

/// Training / evaluation metrics and run report
pub mod metrics;
