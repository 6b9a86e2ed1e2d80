// ============================================================
// Layer 6 — Logging
// ============================================================
// One tracing-subscriber fmt subscriber for the whole process.
// The verbosity chosen on the command line sets the default
// level for this crate; RUST_LOG directives are added on top,
// so `RUST_LOG=burn=debug` still works.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogVerbosity {
    /// Warnings and errors only
    Quiet,
    #[default]
    Normal,
    Verbose,
}

impl LogVerbosity {
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Quiet   => "digit_cnn=warn",
            Self::Normal  => "digit_cnn=info",
            Self::Verbose => "digit_cnn=debug",
        }
    }

    pub fn env_filter(&self) -> EnvFilter {
        let filter = EnvFilter::from_default_env();
        match self.directive().parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(verbosity: LogVerbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(verbosity.env_filter())
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for v in [LogVerbosity::Quiet, LogVerbosity::Normal, LogVerbosity::Verbose] {
            assert!(v.directive().parse::<tracing_subscriber::filter::Directive>().is_ok());
        }
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(LogVerbosity::Quiet);
        init_tracing(LogVerbosity::Verbose);
    }
}
