// ============================================================
// Layer 2 — SummaryUseCase
// ============================================================
// Resolves a program and reports its architecture and training
// plan without loading data or allocating tensors.

use anyhow::Result;
use std::path::PathBuf;

use crate::domain::{architecture::Summary, plan::{Program, TrainingPlan}};
use crate::dsl;

pub struct SummaryUseCase {
    model_path: Option<PathBuf>,
}

/// What `digit-cnn summary` prints
#[derive(Debug)]
pub struct ProgramOverview {
    pub summary: Summary,
    pub plan:    TrainingPlan,
}

impl SummaryUseCase {
    pub fn new(model_path: Option<PathBuf>) -> Self {
        Self { model_path }
    }

    pub fn execute(&self) -> Result<ProgramOverview> {
        let program = match &self.model_path {
            Some(path) => dsl::load_file(path)?,
            None       => Program::digit_cnn(),
        };
        let summary = program.architecture.summary(&program.name)?;
        tracing::debug!("Summarised '{}': {} parameters", program.name, summary.total_params);
        Ok(ProgramOverview { summary, plan: program.plan })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_overview() {
        let overview = SummaryUseCase::new(None).execute().unwrap();
        assert_eq!(overview.summary.name, "digit_cnn");
        assert_eq!(overview.summary.total_params, 402_442);
        assert_eq!(overview.plan, TrainingPlan::default());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = SummaryUseCase::new(Some(PathBuf::from("no/such/network.nn"))).execute();
        assert!(result.is_err());
    }
}
