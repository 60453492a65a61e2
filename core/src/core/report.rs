// storeflow/src/core/report.rs

//! Per-run record of what happened to each step.

use crate::core::control::FlowOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
  /// All handlers of the step ran and returned `Continue`.
  Ran,
  /// Skipped by its skip condition, or best-effort with no handlers.
  Skipped,
  /// A handler of this step returned `Stop`.
  Stopped,
  /// A best-effort step failed; the error was logged and the run continued.
  Tolerated { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
  pub name: String,
  pub status: StepStatus,
}

/// Result of a run that did not end in an error.
///
/// Steps that never started (after a stop) do not appear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
  pub outcome: FlowOutcome,
  pub steps: Vec<StepRecord>,
}

impl FlowReport {
  pub(crate) fn new() -> Self {
    Self {
      outcome: FlowOutcome::Completed,
      steps: Vec::new(),
    }
  }

  pub(crate) fn record(&mut self, name: &str, status: StepStatus) {
    self.steps.push(StepRecord {
      name: name.to_string(),
      status,
    });
  }

  pub fn is_completed(&self) -> bool {
    self.outcome == FlowOutcome::Completed
  }

  pub fn status_of(&self, step_name: &str) -> Option<&StepStatus> {
    self.steps.iter().find(|s| s.name == step_name).map(|s| &s.status)
  }

  /// Best-effort steps whose failure was swallowed during this run.
  pub fn tolerated(&self) -> impl Iterator<Item = &StepRecord> {
    self
      .steps
      .iter()
      .filter(|s| matches!(s.status, StepStatus::Tolerated { .. }))
  }
}
