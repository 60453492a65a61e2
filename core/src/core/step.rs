// storeflow/src/core/step.rs

//! Step definitions: name, failure policy and skip condition.

use super::ContextData;
use std::sync::Arc;

/// Evaluated before a step runs; returning `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// What a handler error in this step does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
  /// The step must have handlers and any handler error ends the run with that error.
  Required,
  /// Handler errors are logged and recorded as tolerated; the run moves on to
  /// the next step. A best-effort step without handlers is skipped.
  BestEffort,
}

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub policy: StepPolicy,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> StepDef<T> {
  pub fn is_best_effort(&self) -> bool {
    self.policy == StepPolicy::BestEffort
  }
}

// SkipCondition has no Debug impl.
impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("policy", &self.policy)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
