// storeflow/src/pipeline/definition.rs

//! `Pipeline<TData, Err>` and its structural methods.

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StepDef, StepPolicy};
use crate::error::FlowError;
use std::collections::HashMap;

/// An ordered set of steps run against `ContextData<TData>`.
///
/// `Err` is what handlers return and what `run` fails with; it must absorb
/// engine errors through `From<FlowError>`.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(name, policy, skip_if)` tuples, in run order.
  pub fn new(step_defs: &[(&str, StepPolicy, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, policy, skip_if)| StepDef {
        name: (*name).to_string(),
        policy: *policy,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      steps,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  /// Step names in run order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn has_step(&self, step_name: &str) -> bool {
    self.steps.iter().any(|s| s.name == step_name)
  }

  fn position(&self, step_name: &str) -> usize {
    match self.steps.iter().position(|s| s.name == step_name) {
      Some(idx) => idx,
      // Wiring a handler to an unknown step is a programming error, caught at startup.
      None => panic!("Storeflow setup error: step '{}' is not defined in this pipeline.", step_name),
    }
  }

  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    let _ = self.position(step_name);
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.has_step(step_name) {
      panic!("Storeflow setup error: step '{}' is already defined.", step_name);
    }
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    policy: StepPolicy,
    skip_if: Option<SkipCondition<TData>>,
  ) {
    let idx = self.position(existing_step_name);
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name);
    self.steps.insert(idx + 1, StepDef { name, policy, skip_if });
  }

  /// Removes a step and its handlers. Unknown names are ignored.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.steps.iter().position(|s| s.name == step_name) {
      self.steps.remove(idx);
      self.before.remove(step_name);
      self.on.remove(step_name);
      self.after.remove(step_name);
    }
  }

  pub fn set_policy(&mut self, step_name: &str, policy: StepPolicy) {
    let idx = self.position(step_name);
    if let Some(step) = self.steps.get_mut(idx) {
      step.policy = policy;
    }
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    let idx = self.position(step_name);
    if let Some(step) = self.steps.get_mut(idx) {
      step.skip_if = skip_if;
    }
  }
}
