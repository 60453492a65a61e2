// storeflow/src/core/control.rs

//! Signals for controlling flow execution and the outcome of a run.

/// Signal from a handler indicating whether the flow should go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  /// Continue with the remaining handlers of this step and the next steps.
  Continue,
  /// Halt the flow. No further handlers or steps run.
  Stop,
}

/// How a run ended when no error escaped it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every step was run, skipped, or tolerated.
  Completed,
  /// A handler returned `StepControl::Stop`.
  Stopped,
}
