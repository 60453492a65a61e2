// storeflow/src/pipeline/execution.rs

//! `Pipeline::run()`: executes steps in order and builds the `FlowReport`.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{FlowOutcome, StepControl};
use crate::core::report::{FlowReport, StepStatus};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use crate::pipeline::hooks::Phase;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Executes the pipeline against `ctx_data`.
  ///
  /// A `Required` step with no handlers fails with `FlowError::HandlerMissing`
  /// converted into `Err`. A handler error in a `Required` step is returned as
  /// is; in a `BestEffort` step it is logged, recorded as
  /// `StepStatus::Tolerated` and the remaining phases of that step are skipped.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            context_data_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<FlowReport, Err> {
    event!(Level::DEBUG, "Flow execution starting.");
    let mut report = FlowReport::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = info_span!(
        "flow_step",
        step_name = step_name,
        step_index = step_idx,
        best_effort = step_def.is_best_effort()
      );

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          step_span.in_scope(|| event!(Level::DEBUG, "Step skipped by its skip condition."));
          report.record(step_name, StepStatus::Skipped);
          continue;
        }
      }

      let phases = [
        (Phase::Before, self.before.get(step_name)),
        (Phase::On, self.on.get(step_name)),
        (Phase::After, self.after.get(step_name)),
      ];
      let has_handlers = phases.iter().any(|(_, h)| h.is_some_and(|v| !v.is_empty()));

      if !has_handlers {
        if step_def.is_best_effort() {
          step_span.in_scope(|| event!(Level::DEBUG, "Best-effort step has no handlers, skipping."));
          report.record(step_name, StepStatus::Skipped);
          continue;
        }
        step_span.in_scope(|| event!(Level::ERROR, "Required step has no handlers."));
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_result = async {
        for (phase, handlers) in phases {
          if let Some(handlers) = handlers {
            if run_phase(phase, handlers, &ctx_data).await? == StepControl::Stop {
              return Ok(StepControl::Stop);
            }
          }
        }
        Ok::<_, Err>(StepControl::Continue)
      }
      .instrument(step_span.clone())
      .await;

      match step_result {
        Ok(StepControl::Continue) => report.record(step_name, StepStatus::Ran),
        Ok(StepControl::Stop) => {
          step_span.in_scope(|| event!(Level::INFO, "Flow stopped by a handler."));
          report.record(step_name, StepStatus::Stopped);
          report.outcome = FlowOutcome::Stopped;
          return Ok(report);
        }
        Err(e) if step_def.is_best_effort() => {
          step_span.in_scope(|| event!(Level::WARN, error = %e, "Best-effort step failed; continuing."));
          report.record(step_name, StepStatus::Tolerated { error: e.to_string() });
        }
        Err(e) => {
          step_span.in_scope(|| event!(Level::ERROR, error = %e, "Step failed."));
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, "Flow execution completed.");
    Ok(report)
  }
}

async fn run_phase<TData, Err>(
  phase: Phase,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<StepControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for (handler_idx, handler_fn) in handlers.iter().enumerate() {
    event!(Level::TRACE, phase = phase.as_str(), handler_index = handler_idx, "Executing handler.");
    if handler_fn(ctx_data.clone()).await? == StepControl::Stop {
      return Ok(StepControl::Stop);
    }
  }
  Ok(StepControl::Continue)
}
