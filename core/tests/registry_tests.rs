// tests/registry_tests.rs
mod common;

use common::*;
use storeflow::{ContextData, FlowError, FlowOutcome, Flows, Pipeline, StepControl, StepPolicy};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CancelLikeContext {
  status: String,
}
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct PricingLikeContext {
  cents: i64,
}

#[tokio::test]
async fn test_registry_dispatches_by_context_type() {
  setup_tracing();
  let flows = Flows::<TestError>::new();
  assert!(flows.is_empty());

  let mut p_cancel = Pipeline::<CancelLikeContext, TestError>::new(&[("cancel", StepPolicy::Required, None)]);
  p_cancel.on("cancel", |ctx: ContextData<CancelLikeContext>| {
    Box::pin(async move {
      ctx.write().status = "Cancelled".to_string();
      Ok::<StepControl, FlowError>(StepControl::Continue)
    })
  });
  flows.register(p_cancel);

  let mut p_price = Pipeline::<PricingLikeContext, TestError>::new(&[("price", StepPolicy::Required, None)]);
  p_price.on("price", |ctx: ContextData<PricingLikeContext>| {
    Box::pin(async move {
      ctx.write().cents = 7500;
      Ok::<StepControl, FlowError>(StepControl::Continue)
    })
  });
  flows.register(p_price);

  assert_eq!(flows.len(), 2);
  assert!(flows.is_registered::<CancelLikeContext>());

  let ctx_cancel = ContextData::new(CancelLikeContext::default());
  let report = flows.run(ctx_cancel.clone()).await.unwrap();
  assert_eq!(report.outcome, FlowOutcome::Completed);
  assert_eq!(ctx_cancel.read().status, "Cancelled");

  let ctx_price = ContextData::new(PricingLikeContext::default());
  let report = flows.run(ctx_price.clone()).await.unwrap();
  assert!(report.is_completed());
  assert_eq!(ctx_price.read().cents, 7500);
}

#[tokio::test]
async fn test_registry_flow_not_registered() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  #[derive(Clone, Debug, Default)]
  struct UnregisteredContext;

  let result = flows.run(ContextData::new(UnregisteredContext)).await;

  match result {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("Expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registry_propagates_pipeline_error() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  let mut p_cancel = Pipeline::<CancelLikeContext, TestError>::new(&[("cancel", StepPolicy::Required, None)]);
  p_cancel.on("cancel", |_ctx: ContextData<CancelLikeContext>| {
    Box::pin(async move { Err::<StepControl, _>(TestError::Handler("order store unavailable".to_string())) })
  });
  flows.register(p_cancel);

  let result = flows.run(ContextData::new(CancelLikeContext::default())).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("order store unavailable".to_string()));
}

#[tokio::test]
async fn test_registry_with_default_error_type() {
  setup_tracing();
  let flows: Flows = Flows::default();

  #[derive(Clone, Debug, Default)]
  struct SimpleCtx {
    count: i32,
  }

  let mut pipeline = Pipeline::<SimpleCtx, FlowError>::new(&[("task", StepPolicy::Required, None)]);
  pipeline.on("task", |ctx: ContextData<SimpleCtx>| {
    Box::pin(async move {
      ctx.write().count = 1;
      Ok::<StepControl, FlowError>(StepControl::Continue)
    })
  });
  flows.register(pipeline);

  let ctx = ContextData::new(SimpleCtx::default());
  assert!(flows.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().count, 1);
}

#[tokio::test]
async fn test_registering_twice_replaces_flow() {
  setup_tracing();
  let flows = Flows::<TestError>::new();

  for value in [1_i64, 2] {
    let mut p = Pipeline::<PricingLikeContext, TestError>::new(&[("price", StepPolicy::Required, None)]);
    p.on("price", move |ctx: ContextData<PricingLikeContext>| {
      Box::pin(async move {
        ctx.write().cents = value;
        Ok::<StepControl, FlowError>(StepControl::Continue)
      })
    });
    flows.register(p);
  }

  assert_eq!(flows.len(), 1);
  let ctx = ContextData::new(PricingLikeContext::default());
  flows.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().cents, 2);
}
