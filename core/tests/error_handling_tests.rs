// tests/error_handling_tests.rs
mod common;
use common::*;
use serial_test::serial;
use storeflow::{ContextData, FlowError, Pipeline, StepControl, StepPolicy, StepStatus};

#[tokio::test]
#[serial]
async fn test_pipeline_with_flow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("task", StepPolicy::Required, None)]);

  pipeline.on("task", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter = 1;
      Ok::<StepControl, FlowError>(StepControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().counter, 1);

  let mut failing = Pipeline::<TestContext, FlowError>::new(&[("fail_task", StepPolicy::Required, None)]);
  failing.on("fail_task", |_ctx| {
    Box::pin(async move { Err::<StepControl, _>(FlowError::Internal("inventory ledger locked".to_string())) })
  });
  match failing.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::Internal(s)) => assert_eq!(s, "inventory ledger locked"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_anyhow_handler_errors_become_handler_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("lookup", StepPolicy::Required, None)]);
  pipeline.on("lookup", |_ctx| {
    Box::pin(async move {
      let parsed: Result<i32, _> = "not-a-number".parse::<i32>();
      let _value = parsed.map_err(|e| FlowError::from(anyhow::Error::new(e).context("parsing quantity")))?;
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });

  match pipeline.run(ContextData::new(TestContext::default())).await {
    Err(FlowError::HandlerError { source }) => assert!(source.to_string().contains("parsing quantity")),
    other => panic!("Expected FlowError::HandlerError, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_tolerated_error_message_is_recorded() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[
    ("side_effect", StepPolicy::BestEffort, None),
    ("finish", StepPolicy::Required, None),
  ]);
  pipeline.on("side_effect", |_ctx| {
    Box::pin(async move { Err::<StepControl, _>(FlowError::Internal("smtp timeout".to_string())) })
  });
  pipeline.on("finish", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().counter += 1;
      Ok::<_, FlowError>(StepControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  let report = pipeline.run(ctx.clone()).await.unwrap();

  assert!(report.is_completed());
  assert_eq!(
    report.status_of("side_effect"),
    Some(&StepStatus::Tolerated {
      error: "Internal flow error: smtp timeout".to_string()
    })
  );
  assert_eq!(ctx.read().counter, 1);
}
