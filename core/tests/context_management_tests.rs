// tests/context_management_tests.rs
mod common;

use common::*;
use serial_test::serial;
use storeflow::{ContextData, FlowError, Pipeline, StepControl, StepPolicy};

#[tokio::test]
#[serial]
async fn test_context_data_is_shared_between_steps() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("load", StepPolicy::Required, None),
    ("mutate", StepPolicy::Required, None),
  ]);

  pipeline.on("load", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.update(|data| {
        data.counter = 10;
        data.message = "Loaded".to_string();
      });
      Ok::<StepControl, FlowError>(StepControl::Continue)
    })
  });

  pipeline.on("mutate", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let (counter, message) = ctx.with(|data| (data.counter, data.message.clone()));
      assert_eq!(counter, 10);
      assert_eq!(message, "Loaded");
      ctx.update(|data| {
        data.counter += 5;
        data.message.push_str("_Mutated");
      });
      Ok::<StepControl, FlowError>(StepControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let snapshot = ctx.snapshot();
  assert_eq!(snapshot.counter, 15);
  assert_eq!(snapshot.message, "Loaded_Mutated");
}

#[tokio::test]
#[serial]
async fn test_context_data_clone_shares_data() {
  setup_tracing();
  let original_ctx = ContextData::new(TestContext {
    counter: 1,
    ..Default::default()
  });
  let cloned_ctx = original_ctx.clone();

  original_ctx.write().counter = 5;
  assert_eq!(cloned_ctx.read().counter, 5);

  cloned_ctx.write().counter = 10;
  assert_eq!(original_ctx.read().counter, 10);
}

#[tokio::test]
#[serial]
async fn test_snapshot_is_detached() {
  setup_tracing();
  let ctx = ContextData::new(TestContext::default());
  let before = ctx.snapshot();
  ctx.update(|data| data.counter = 3);
  assert_eq!(before.counter, 0);
  assert_eq!(ctx.snapshot().counter, 3);
}

#[tokio::test]
#[serial]
async fn test_context_data_locks_released_across_await() {
  setup_tracing();
  let ctx = ContextData::new(TestContext::default());

  let handler_logic = async {
    let initial_count = ctx.with(|data| data.counter);

    tokio::time::sleep(std::time::Duration::from_millis(1)).await;

    ctx.update(|data| data.counter = initial_count + 1);
  };

  handler_logic.await;
  assert_eq!(ctx.read().counter, 1);
}
