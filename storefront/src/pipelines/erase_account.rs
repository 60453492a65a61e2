// storefront/src/pipelines/erase_account.rs

//! Unconditional removal of everything a registered account owns.

use crate::errors::{AppError, Result};
use crate::pipelines::contexts::{CollectionOutcome, EraseAccountCtxData, ErasureReport};
use crate::services::identity;
use crate::stores::{AccountStore, Collection};
use futures_util::future::join_all;
use storeflow::{ContextData, Flows, Pipeline, StepControl, StepPolicy};
use tracing::{event, instrument, Level};
use uuid::Uuid;

pub fn register_erase_account_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<EraseAccountCtxData, AppError>::new(&[
    ("authenticate_caller", StepPolicy::Required, None),
    ("erase_collections", StepPolicy::Required, None),
  ]);

  p.on("authenticate_caller", |ctx_data: ContextData<EraseAccountCtxData>| {
    Box::pin(async move {
      let (verifier, token) = {
        let guard = ctx_data.read();
        (guard.app_state.stores.identity.clone(), guard.bearer_token.clone())
      };
      let caller = identity::authenticate(verifier.as_ref(), token.as_deref()).await?;
      if caller.subject_id.is_none() {
        return Err(AppError::Unauthorized("Only registered accounts can be erased.".to_string()));
      }
      ctx_data.write().identity = Some(caller);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("erase_collections", |ctx_data: ContextData<EraseAccountCtxData>| {
    Box::pin(async move {
      let (accounts, subject_id) = {
        let guard = ctx_data.read();
        (
          guard.app_state.stores.accounts.clone(),
          guard.identity.as_ref().and_then(|i| i.subject_id),
        )
      };
      let subject_id =
        subject_id.ok_or_else(|| AppError::Internal("Subject missing from erasure context.".to_string()))?;

      let report = erase_all(accounts.as_ref(), subject_id).await;
      ctx_data.write().report = Some(report);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Erase-account pipeline registered.");
}

/// Deletes every collection concurrently. One failing collection never stops the others.
#[instrument(name = "erase_account::erase_all", skip(accounts))]
pub async fn erase_all(accounts: &dyn AccountStore, subject_id: Uuid) -> ErasureReport {
  let deletions = Collection::ALL.map(|collection| async move {
    let result: Result<u64> = accounts.delete_records(collection, subject_id).await;
    (collection, result)
  });

  let collections = join_all(deletions)
    .await
    .into_iter()
    .map(|(collection, result)| match result {
      Ok(deleted) => {
        event!(Level::DEBUG, %collection, deleted, "Collection erased.");
        CollectionOutcome {
          collection,
          deleted: Some(deleted),
          error: None,
        }
      }
      Err(e) => {
        event!(Level::ERROR, %collection, error = %e, "Collection erase failed.");
        CollectionOutcome {
          collection,
          deleted: None,
          error: Some(e.to_string()),
        }
      }
    })
    .collect();

  ErasureReport {
    subject_id,
    collections,
  }
}
