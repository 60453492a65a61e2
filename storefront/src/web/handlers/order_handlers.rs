// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::ExpandedOrder;
use crate::pipelines::contexts::CancelOrderCtxData;
use crate::state::AppState;
use crate::web::extractors::BearerToken;
use storeflow::{ContextData, FlowOutcome};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequestPayload {
  pub order_id: Option<String>,
  pub reason: Option<String>,
}

#[instrument(
    name = "handler::cancel_order",
    skip(app_state, token, req_payload),
    fields(order_id = ?req_payload.order_id)
)]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  token: BearerToken,
  req_payload: web::Json<CancelOrderRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(CancelOrderCtxData::new(
    app_state.get_ref().clone(),
    token.into_inner(),
    payload.order_id,
    payload.reason,
  ));

  let report = app_state.flows.run(ctx_data.clone()).await?;
  if report.outcome == FlowOutcome::Stopped {
    return Err(AppError::Internal("Cancellation was halted by an internal step.".to_string()));
  }
  for step in report.tolerated() {
    warn!(step = %step.name, status = ?step.status, "Cancellation side effect did not complete.");
  }

  let (order, expanded, restoration) = {
    let guard = ctx_data.read();
    (guard.order.clone(), guard.expanded.clone(), guard.restoration.clone())
  };
  let order = order.ok_or_else(|| AppError::Internal("Cancellation completed without an order.".to_string()))?;
  info!(
    order_id = %order.id,
    restored = restoration.restored.len(),
    restore_failures = restoration.failures.len(),
    "Order cancelled."
  );

  let order_view = expanded.unwrap_or_else(|| ExpandedOrder::minimal(order));
  Ok(HttpResponse::Ok().json(json!({
      "message": "Order cancelled successfully.",
      "order": order_view,
  })))
}
