// storefront/src/web/handlers/account_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{error, info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::EraseAccountCtxData;
use crate::state::AppState;
use crate::web::extractors::BearerToken;
use storeflow::ContextData;

#[instrument(name = "handler::erase_account", skip(app_state, token))]
pub async fn erase_account_handler(app_state: web::Data<AppState>, token: BearerToken) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(EraseAccountCtxData::new(app_state.get_ref().clone(), token.into_inner()));

  app_state.flows.run(ctx_data.clone()).await?;

  let report = ctx_data
    .with(|d| d.report.clone())
    .ok_or_else(|| AppError::Internal("Erasure completed without a report.".to_string()))?;

  if report.succeeded() {
    info!(subject_id = %report.subject_id, "Account erased.");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Account erased.",
        "report": report,
    })))
  } else {
    let failed = report.failed_collections();
    error!(subject_id = %report.subject_id, ?failed, "Account erasure incomplete.");
    Ok(HttpResponse::InternalServerError().json(json!({
        "error": "Account erasure incomplete.",
        "report": report,
    })))
  }
}
