// storefront/src/web/handlers/offer_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use tracing::instrument;

use crate::errors::AppError;
use crate::pipelines::contexts::ResolveOfferCtxData;
use crate::state::AppState;
use storeflow::ContextData;

#[instrument(name = "handler::resolve_offer", skip(app_state, path), fields(slug = %path.as_str()))]
pub async fn resolve_offer_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let slug = path.into_inner();
  let ctx_data = ContextData::new(ResolveOfferCtxData::new(app_state.get_ref().clone(), slug, Utc::now()));

  app_state.flows.run(ctx_data.clone()).await?;

  let view = ctx_data
    .with(|d| d.view.clone())
    .ok_or_else(|| AppError::Internal("Offer resolution completed without a result.".to_string()))?;
  Ok(HttpResponse::Ok().json(view))
}
