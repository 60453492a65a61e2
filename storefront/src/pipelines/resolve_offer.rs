// storefront/src/pipelines/resolve_offer.rs

use crate::errors::{AppError, Resource};
use crate::models::{OfferPricing, OfferView};
use crate::pipelines::contexts::ResolveOfferCtxData;
use storeflow::{ContextData, Flows, Pipeline, StepControl, StepPolicy};
use tracing::{event, Level};

/// Read-only: product by slug, its newest usable offer, derived prices.
pub fn register_resolve_offer_pipeline(flows: &Flows<AppError>) {
  let mut p = Pipeline::<ResolveOfferCtxData, AppError>::new(&[
    ("load_product", StepPolicy::Required, None),
    ("load_offer", StepPolicy::Required, None),
    ("price_offer", StepPolicy::Required, None),
  ]);

  p.on("load_product", |ctx_data: ContextData<ResolveOfferCtxData>| {
    Box::pin(async move {
      let (products, slug) = {
        let guard = ctx_data.read();
        (guard.app_state.stores.products.clone(), guard.slug.clone())
      };

      let product = products.find_by_slug(&slug).await?.ok_or_else(|| {
        event!(Level::INFO, %slug, "No product for slug.");
        AppError::NotFound(Resource::Product)
      })?;
      event!(Level::DEBUG, %slug, product_id = %product.id, "Product found for offer lookup.");
      ctx_data.write().product = Some(product);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("load_offer", |ctx_data: ContextData<ResolveOfferCtxData>| {
    Box::pin(async move {
      let (offers, product_id, now) = {
        let guard = ctx_data.read();
        (
          guard.app_state.stores.offers.clone(),
          guard.product.as_ref().map(|p| p.id),
          guard.now,
        )
      };
      let product_id =
        product_id.ok_or_else(|| AppError::Internal("Product missing from offer context.".to_string()))?;

      let offer = offers
        .latest_usable_for_product(product_id, now)
        .await?
        .ok_or(AppError::NotFound(Resource::Offer))?;
      event!(Level::DEBUG, %product_id, offer_id = %offer.id, "Usable offer found.");
      ctx_data.write().offer = Some(offer);
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  p.on("price_offer", |ctx_data: ContextData<ResolveOfferCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let (Some(product), Some(offer)) = (guard.product.clone(), guard.offer.clone()) else {
        return Err(AppError::Internal("Product or offer missing from offer context.".to_string()));
      };
      let pricing = OfferPricing::compute(product.price_cents, offer.discount_percent, offer.expires_at, guard.now);
      guard.view = Some(OfferView::new(offer, product, pricing));
      Ok::<_, AppError>(StepControl::Continue)
    })
  });

  flows.register(p);
  tracing::info!("Resolve-offer pipeline registered.");
}
