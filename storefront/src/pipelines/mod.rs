// storefront/src/pipelines/mod.rs

//! Defines and registers every flow the storefront runs.

use crate::errors::AppError;
use storeflow::Flows;

pub mod contexts;

pub mod cancel_order;
pub mod erase_account;
pub mod resolve_offer;

/// Called once while building `AppState`.
pub fn register_all_pipelines(flows: &Flows<AppError>) {
  tracing::info!("Registering storefront pipelines...");

  cancel_order::register_cancel_order_pipeline(flows);
  resolve_offer::register_resolve_offer_pipeline(flows);
  erase_account::register_erase_account_pipeline(flows);

  tracing::info!(count = flows.len(), "All storefront pipelines registered.");
}
