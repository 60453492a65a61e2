// storefront/src/pipelines/contexts.rs

//! Data carried through each flow. Handlers receive these wrapped in
//! `storeflow::ContextData`.

use crate::models::{ExpandedOrder, Identity, OfferView, Order, PersonalizedOffer, Product};
use crate::state::AppState;
use crate::stores::Collection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

// --- Order cancellation ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredItem {
  pub product_id: Uuid,
  pub quantity: i32,
  pub stock_quantity: i32,
  pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorationFailure {
  pub product_id: Option<Uuid>,
  pub quantity: i32,
  pub error: String,
}

/// Per-item outcome of returning stock after a cancellation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestorationReport {
  pub restored: Vec<RestoredItem>,
  pub failures: Vec<RestorationFailure>,
  /// Items with no product reference or a non-positive quantity.
  pub skipped: usize,
}

#[derive(Clone)]
pub struct CancelOrderCtxData {
  pub app_state: AppState,
  pub bearer_token: Option<String>,
  pub raw_order_id: Option<String>,
  pub raw_reason: Option<String>,
  // Filled in by the flow:
  pub identity: Option<Identity>,
  pub order_id: Option<Uuid>,
  pub reason: Option<String>,
  pub order: Option<Order>,
  pub restoration: RestorationReport,
  pub notification_queued: bool,
  pub expanded: Option<ExpandedOrder>,
}

impl CancelOrderCtxData {
  pub fn new(app_state: AppState, bearer_token: Option<String>, order_id: Option<String>, reason: Option<String>) -> Self {
    Self {
      app_state,
      bearer_token,
      raw_order_id: order_id,
      raw_reason: reason,
      identity: None,
      order_id: None,
      reason: None,
      order: None,
      restoration: RestorationReport::default(),
      notification_queued: false,
      expanded: None,
    }
  }
}

// --- Offer resolution ---

#[derive(Clone)]
pub struct ResolveOfferCtxData {
  pub app_state: AppState,
  pub slug: String,
  pub now: DateTime<Utc>,
  pub product: Option<Product>,
  pub offer: Option<PersonalizedOffer>,
  pub view: Option<OfferView>,
}

impl ResolveOfferCtxData {
  pub fn new(app_state: AppState, slug: String, now: DateTime<Utc>) -> Self {
    Self {
      app_state,
      slug,
      now,
      product: None,
      offer: None,
      view: None,
    }
  }
}

// --- Account erasure ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOutcome {
  pub collection: Collection,
  pub deleted: Option<u64>,
  pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErasureReport {
  pub subject_id: Uuid,
  pub collections: Vec<CollectionOutcome>,
}

impl ErasureReport {
  pub fn succeeded(&self) -> bool {
    self.collections.iter().all(|c| c.error.is_none())
  }

  pub fn failed_collections(&self) -> Vec<Collection> {
    self
      .collections
      .iter()
      .filter(|c| c.error.is_some())
      .map(|c| c.collection)
      .collect()
  }
}

#[derive(Clone)]
pub struct EraseAccountCtxData {
  pub app_state: AppState,
  pub bearer_token: Option<String>,
  pub identity: Option<Identity>,
  pub report: Option<ErasureReport>,
}

impl EraseAccountCtxData {
  pub fn new(app_state: AppState, bearer_token: Option<String>) -> Self {
    Self {
      app_state,
      bearer_token,
      identity: None,
      report: None,
    }
  }
}
