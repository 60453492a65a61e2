// storefront/src/stores/mod.rs

//! Repository seams. Flows only see these traits; `AppState` holds one
//! implementation of each, built at startup.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{ExpandedOrder, Order, OrderStatus, PersonalizedOffer, Product};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>>;

  /// Inserts or fully replaces the order, items included.
  async fn save(&self, order: &Order) -> Result<Order>;

  /// The order with item products and the address resolved.
  async fn find_by_id_with_expansions(&self, id: Uuid) -> Result<Option<ExpandedOrder>>;

  /// Moves the order from `expected` to `next` only if it is still in
  /// `expected`. A non-`None` `reason` replaces the stored cancellation
  /// reason. Returns `None` when the order is missing or its status changed.
  async fn compare_and_set_status(
    &self,
    id: Uuid,
    expected: OrderStatus,
    next: OrderStatus,
    reason: Option<String>,
  ) -> Result<Option<Order>>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
  async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>>;

  /// Adds `delta` to the stock counter. `None` if the product does not exist.
  async fn increment_stock(&self, id: Uuid, delta: i32) -> Result<Option<Product>>;

  async fn set_availability(&self, id: Uuid, is_available: bool) -> Result<()>;
}

#[async_trait]
pub trait OfferStore: Send + Sync {
  /// Most recently created offer for the product that is active, unused and
  /// expires strictly after `now`.
  async fn latest_usable_for_product(&self, product_id: Uuid, now: DateTime<Utc>) -> Result<Option<PersonalizedOffer>>;
}

/// Record groups removed by account erasure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
  Orders,
  Addresses,
  CartItems,
  Sessions,
  Users,
}

impl Collection {
  pub const ALL: [Collection; 5] = [
    Collection::Orders,
    Collection::Addresses,
    Collection::CartItems,
    Collection::Sessions,
    Collection::Users,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Collection::Orders => "orders",
      Collection::Addresses => "addresses",
      Collection::CartItems => "cart_items",
      Collection::Sessions => "sessions",
      Collection::Users => "users",
    }
  }
}

impl fmt::Display for Collection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
  /// Deletes every record of `collection` owned by `subject`; returns how many went.
  async fn delete_records(&self, collection: Collection, subject: Uuid) -> Result<u64>;
}
