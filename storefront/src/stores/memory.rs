// storefront/src/stores/memory.rs

//! In-process backend. Used by `STORE_BACKEND=memory` and the test suite.
//!
//! Besides plain storage it can be told to fail specific operations, so
//! best-effort paths can be exercised without a flaky database.

use super::{AccountStore, Collection, OfferStore, OrderStore, ProductStore};
use crate::errors::{AppError, Result};
use crate::models::{Address, ExpandedOrder, Identity, Order, OrderStatus, PersonalizedOffer, Product};
use crate::services::identity::IdentityVerifier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct CartItemRecord {
  user_id: Uuid,
}

#[derive(Default)]
struct Faults {
  stock_products: HashSet<Uuid>,
  collections: HashSet<Collection>,
  expansions: bool,
}

#[derive(Default)]
pub struct InMemoryStore {
  orders: RwLock<HashMap<Uuid, Order>>,
  products: RwLock<HashMap<Uuid, Product>>,
  addresses: RwLock<HashMap<Uuid, Address>>,
  offers: RwLock<Vec<PersonalizedOffer>>,
  sessions: RwLock<HashMap<String, Identity>>,
  users: RwLock<HashMap<Uuid, String>>,
  cart_items: RwLock<Vec<CartItemRecord>>,
  writes: RwLock<u64>,
  faults: RwLock<Faults>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert_product(&self, product: Product) {
    self.products.write().insert(product.id, product);
  }

  pub fn insert_address(&self, address: Address) {
    self.addresses.write().insert(address.id, address);
  }

  pub fn insert_offer(&self, offer: PersonalizedOffer) {
    self.offers.write().push(offer);
  }

  pub fn insert_user(&self, id: Uuid, email: impl Into<String>) {
    self.users.write().insert(id, email.into());
  }

  pub fn insert_session(&self, token: impl Into<String>, identity: Identity) {
    self.sessions.write().insert(token.into(), identity);
  }

  pub fn insert_cart_item(&self, user_id: Uuid) {
    self.cart_items.write().push(CartItemRecord { user_id });
  }

  pub fn order(&self, id: Uuid) -> Option<Order> {
    self.orders.read().get(&id).cloned()
  }

  pub fn product(&self, id: Uuid) -> Option<Product> {
    self.products.read().get(&id).cloned()
  }

  pub fn order_count(&self) -> usize {
    self.orders.read().len()
  }

  /// Number of order writes (`save` and successful status swaps).
  pub fn order_writes(&self) -> u64 {
    *self.writes.read()
  }

  /// Makes `increment_stock` fail for this product.
  pub fn fail_stock_updates_for(&self, product_id: Uuid) {
    self.faults.write().stock_products.insert(product_id);
  }

  /// Makes `delete_records` fail for this collection.
  pub fn fail_deletes_for(&self, collection: Collection) {
    self.faults.write().collections.insert(collection);
  }

  pub fn fail_expansions(&self) {
    self.faults.write().expansions = true;
  }

  fn bump_writes(&self) {
    *self.writes.write() += 1;
  }
}

#[async_trait]
impl OrderStore for InMemoryStore {
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.orders.read().get(&id).cloned())
  }

  async fn save(&self, order: &Order) -> Result<Order> {
    let mut stored = order.clone();
    stored.updated_at = Utc::now();
    self.orders.write().insert(stored.id, stored.clone());
    self.bump_writes();
    Ok(stored)
  }

  async fn find_by_id_with_expansions(&self, id: Uuid) -> Result<Option<ExpandedOrder>> {
    if self.faults.read().expansions {
      return Err(AppError::Internal("expansion lookup unavailable".to_string()));
    }
    let Some(order) = self.orders.read().get(&id).cloned() else {
      return Ok(None);
    };
    let products: HashMap<Uuid, Product> = {
      let all = self.products.read();
      order
        .items
        .iter()
        .filter_map(|i| i.product_id)
        .filter_map(|pid| all.get(&pid).map(|p| (pid, p.clone())))
        .collect()
    };
    let address = order.address_id.and_then(|aid| self.addresses.read().get(&aid).cloned());
    Ok(Some(ExpandedOrder::assemble(order, &products, address)))
  }

  async fn compare_and_set_status(
    &self,
    id: Uuid,
    expected: OrderStatus,
    next: OrderStatus,
    reason: Option<String>,
  ) -> Result<Option<Order>> {
    let updated = {
      let mut orders = self.orders.write();
      match orders.get_mut(&id) {
        Some(order) if order.status == expected => {
          order.status = next;
          if reason.is_some() {
            order.cancellation_reason = reason;
          }
          order.updated_at = Utc::now();
          Some(order.clone())
        }
        _ => None,
      }
    };
    if updated.is_some() {
      self.bump_writes();
    }
    Ok(updated)
  }
}

#[async_trait]
impl ProductStore for InMemoryStore {
  async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>> {
    Ok(self.products.read().values().find(|p| p.slug == slug).cloned())
  }

  async fn increment_stock(&self, id: Uuid, delta: i32) -> Result<Option<Product>> {
    if self.faults.read().stock_products.contains(&id) {
      return Err(AppError::Internal(format!("stock update rejected for product {}", id)));
    }
    let mut products = self.products.write();
    let Some(p) = products.get_mut(&id) else {
      return Ok(None);
    };
    p.stock_quantity = p
      .stock_quantity
      .checked_add(delta)
      .ok_or_else(|| AppError::Internal(format!("stock for product {} out of range", id)))?;
    p.updated_at = Utc::now();
    Ok(Some(p.clone()))
  }

  async fn set_availability(&self, id: Uuid, is_available: bool) -> Result<()> {
    if let Some(p) = self.products.write().get_mut(&id) {
      p.is_available = is_available;
      p.updated_at = Utc::now();
    }
    Ok(())
  }
}

#[async_trait]
impl OfferStore for InMemoryStore {
  async fn latest_usable_for_product(&self, product_id: Uuid, now: DateTime<Utc>) -> Result<Option<PersonalizedOffer>> {
    Ok(
      self
        .offers
        .read()
        .iter()
        .filter(|o| o.product_id == product_id && o.is_usable_at(now))
        .max_by_key(|o| o.created_at)
        .cloned(),
    )
  }
}

#[async_trait]
impl AccountStore for InMemoryStore {
  async fn delete_records(&self, collection: Collection, subject: Uuid) -> Result<u64> {
    if self.faults.read().collections.contains(&collection) {
      return Err(AppError::Internal(format!("delete from {} failed", collection)));
    }
    let removed = match collection {
      Collection::Orders => {
        let mut orders = self.orders.write();
        let before = orders.len();
        orders.retain(|_, o| o.user_id != Some(subject));
        before - orders.len()
      }
      Collection::Addresses => {
        let mut addresses = self.addresses.write();
        let before = addresses.len();
        addresses.retain(|_, a| a.user_id != Some(subject));
        before - addresses.len()
      }
      Collection::CartItems => {
        let mut items = self.cart_items.write();
        let before = items.len();
        items.retain(|c| c.user_id != subject);
        before - items.len()
      }
      Collection::Sessions => {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, identity| identity.subject_id != Some(subject));
        before - sessions.len()
      }
      Collection::Users => usize::from(self.users.write().remove(&subject).is_some()),
    };
    Ok(removed as u64)
  }
}

#[async_trait]
impl IdentityVerifier for InMemoryStore {
  async fn verify(&self, token: &str) -> Result<Identity> {
    self
      .sessions
      .read()
      .get(token)
      .cloned()
      .ok_or_else(|| AppError::Unauthenticated("Invalid or expired credential.".to_string()))
  }
}
