// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every helper.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use storefront::models::{Address, ExpandedOrder, Identity, Order, OrderItem, OrderStatus, PersonalizedOffer, Product};
use storefront::services::notifications::MockEmailDispatcher;
use storefront::stores::{InMemoryStore, OrderStore};
use storefront::{AppConfig, AppState, Stores};
use uuid::Uuid;

pub const ALICE_TOKEN: &str = "session-alice";
pub const MALLORY_TOKEN: &str = "session-mallory";
pub const GUEST_TOKEN: &str = "session-guest";
pub const GUEST_EMAIL: &str = "guest@shop.test";

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_env_filter("storefront=debug,storeflow=debug")
    .with_test_writer()
    .try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// A fresh in-memory backend plus the state built on top of it.
pub struct Shop {
  pub store: Arc<InMemoryStore>,
  pub mailer: Arc<MockEmailDispatcher>,
  pub state: AppState,
  pub alice: Uuid,
  pub mallory: Uuid,
}

impl Shop {
  /// Must be called from inside a tokio runtime.
  pub fn new() -> Self {
    setup_tracing();
    let store = Arc::new(InMemoryStore::new());
    let mailer = Arc::new(MockEmailDispatcher::new("shop@example.com"));
    let state = AppState::new(AppConfig::in_memory(), Stores::memory(store.clone()), mailer.clone());

    let alice = Uuid::new_v4();
    let mallory = Uuid::new_v4();
    store.insert_user(alice, "alice@shop.test");
    store.insert_user(mallory, "mallory@shop.test");
    store.insert_session(ALICE_TOKEN, Identity::registered(alice, "alice@shop.test"));
    store.insert_session(MALLORY_TOKEN, Identity::registered(mallory, "mallory@shop.test"));
    store.insert_session(GUEST_TOKEN, Identity::guest(GUEST_EMAIL));

    Self {
      store,
      mailer,
      state,
      alice,
      mallory,
    }
  }

  /// A second state over the same store whose order lookups go through `orders`.
  pub fn state_with_orders(&self, orders: Arc<dyn OrderStore>) -> AppState {
    let mut stores = Stores::memory(self.store.clone());
    stores.orders = orders;
    AppState::new(AppConfig::in_memory(), stores, self.mailer.clone())
  }

  pub fn add_product(&self, slug: &str, price_cents: i64, stock: i32) -> Product {
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      slug: slug.to_string(),
      name: format!("Product {}", slug),
      description: Some(format!("The {} product", slug)),
      price_cents,
      stock_quantity: stock,
      is_available: stock > 0,
      created_at: now,
      updated_at: now,
    };
    self.store.insert_product(product.clone());
    product
  }

  pub fn add_address(&self, user_id: Uuid) -> Address {
    let address = Address {
      id: Uuid::new_v4(),
      user_id: Some(user_id),
      recipient: "Alice Example".to_string(),
      line1: "1 Main Street".to_string(),
      line2: None,
      city: "Springfield".to_string(),
      postal_code: "12345".to_string(),
      country: "US".to_string(),
    };
    self.store.insert_address(address.clone());
    address
  }

  pub fn add_offer(&self, product_id: Uuid, percent: Decimal, expires_at: DateTime<Utc>, created_at: DateTime<Utc>) -> PersonalizedOffer {
    let offer = PersonalizedOffer {
      id: Uuid::new_v4(),
      token: format!("offer-{}", Uuid::new_v4()),
      product_id,
      discount_percent: percent,
      expires_at,
      is_active: true,
      is_used: false,
      created_at,
    };
    self.store.insert_offer(offer.clone());
    offer
  }

  /// An order owned by Alice.
  pub async fn alice_order(&self, status: OrderStatus, items: Vec<OrderItem>) -> Order {
    let mut order = blank_order(status, items);
    order.user_id = Some(self.alice);
    order.contact_email = Some("alice@shop.test".to_string());
    self.save(order).await
  }

  /// A guest order placed with [`GUEST_EMAIL`] in the given casing.
  pub async fn guest_order(&self, guest_email: &str, status: OrderStatus, items: Vec<OrderItem>) -> Order {
    let mut order = blank_order(status, items);
    order.guest_email = Some(guest_email.to_string());
    self.save(order).await
  }

  pub async fn save(&self, order: Order) -> Order {
    self.store.save(&order).await.expect("in-memory save")
  }

  pub fn stock_of(&self, product_id: Uuid) -> i32 {
    self.store.product(product_id).expect("product exists").stock_quantity
  }
}

pub fn item(product_id: Uuid, quantity: i32) -> OrderItem {
  OrderItem {
    product_id: Some(product_id),
    quantity,
    unit_price_cents: 1_000,
  }
}

pub fn blank_order(status: OrderStatus, items: Vec<OrderItem>) -> Order {
  let now = Utc::now() - Duration::minutes(10);
  let total_cents = items.iter().map(|i| i.unit_price_cents * i64::from(i.quantity)).sum();
  Order {
    id: Uuid::new_v4(),
    user_id: None,
    guest_email: None,
    contact_email: None,
    status,
    items,
    cancellation_reason: None,
    address_id: None,
    total_cents,
    currency: "USD".to_string(),
    created_at: now,
    updated_at: now,
  }
}

/// Order store that returns what it read only after yielding to the
/// scheduler, so concurrent flows all read before any of them writes.
/// Optionally moves the stored order to another status right after the
/// first read, leaving the caller with a stale copy.
pub struct RacingOrders {
  inner: Arc<InMemoryStore>,
  move_after_first_read: Mutex<Option<OrderStatus>>,
  reads: AtomicUsize,
}

impl RacingOrders {
  pub fn new(inner: Arc<InMemoryStore>) -> Self {
    Self {
      inner,
      move_after_first_read: Mutex::new(None),
      reads: AtomicUsize::new(0),
    }
  }

  pub fn moving_to(self, status: OrderStatus) -> Self {
    *self.move_after_first_read.lock() = Some(status);
    self
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl OrderStore for RacingOrders {
  async fn find_by_id(&self, id: Uuid) -> storefront::Result<Option<Order>> {
    let found = self.inner.find_by_id(id).await?;
    self.reads.fetch_add(1, Ordering::SeqCst);

    let next = self.move_after_first_read.lock().take();
    if let (Some(next), Some(order)) = (next, found.as_ref()) {
      let mut moved = order.clone();
      moved.status = next;
      self.inner.save(&moved).await?;
    }

    tokio::task::yield_now().await;
    Ok(found)
  }

  async fn save(&self, order: &Order) -> storefront::Result<Order> {
    self.inner.save(order).await
  }

  async fn find_by_id_with_expansions(&self, id: Uuid) -> storefront::Result<Option<ExpandedOrder>> {
    self.inner.find_by_id_with_expansions(id).await
  }

  async fn compare_and_set_status(
    &self,
    id: Uuid,
    expected: OrderStatus,
    next: OrderStatus,
    reason: Option<String>,
  ) -> storefront::Result<Option<Order>> {
    self.inner.compare_and_set_status(id, expected, next, reason).await
  }
}
