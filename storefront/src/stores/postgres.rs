// storefront/src/stores/postgres.rs

//! Postgres backend for every repository trait and the session-based identity verifier.

use super::{AccountStore, Collection, OfferStore, OrderStore, ProductStore};
use crate::errors::{AppError, Result};
use crate::models::{Address, ExpandedOrder, Identity, Order, OrderItem, OrderStatus, PersonalizedOffer, Product};
use crate::services::identity::IdentityVerifier;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{event, instrument, Level};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, user_id, guest_email, contact_email, status, cancellation_reason, address_id, \
                             total_cents, currency, created_at, updated_at";

const PRODUCT_COLUMNS: &str =
  "id, slug, name, description, price_cents, stock_quantity, is_available, created_at, updated_at";

#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Option<Uuid>,
  guest_email: Option<String>,
  contact_email: Option<String>,
  status: OrderStatus,
  cancellation_reason: Option<String>,
  address_id: Option<Uuid>,
  total_cents: i64,
  currency: String,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl OrderRow {
  fn into_order(self, items: Vec<OrderItem>) -> Order {
    Order {
      id: self.id,
      user_id: self.user_id,
      guest_email: self.guest_email,
      contact_email: self.contact_email,
      status: self.status,
      items,
      cancellation_reason: self.cancellation_reason,
      address_id: self.address_id,
      total_cents: self.total_cents,
      currency: self.currency,
      created_at: self.created_at,
      updated_at: self.updated_at,
    }
  }
}

#[derive(FromRow)]
struct SessionRow {
  user_id: Option<Uuid>,
  email: Option<String>,
}

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations")
      .run(&self.pool)
      .await
      .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    event!(Level::INFO, "Database migrations applied.");
    Ok(())
  }

  async fn load_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT product_id, quantity, unit_price_cents FROM order_items WHERE order_id = $1 ORDER BY position",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn write_items(tx: &mut Transaction<'_, Postgres>, order: &Order) -> Result<()> {
    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
      .bind(order.id)
      .execute(&mut **tx)
      .await?;
    for (position, item) in order.items.iter().enumerate() {
      sqlx::query(
        "INSERT INTO order_items (order_id, position, product_id, quantity, unit_price_cents) \
         VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(order.id)
      .bind(position as i32)
      .bind(item.product_id)
      .bind(item.quantity)
      .bind(item.unit_price_cents)
      .execute(&mut **tx)
      .await?;
    }
    Ok(())
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "pg::find_order", skip(self), err(Display))]
  async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    match row {
      Some(row) => {
        let items = self.load_items(id).await?;
        Ok(Some(row.into_order(items)))
      }
      None => Ok(None),
    }
  }

  #[instrument(name = "pg::save_order", skip(self, order), fields(order_id = %order.id), err(Display))]
  async fn save(&self, order: &Order) -> Result<Order> {
    let mut tx = self.pool.begin().await?;
    let row = sqlx::query_as::<_, OrderRow>(&format!(
      "INSERT INTO orders ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now()) \
       ON CONFLICT (id) DO UPDATE SET user_id = EXCLUDED.user_id, guest_email = EXCLUDED.guest_email, \
       contact_email = EXCLUDED.contact_email, status = EXCLUDED.status, \
       cancellation_reason = EXCLUDED.cancellation_reason, address_id = EXCLUDED.address_id, \
       total_cents = EXCLUDED.total_cents, currency = EXCLUDED.currency, updated_at = now() \
       RETURNING {cols}",
      cols = ORDER_COLUMNS
    ))
    .bind(order.id)
    .bind(order.user_id)
    .bind(&order.guest_email)
    .bind(&order.contact_email)
    .bind(order.status)
    .bind(&order.cancellation_reason)
    .bind(order.address_id)
    .bind(order.total_cents)
    .bind(&order.currency)
    .bind(order.created_at)
    .fetch_one(&mut *tx)
    .await?;
    Self::write_items(&mut tx, order).await?;
    tx.commit().await?;
    Ok(row.into_order(order.items.clone()))
  }

  #[instrument(name = "pg::find_order_expanded", skip(self), err(Display))]
  async fn find_by_id_with_expansions(&self, id: Uuid) -> Result<Option<ExpandedOrder>> {
    let Some(order) = self.find_by_id(id).await? else {
      return Ok(None);
    };

    let product_ids: Vec<Uuid> = order.items.iter().filter_map(|i| i.product_id).collect();
    let products: HashMap<Uuid, Product> = if product_ids.is_empty() {
      HashMap::new()
    } else {
      sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = ANY($1)", PRODUCT_COLUMNS))
        .bind(&product_ids)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect()
    };

    let address = match order.address_id {
      Some(address_id) => {
        sqlx::query_as::<_, Address>(
          "SELECT id, user_id, recipient, line1, line2, city, postal_code, country FROM addresses WHERE id = $1",
        )
        .bind(address_id)
        .fetch_optional(&self.pool)
        .await?
      }
      None => None,
    };

    Ok(Some(ExpandedOrder::assemble(order, &products, address)))
  }

  #[instrument(name = "pg::cas_order_status", skip(self, reason), err(Display))]
  async fn compare_and_set_status(
    &self,
    id: Uuid,
    expected: OrderStatus,
    next: OrderStatus,
    reason: Option<String>,
  ) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
      "UPDATE orders SET status = $3, cancellation_reason = COALESCE($4, cancellation_reason), updated_at = now() \
       WHERE id = $1 AND status = $2 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(id)
    .bind(expected)
    .bind(next)
    .bind(reason)
    .fetch_optional(&self.pool)
    .await?;

    match row {
      Some(row) => {
        let items = self.load_items(id).await?;
        Ok(Some(row.into_order(items)))
      }
      None => Ok(None),
    }
  }
}

#[async_trait]
impl ProductStore for PgStore {
  async fn find_by_slug(&self, slug: &str) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE slug = $1", PRODUCT_COLUMNS))
      .bind(slug)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  #[instrument(name = "pg::increment_stock", skip(self), err(Display))]
  async fn increment_stock(&self, id: Uuid, delta: i32) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!(
      "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = now() WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(id)
    .bind(delta)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }

  async fn set_availability(&self, id: Uuid, is_available: bool) -> Result<()> {
    sqlx::query("UPDATE products SET is_available = $2, updated_at = now() WHERE id = $1")
      .bind(id)
      .bind(is_available)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl OfferStore for PgStore {
  async fn latest_usable_for_product(&self, product_id: Uuid, now: DateTime<Utc>) -> Result<Option<PersonalizedOffer>> {
    let offer = sqlx::query_as::<_, PersonalizedOffer>(
      "SELECT id, token, product_id, discount_percent, expires_at, is_active, is_used, created_at \
       FROM personalized_offers \
       WHERE product_id = $1 AND is_active AND NOT is_used AND expires_at > $2 \
       ORDER BY created_at DESC LIMIT 1",
    )
    .bind(product_id)
    .bind(now)
    .fetch_optional(&self.pool)
    .await?;
    Ok(offer)
  }
}

#[async_trait]
impl AccountStore for PgStore {
  #[instrument(name = "pg::delete_records", skip(self), fields(collection = %collection), err(Display))]
  async fn delete_records(&self, collection: Collection, subject: Uuid) -> Result<u64> {
    let sql = match collection {
      Collection::Orders => "DELETE FROM orders WHERE user_id = $1",
      Collection::Addresses => "DELETE FROM addresses WHERE user_id = $1",
      Collection::CartItems => "DELETE FROM cart_items WHERE user_id = $1",
      Collection::Sessions => "DELETE FROM sessions WHERE user_id = $1",
      Collection::Users => "DELETE FROM users WHERE id = $1",
    };
    let result = sqlx::query(sql).bind(subject).execute(&self.pool).await?;
    Ok(result.rows_affected())
  }
}

#[async_trait]
impl IdentityVerifier for PgStore {
  async fn verify(&self, token: &str) -> Result<Identity> {
    let row = sqlx::query_as::<_, SessionRow>(
      "SELECT s.user_id, COALESCE(u.email, s.email) AS email \
       FROM sessions s LEFT JOIN users u ON u.id = s.user_id \
       WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(&self.pool)
    .await?;

    match row {
      Some(SessionRow { user_id: None, email: None }) | None => {
        Err(AppError::Unauthenticated("Invalid or expired credential.".to_string()))
      }
      Some(row) => Ok(Identity {
        subject_id: row.user_id,
        email: row.email,
      }),
    }
  }
}
