// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub slug: String,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub stock_quantity: i32,
  /// Kept equal to `stock_quantity > 0` after every stock change.
  pub is_available: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn availability_matches_stock(&self) -> bool {
    self.is_available == (self.stock_quantity > 0)
  }
}

/// Product fields shown inside an expanded order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
  pub id: Uuid,
  pub slug: String,
  pub name: String,
  pub price_cents: i64,
  pub is_available: bool,
}

impl From<&Product> for ProductSummary {
  fn from(p: &Product) -> Self {
    Self {
      id: p.id,
      slug: p.slug.clone(),
      name: p.name.clone(),
      price_cents: p.price_cents,
      is_available: p.is_available,
    }
  }
}
