// storefront/src/models/order_item.rs

use super::product::ProductSummary;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A line item embedded in an order. `product_id` may no longer resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
  pub product_id: Option<Uuid>,
  pub quantity: i32,
  pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedOrderItem {
  pub product_id: Option<Uuid>,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub product: Option<ProductSummary>,
}
