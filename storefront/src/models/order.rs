// storefront/src/models/order.rs

use super::address::Address;
use super::order_item::{ExpandedOrderItem, OrderItem};
use super::product::Product;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Lifecycle stage of an order. Persisted as `order_status_enum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Placed,
  Confirmed,
  Processing,
  PickupRequested,
  WaitingForPickup,
  Shipped,
  Delivered,
  Returned,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 9] = [
    OrderStatus::Placed,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::PickupRequested,
    OrderStatus::WaitingForPickup,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Returned,
    OrderStatus::Cancelled,
  ];

  /// The transition table. Every status change in the system is checked against it.
  pub fn allowed_next(self) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match self {
      Placed => &[Confirmed, Processing, Cancelled],
      Confirmed => &[Processing, Cancelled],
      Processing => &[PickupRequested, Shipped, Cancelled],
      PickupRequested => &[WaitingForPickup, Cancelled],
      WaitingForPickup => &[Shipped, Cancelled],
      Shipped => &[Delivered],
      Delivered => &[Returned],
      Returned | Cancelled => &[],
    }
  }

  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    self.allowed_next().contains(&next)
  }

  pub fn is_cancellable(self) -> bool {
    self.can_transition_to(OrderStatus::Cancelled)
  }

  pub fn is_terminal(self) -> bool {
    self.allowed_next().is_empty()
  }

  /// Human-readable stage name, used in customer-facing messages.
  pub fn stage_name(self) -> &'static str {
    match self {
      OrderStatus::Placed => "Placed",
      OrderStatus::Confirmed => "Confirmed",
      OrderStatus::Processing => "Processing",
      OrderStatus::PickupRequested => "Pickup Requested",
      OrderStatus::WaitingForPickup => "Waiting For Pickup",
      OrderStatus::Shipped => "Shipped",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Returned => "Returned",
      OrderStatus::Cancelled => "Cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.stage_name())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Option<Uuid>,
  pub guest_email: Option<String>,
  /// Where status notifications go; falls back to `guest_email`.
  pub contact_email: Option<String>,
  pub status: OrderStatus,
  pub items: Vec<OrderItem>,
  pub cancellation_reason: Option<String>,
  pub address_id: Option<Uuid>,
  pub total_cents: i64,
  pub currency: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn notification_email(&self) -> Option<&str> {
    self.contact_email.as_deref().or(self.guest_email.as_deref())
  }
}

/// An order with its item products and address resolved for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedOrder {
  pub id: Uuid,
  pub user_id: Option<Uuid>,
  pub guest_email: Option<String>,
  pub status: OrderStatus,
  pub items: Vec<ExpandedOrderItem>,
  pub cancellation_reason: Option<String>,
  pub address_id: Option<Uuid>,
  pub address: Option<Address>,
  pub total_cents: i64,
  pub currency: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl ExpandedOrder {
  /// Builds the view from whatever related records could be found.
  pub fn assemble(order: Order, products: &HashMap<Uuid, Product>, address: Option<Address>) -> Self {
    let items = order
      .items
      .iter()
      .map(|item| ExpandedOrderItem {
        product_id: item.product_id,
        quantity: item.quantity,
        unit_price_cents: item.unit_price_cents,
        product: item.product_id.and_then(|id| products.get(&id)).map(Into::into),
      })
      .collect();

    Self {
      id: order.id,
      user_id: order.user_id,
      guest_email: order.guest_email,
      status: order.status,
      items,
      cancellation_reason: order.cancellation_reason,
      address_id: order.address_id,
      address,
      total_cents: order.total_cents,
      currency: order.currency,
      created_at: order.created_at,
      updated_at: order.updated_at,
    }
  }

  /// The order without any references resolved.
  pub fn minimal(order: Order) -> Self {
    Self::assemble(order, &HashMap::new(), None)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cancellable_set_is_derived_from_table() {
    let cancellable: Vec<_> = OrderStatus::ALL.into_iter().filter(|s| s.is_cancellable()).collect();
    assert_eq!(
      cancellable,
      vec![
        OrderStatus::Placed,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::PickupRequested,
        OrderStatus::WaitingForPickup,
      ]
    );
  }

  #[test]
  fn terminal_statuses_have_no_exits() {
    assert!(OrderStatus::Cancelled.is_terminal());
    assert!(OrderStatus::Returned.is_terminal());
    assert!(!OrderStatus::Shipped.is_terminal());
  }

  #[test]
  fn no_status_reenters_placed() {
    for status in OrderStatus::ALL {
      assert!(!status.can_transition_to(OrderStatus::Placed), "{status:?} -> Placed");
    }
  }
}
