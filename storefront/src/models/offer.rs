// storefront/src/models/offer.rs

use super::product::Product;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A single-use discount issued to one shopper for one product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PersonalizedOffer {
  pub id: Uuid,
  pub token: String,
  pub product_id: Uuid,
  /// 0 to 100.
  #[serde(with = "rust_decimal::serde::float")]
  pub discount_percent: Decimal,
  pub expires_at: DateTime<Utc>,
  pub is_active: bool,
  pub is_used: bool,
  pub created_at: DateTime<Utc>,
}

impl PersonalizedOffer {
  pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
    self.is_active && !self.is_used && now < self.expires_at
  }
}

/// Rounds to cents, halves away from zero.
pub fn round2(value: Decimal) -> Decimal {
  value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Derived figures for an offer; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfferPricing {
  pub price: Decimal,
  pub discounted_price: Decimal,
  pub savings: Decimal,
  pub time_remaining_ms: i64,
}

impl OfferPricing {
  pub fn compute(price_cents: i64, discount_percent: Decimal, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
    let price = Decimal::new(price_cents, 2);
    let discount = price * discount_percent / Decimal::ONE_HUNDRED;
    Self {
      price,
      discounted_price: round2(price - discount),
      savings: round2(discount),
      time_remaining_ms: (expires_at - now).num_milliseconds().max(0),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetails {
  pub id: Uuid,
  pub token: String,
  #[serde(with = "rust_decimal::serde::float")]
  pub discount_percent: Decimal,
  pub expires_at: DateTime<Utc>,
  pub is_active: bool,
  pub is_used: bool,
  pub created_at: DateTime<Utc>,
  /// Milliseconds until `expires_at`.
  pub time_remaining: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferedProduct {
  pub id: Uuid,
  pub slug: String,
  pub name: String,
  pub description: Option<String>,
  pub stock_quantity: i32,
  pub is_available: bool,
  #[serde(with = "rust_decimal::serde::float")]
  pub price: Decimal,
  #[serde(with = "rust_decimal::serde::float")]
  pub discounted_price: Decimal,
  #[serde(with = "rust_decimal::serde::float")]
  pub savings: Decimal,
}

/// Read-only composite returned by the offer resolver.
#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
  pub offer: OfferDetails,
  pub product: OfferedProduct,
}

impl OfferView {
  pub fn new(offer: PersonalizedOffer, product: Product, pricing: OfferPricing) -> Self {
    Self {
      offer: OfferDetails {
        id: offer.id,
        token: offer.token,
        discount_percent: offer.discount_percent,
        expires_at: offer.expires_at,
        is_active: offer.is_active,
        is_used: offer.is_used,
        created_at: offer.created_at,
        time_remaining: pricing.time_remaining_ms,
      },
      product: OfferedProduct {
        id: product.id,
        slug: product.slug,
        name: product.name,
        description: product.description,
        stock_quantity: product.stock_quantity,
        is_available: product.is_available,
        price: pricing.price,
        discounted_price: pricing.discounted_price,
        savings: pricing.savings,
      },
    }
  }
}
