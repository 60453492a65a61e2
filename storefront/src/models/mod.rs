// storefront/src/models/mod.rs

//! Records persisted by the stores and the views built from them.

pub mod address;
pub mod identity;
pub mod offer;
pub mod order;
pub mod order_item;
pub mod product;

pub use address::Address;
pub use identity::Identity;
pub use offer::{OfferPricing, OfferView, PersonalizedOffer};
pub use order::{ExpandedOrder, Order, OrderStatus};
pub use order_item::{ExpandedOrderItem, OrderItem};
pub use product::{Product, ProductSummary};
