// storefront/src/web/handlers/mod.rs

pub mod account_handlers;
pub mod offer_handlers;
pub mod order_handlers;
