// storefront/src/services/mod.rs

pub mod identity;
pub mod notifications;
