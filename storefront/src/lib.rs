// storefront/src/lib.rs

//! Storefront order lifecycle service: order cancellation with stock
//! restoration and customer notification, personalized offer resolution and
//! account erasure, served over actix-web.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod stores;
pub mod web;

pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use state::{AppState, Stores};
