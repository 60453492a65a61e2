// storefront/src/state.rs
use crate::config::{AppConfig, StoreBackend};
use crate::errors::{AppError, Result};
use crate::pipelines;
use crate::services::identity::IdentityVerifier;
use crate::services::notifications::{MockEmailDispatcher, NotificationDispatcher, NotificationQueue};
use crate::stores::{AccountStore, InMemoryStore, OfferStore, OrderStore, PgStore, ProductStore};
use sqlx::PgPool;
use std::sync::Arc;
use storeflow::Flows;

/// One implementation per repository seam.
#[derive(Clone)]
pub struct Stores {
  pub identity: Arc<dyn IdentityVerifier>,
  pub orders: Arc<dyn OrderStore>,
  pub products: Arc<dyn ProductStore>,
  pub offers: Arc<dyn OfferStore>,
  pub accounts: Arc<dyn AccountStore>,
}

impl Stores {
  pub fn memory(store: Arc<InMemoryStore>) -> Self {
    Self {
      identity: store.clone(),
      orders: store.clone(),
      products: store.clone(),
      offers: store.clone(),
      accounts: store,
    }
  }

  pub fn postgres(pool: PgPool) -> Self {
    let store = Arc::new(PgStore::new(pool));
    Self {
      identity: store.clone(),
      orders: store.clone(),
      products: store.clone(),
      offers: store.clone(),
      accounts: store,
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub flows: Arc<Flows<AppError>>,
  pub config: Arc<AppConfig>,
  pub stores: Stores,
  pub notifications: NotificationQueue,
}

impl AppState {
  /// Builds the state and registers every flow. Must run inside a tokio runtime.
  pub fn new(config: AppConfig, stores: Stores, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
    let flows = Arc::new(Flows::<AppError>::new());
    pipelines::register_all_pipelines(&flows);
    Self {
      flows,
      config: Arc::new(config),
      stores,
      notifications: NotificationQueue::start(dispatcher),
    }
  }

  /// Connects the configured backend and applies migrations when asked to.
  pub async fn from_config(config: AppConfig) -> Result<Self> {
    let dispatcher: Arc<dyn NotificationDispatcher> =
      Arc::new(MockEmailDispatcher::new(config.notify_sender.clone()).with_order_links(config.app_base_url.clone()));
    let stores = match config.store_backend {
      StoreBackend::Memory => {
        tracing::warn!("Using the in-memory store; data is lost on restart.");
        Stores::memory(Arc::new(InMemoryStore::new()))
      }
      StoreBackend::Postgres => {
        let url = config
          .database_url
          .as_deref()
          .ok_or_else(|| AppError::Config("DATABASE_URL is required for the postgres backend".to_string()))?;
        let pool = PgPool::connect(url).await?;
        tracing::info!("Successfully connected to the database.");
        if config.run_migrations {
          PgStore::new(pool.clone()).migrate().await?;
        }
        Stores::postgres(pool)
      }
    };
    Ok(Self::new(config, stores, dispatcher))
  }
}
