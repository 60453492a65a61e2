// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use storefront::config::{AppConfig, LogFormat};
use storefront::state::AppState;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = AppConfig::from_env().map_err(|e| {
    eprintln!("Configuration error: {}", e);
    std::io::Error::other(e.to_string())
  })?;
  init_tracing(app_config.log_format);

  tracing::info!(backend = ?app_config.store_backend, "Starting storefront server...");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::from_config(app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to initialise application state.");
    std::io::Error::other(e.to_string())
  })?;

  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(storefront::web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
