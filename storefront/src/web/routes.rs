// storefront/src/web/routes.rs

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

async fn health_check_handler(app_state: web::Data<AppState>) -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({
    "status": "ok",
    "notifications": app_state.notifications.stats(),
  }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies are a client error, reported as `{"error": ...}` like every other one.
  cfg.app_data(
    web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(format!("Invalid JSON body: {}", err)).into()),
  );

  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders").route(
          "/cancel",
          web::post().to(crate::web::handlers::order_handlers::cancel_order_handler),
        ),
      )
      .service(
        web::scope("/offers").route(
          "/{slug}",
          web::get().to(crate::web::handlers::offer_handlers::resolve_offer_handler),
        ),
      )
      .route(
        "/account",
        web::delete().to(crate::web::handlers::account_handlers::erase_account_handler),
      ),
  );
}
