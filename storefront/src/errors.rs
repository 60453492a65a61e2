// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;
use storeflow::FlowError;
use thiserror::Error;

/// Which kind of record a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  Order,
  Product,
  Offer,
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      Resource::Order => "Order not found",
      Resource::Product => "Product not found",
      Resource::Offer => "No active offer found for this product",
    };
    f.write_str(msg)
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Unauthenticated(String),

  #[error("Not Authorized: {0}")]
  Unauthorized(String),

  #[error("{0}")]
  NotFound(Resource),

  #[error("Order is already cancelled")]
  AlreadyCancelled,

  #[error("Order cannot be cancelled at the '{stage}' stage")]
  InvalidTransition { stage: String },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(format!("{:#}", err)),
    }
  }
}

impl AppError {
  /// Stable machine-readable kind, used in logs and the erasure report.
  pub fn kind(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "validation",
      AppError::Unauthenticated(_) => "unauthenticated",
      AppError::Unauthorized(_) => "unauthorized",
      AppError::NotFound(_) => "not_found",
      AppError::AlreadyCancelled | AppError::InvalidTransition { .. } => "invalid_state",
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => "unexpected",
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) | AppError::AlreadyCancelled | AppError::InvalidTransition { .. } => {
        StatusCode::BAD_REQUEST
      }
      AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, kind = self.kind(), "Responding with error");
    } else {
      tracing::info!(application_error = %self, kind = self.kind(), "Responding with error");
    }
    match self {
      AppError::Validation(m) | AppError::Unauthenticated(m) | AppError::Unauthorized(m) => {
        HttpResponse::build(status).json(json!({"error": m}))
      }
      AppError::NotFound(_) | AppError::AlreadyCancelled | AppError::InvalidTransition { .. } => {
        HttpResponse::build(status).json(json!({"error": self.to_string()}))
      }
      AppError::Config(m) => HttpResponse::build(status).json(json!({"error": "Configuration issue", "detail": m})),
      AppError::Sqlx(e) => {
        HttpResponse::build(status).json(json!({"error": "Database operation failed", "detail": e.to_string()}))
      }
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        HttpResponse::build(status).json(json!({"error": "Workflow processing error", "detail": source.to_string()}))
      }
      AppError::Internal(m) => {
        HttpResponse::build(status).json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
