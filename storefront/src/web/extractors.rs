// storefront/src/web/extractors.rs

use crate::errors::AppError;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};

/// The `Authorization: Bearer <token>` credential, if any.
///
/// Extraction never fails; flows decide what a missing token means.
#[derive(Debug, Clone, Default)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
  pub fn parse(header_value: &str) -> Option<String> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
      return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
  }

  pub fn into_inner(self) -> Option<String> {
    self.0
  }
}

impl FromRequest for BearerToken {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = req
      .headers()
      .get(AUTHORIZATION)
      .and_then(|v| v.to_str().ok())
      .and_then(BearerToken::parse);
    if token.is_none() {
      tracing::debug!("Request carries no bearer credential.");
    }
    ready(Ok(BearerToken(token)))
  }
}
