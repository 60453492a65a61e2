// storefront/src/services/identity.rs

//! Bearer-credential verification.

use crate::errors::{AppError, Result};
use crate::models::Identity;
use async_trait::async_trait;
use tracing::{event, instrument, Level};

/// Turns an opaque bearer token into the caller's identity.
///
/// Implementations fail with `AppError::Unauthenticated` for unknown or
/// expired tokens; other errors mean the lookup itself broke.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
  async fn verify(&self, token: &str) -> Result<Identity>;
}

/// Verifies `token`, treating a missing or blank one as unauthenticated.
#[instrument(name = "identity::authenticate", skip_all)]
pub async fn authenticate(verifier: &dyn IdentityVerifier, token: Option<&str>) -> Result<Identity> {
  let token = match token.map(str::trim) {
    Some(t) if !t.is_empty() => t,
    _ => {
      event!(Level::DEBUG, "No bearer credential supplied.");
      return Err(AppError::Unauthenticated("Authentication required.".to_string()));
    }
  };

  let identity = verifier.verify(token).await?;
  if identity.subject_id.is_none() && identity.email.is_none() {
    return Err(AppError::Unauthenticated("Credential carries no identity.".to_string()));
  }
  event!(Level::DEBUG, subject_id = ?identity.subject_id, "Caller authenticated.");
  Ok(identity)
}
