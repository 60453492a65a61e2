// storefront/src/models/identity.rs

use uuid::Uuid;

/// The verified caller behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Identity {
  /// Set for registered users.
  pub subject_id: Option<Uuid>,
  pub email: Option<String>,
}

impl Identity {
  pub fn registered(subject_id: Uuid, email: impl Into<String>) -> Self {
    Self {
      subject_id: Some(subject_id),
      email: Some(email.into()),
    }
  }

  pub fn guest(email: impl Into<String>) -> Self {
    Self {
      subject_id: None,
      email: Some(email.into()),
    }
  }

  /// Case-insensitive match against a stored address. Blank addresses never match.
  pub fn email_matches(&self, other: &str) -> bool {
    let other = other.trim();
    self
      .email
      .as_deref()
      .map(str::trim)
      .is_some_and(|mine| !mine.is_empty() && !other.is_empty() && mine.eq_ignore_ascii_case(other))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_match_ignores_case_and_padding() {
    let guest = Identity::guest(" Guest@Shop.io ");
    assert!(guest.email_matches("guest@shop.io"));
    assert!(!guest.email_matches("other@shop.io"));
  }

  #[test]
  fn blank_addresses_never_match() {
    assert!(!Identity::guest("").email_matches(""));
    assert!(!Identity::guest("   ").email_matches(" "));
    assert!(!Identity::guest("a@shop.io").email_matches("  "));
    assert!(!Identity::default().email_matches("a@shop.io"));
  }
}
