//! Users, their one-to-one details row, and the position that drives
//! authorization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ─── Position ────────────────────────────────────────────────────────────────

/// A user's role. Stored verbatim (`"Developer"`, `"Seller"`, `"Buyer"`) in
/// the `user_details.position` column.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
pub enum Position {
  Developer,
  Seller,
  Buyer,
}

impl Position {
  /// Parse a position from untrusted input.
  pub fn parse(raw: &str) -> crate::Result<Self> {
    raw
      .parse()
      .map_err(|_| crate::Error::InvalidPosition(raw.to_owned()))
  }
}

// ─── Persisted shapes ────────────────────────────────────────────────────────

/// The `user_details` row belonging to exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDetails {
  pub id:           i64,
  pub user_id:      i64,
  pub first_name:   String,
  pub second_name:  String,
  pub email:        String,
  pub phone_number: String,
  pub position:     Position,
}

/// A user joined with their details. Credentials never appear here; see
/// [`Credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         i64,
  pub username:   String,
  /// Server-assigned; never changes after creation.
  pub created_at: DateTime<Utc>,
  pub details:    UserDetails,
}

/// Everything the login flow needs to check a password and hand out a
/// session.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user_id:         i64,
  pub username:        String,
  pub password_hash:   String,
  pub session_token:   String,
  pub token_issued_at: DateTime<Utc>,
  pub position:        Position,
}

impl Credentials {
  /// The session currently attached to these credentials.
  pub fn session(&self) -> Session {
    Session {
      user_id:   self.user_id,
      position:  self.position,
      issued_at: self.token_issued_at,
    }
  }
}

/// The result of resolving a session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
  pub user_id:   i64,
  pub position:  Position,
  pub issued_at: DateTime<Utc>,
}

impl Session {
  /// Whether the token is at least `ttl` old at `now`. A lifetime that
  /// runs past the representable range never expires.
  pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
    self
      .issued_at
      .checked_add_signed(ttl)
      .is_some_and(|deadline| deadline <= now)
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Details supplied on user creation or update. The position has already
/// been validated.
#[derive(Debug, Clone)]
pub struct NewUserDetails {
  pub first_name:   String,
  pub second_name:  String,
  pub email:        String,
  pub phone_number: String,
  pub position:     Position,
}

/// Input to [`crate::store::PharmacyStore::create_user`].
/// `created_at` is always set by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username:        String,
  pub password_hash:   String,
  pub session_token:   String,
  pub token_issued_at: DateTime<Utc>,
  pub details:         NewUserDetails,
}

/// Input to [`crate::store::PharmacyStore::update_user`].
#[derive(Debug, Clone)]
pub struct UserUpdate {
  pub username:      String,
  /// `None` keeps the stored hash.
  pub password_hash: Option<String>,
  pub details:       NewUserDetails,
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn position_parses_exact_names() {
    assert_eq!(Position::parse("Developer").unwrap(), Position::Developer);
    assert_eq!(Position::parse("Seller").unwrap(), Position::Seller);
    assert_eq!(Position::parse("Buyer").unwrap(), Position::Buyer);
  }

  #[test]
  fn position_rejects_unknown_and_wrong_case() {
    for raw in ["", "seller", "Admin", " Buyer"] {
      assert!(
        matches!(Position::parse(raw), Err(crate::Error::InvalidPosition(_))),
        "{raw:?} should be rejected"
      );
    }
  }

  #[test]
  fn position_serializes_as_plain_name() {
    let json = serde_json::to_string(&Position::Seller).unwrap();
    assert_eq!(json, "\"Seller\"");
    assert_eq!(Position::Buyer.as_ref(), "Buyer");
  }

  #[test]
  fn session_expiry_boundary() {
    let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let session = Session { user_id: 1, position: Position::Buyer, issued_at };
    let ttl = Duration::hours(24);

    assert!(!session.is_expired(issued_at + Duration::hours(23), ttl));
    assert!(session.is_expired(issued_at + Duration::hours(24), ttl));
    assert!(session.is_expired(issued_at, Duration::zero()));
  }

  #[test]
  fn session_expiry_survives_huge_lifetimes() {
    let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
    let session = Session { user_id: 1, position: Position::Seller, issued_at };

    assert!(!session.is_expired(issued_at + Duration::days(1), chrono::TimeDelta::MAX));
  }
}
