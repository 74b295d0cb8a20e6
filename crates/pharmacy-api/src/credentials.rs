//! Password hashing, session tokens and the session cookie.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use rand_core::OsRng;
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Debug, Error)]
pub enum CredentialError {
  #[error("argon2 error: {0}")]
  Argon2(password_hash::Error),
  #[error("hashing task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// Hash `plaintext` into an argon2 PHC string. Runs on the blocking pool.
pub async fn hash_password(plaintext: String) -> Result<String, CredentialError> {
  tokio::task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(plaintext.as_bytes(), &salt)
      .map(|hash| hash.to_string())
      .map_err(CredentialError::Argon2)
  })
  .await?
}

/// Check `plaintext` against a stored PHC string. A mismatch is `Ok(false)`;
/// an unparseable hash is an error.
pub async fn verify_password(
  hash: String,
  plaintext: String,
) -> Result<bool, CredentialError> {
  tokio::task::spawn_blocking(move || {
    let parsed = PasswordHash::new(&hash).map_err(CredentialError::Argon2)?;
    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
      Ok(()) => Ok(true),
      Err(password_hash::Error::Password) => Ok(false),
      Err(e) => Err(CredentialError::Argon2(e)),
    }
  })
  .await?
}

static DECOY_HASH: OnceCell<String> = OnceCell::const_new();

/// Run one argon2 verification against a throwaway hash, so a login for an
/// unknown username costs the same as one with a wrong password.
pub async fn verify_decoy(plaintext: String) -> Result<(), CredentialError> {
  let hash = DECOY_HASH
    .get_or_try_init(|| hash_password(issue_session_token()))
    .await?;
  verify_password(hash.clone(), plaintext).await?;
  Ok(())
}

/// A fresh opaque session token.
pub fn issue_session_token() -> String { Uuid::new_v4().to_string() }

/// The `auth_token` cookie for `token`, living as long as the session does.
pub fn session_cookie(token: String, ttl: chrono::Duration) -> Cookie<'static> {
  Cookie::build((SESSION_COOKIE, token))
    .http_only(true)
    .path("/")
    .same_site(SameSite::Lax)
    .max_age(cookie::time::Duration::seconds(ttl.num_seconds()))
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn hash_then_verify() {
    let hash = hash_password("hunter2".into()).await.unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(hash.clone(), "hunter2".into()).await.unwrap());
    assert!(!verify_password(hash, "hunter3".into()).await.unwrap());
  }

  #[tokio::test]
  async fn malformed_hash_is_an_error() {
    assert!(verify_password("not-a-hash".into(), "x".into()).await.is_err());
  }

  #[tokio::test]
  async fn decoy_verification_succeeds_repeatedly() {
    verify_decoy("hunter2".into()).await.unwrap();
    verify_decoy(String::new()).await.unwrap();
    assert!(DECOY_HASH.get().is_some_and(|h| h.starts_with("$argon2")));
  }

  #[test]
  fn tokens_are_unique() {
    assert_ne!(issue_session_token(), issue_session_token());
  }

  #[test]
  fn cookie_attributes() {
    let c = session_cookie("abc".into(), chrono::Duration::hours(24));
    assert_eq!(c.name(), SESSION_COOKIE);
    assert_eq!(c.value(), "abc");
    assert_eq!(c.http_only(), Some(true));
    assert_eq!(c.path(), Some("/"));
    assert_eq!(c.max_age(), Some(cookie::time::Duration::hours(24)));
  }
}
