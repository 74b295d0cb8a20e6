//! Error types for `pharmacy-core`.

use thiserror::Error;

/// Domain failures that every store backend reports the same way, so that the
/// HTTP layer can map them without knowing the backend.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Pharmacy {0} does not exist")]
  PharmacyNotFound(i64),

  #[error("invalid position: {0:?}")]
  InvalidPosition(String),

  #[error("invalid price: {0}")]
  InvalidPrice(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by backend error types that may wrap a domain [`Error`].
pub trait DomainError: std::error::Error + Send + Sync + 'static {
  /// The wrapped domain error, if this failure is one.
  fn domain(&self) -> Option<&Error>;
}
