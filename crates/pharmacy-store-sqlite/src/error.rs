//! Error type for `pharmacy-store-sqlite`.

use pharmacy_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] pharmacy_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value that no longer decodes into its domain type.
  #[error("corrupt column {column}: {value:?}")]
  Corrupt {
    column: &'static str,
    value:  String,
  },
}

impl DomainError for Error {
  fn domain(&self) -> Option<&pharmacy_core::Error> {
    match self {
      Error::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
