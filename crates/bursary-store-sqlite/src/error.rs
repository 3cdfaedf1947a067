//! Error types for `bursary-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain-rule violation surfaced by a ledger or workflow operation
  /// (invalid amount, refund guard, sponsorship conflict, ...). Kept as a
  /// `source` so callers can recover the domain error from the chain.
  #[error("{0}")]
  Domain(#[from] bursary_core::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("connection error: {0}")]
  Connection(#[from] tokio_rusqlite::Error),

  #[error("invalid uuid in database: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("invalid timestamp in database: {0}")]
  DateParse(String),

  #[error("invalid enum value in database: {0}")]
  EnumParse(String),
}

impl Error {
  /// The domain error inside, if this is a domain-rule violation.
  pub fn as_domain(&self) -> Option<&bursary_core::Error> {
    match self {
      Self::Domain(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
