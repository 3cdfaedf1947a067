//! Error types for `bursary-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::money::Cents;

#[derive(Debug, Error)]
pub enum Error {
  #[error("donor not found: {0}")]
  DonorNotFound(Uuid),

  #[error("student not found: {0}")]
  StudentNotFound(Uuid),

  #[error("donation not found: {0}")]
  DonationNotFound(Uuid),

  #[error("registry item not found: {0}")]
  RegistryItemNotFound(Uuid),

  #[error("recurring donation not found: {0}")]
  RecurringDonationNotFound(Uuid),

  #[error("verification not found: {0}")]
  VerificationNotFound(Uuid),

  #[error("bookmark not found for student {0}")]
  BookmarkNotFound(Uuid),

  #[error("donation amount must be positive, got {0}")]
  AmountInvalid(Cents),

  #[error("refund of {refund} exceeds donation amount {amount}")]
  AmountExceeds { refund: Cents, amount: Cents },

  #[error("operation not allowed in the current state of {0}")]
  InvalidState(Uuid),

  #[error("school not found: {0}")]
  SchoolNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("registry item {0} is no longer accepting funds")]
  RegistryClosed(Uuid),

  #[error("{0}")]
  Conflict(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
