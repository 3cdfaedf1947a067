//! API error type, the JSON response envelope, and the mapping from
//! domain errors to HTTP status codes.
//!
//! Every response body uses the same envelope: `{"success": true, "data":
//! ...}` on the happy path (see [`crate::respond`]), `{"success": false,
//! "error": "..."}` here on failure.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bursary_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("authentication required")]
  Unauthorized,

  #[error("{0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Translate a store-layer failure. Domain errors are recovered from the
  /// error's `source` chain and mapped to their status codes; anything else
  /// is an opaque 500.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = current {
      if let Some(domain) = e.downcast_ref::<CoreError>() {
        return Self::from_domain(domain);
      }
      current = e.source();
    }
    Self::Store(Box::new(err))
  }

  fn from_domain(err: &CoreError) -> Self {
    match err {
      CoreError::DonorNotFound(_)
      | CoreError::StudentNotFound(_)
      | CoreError::DonationNotFound(_)
      | CoreError::RegistryItemNotFound(_)
      | CoreError::RecurringDonationNotFound(_)
      | CoreError::VerificationNotFound(_)
      | CoreError::BookmarkNotFound(_)
      | CoreError::SchoolNotFound(_)
      | CoreError::UserNotFound(_) => Self::NotFound(err.to_string()),

      CoreError::AmountInvalid(_) | CoreError::AmountExceeds { .. } => {
        Self::Validation(err.to_string())
      }

      CoreError::InvalidState(_)
      | CoreError::RegistryClosed(_)
      | CoreError::Conflict(_) => Self::Conflict(err.to_string()),

      CoreError::Serialization(_) => {
        Self::Store(Box::new(std::io::Error::other(err.to_string())))
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, self.to_string())
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      // Internal details stay in the logs, not the response body.
      ApiError::Store(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
      }
    };
    if let ApiError::Store(e) = &self {
      tracing::error!(error = %e, "request failed with store error");
    }
    (status, Json(json!({ "success": false, "error": message })))
      .into_response()
  }
}
