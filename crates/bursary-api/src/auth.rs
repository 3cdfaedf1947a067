//! Bearer-token auth: token issuance/verification, password hashing, and
//! role-gating extractors.
//!
//! Tokens are deliberately thin: a base64 JSON claims payload plus a
//! SHA-256 signature keyed on the server secret. Password hashes are argon2
//! PHC strings; the store only ever sees the hash.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use bursary_core::admin::UserRole;
use chrono::Utc;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Issued tokens are valid for a day.
const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Server-side secret used to sign and verify tokens.
#[derive(Clone)]
pub struct AuthKeys {
  secret: Vec<u8>,
}

impl AuthKeys {
  pub fn new(secret: impl Into<Vec<u8>>) -> Self {
    Self { secret: secret.into() }
  }
}

// ─── Claims ──────────────────────────────────────────────────────────────────

/// The authenticated identity threaded into handlers. Always an explicit
/// argument, never ambient state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Claims {
  pub user_id: Uuid,
  pub role:    UserRole,
  /// Unix expiry timestamp.
  pub exp:     i64,
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

fn sign(keys: &AuthKeys, payload: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(&keys.secret);
  hasher.update(b".");
  hasher.update(payload.as_bytes());
  hex::encode(hasher.finalize())
}

/// Issue a signed bearer token for `user_id` acting as `role`.
pub fn issue_token(
  keys: &AuthKeys,
  user_id: Uuid,
  role: UserRole,
) -> Result<String, ApiError> {
  let claims = Claims {
    user_id,
    role,
    exp: Utc::now().timestamp() + TOKEN_TTL_SECS,
  };
  let json = serde_json::to_vec(&claims)
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  let payload = B64.encode(json);
  let signature = sign(keys, &payload);
  Ok(format!("{payload}.{signature}"))
}

/// Verify a bearer token and return its claims. Any malformation, bad
/// signature, or expiry is a plain 401 — no detail leaks.
pub fn verify_token(keys: &AuthKeys, token: &str) -> Result<Claims, ApiError> {
  let (payload, signature) =
    token.split_once('.').ok_or(ApiError::Unauthorized)?;

  if sign(keys, payload) != signature {
    return Err(ApiError::Unauthorized);
  }

  let json = B64.decode(payload).map_err(|_| ApiError::Unauthorized)?;
  let claims: Claims =
    serde_json::from_slice(&json).map_err(|_| ApiError::Unauthorized)?;

  if claims.exp <= Utc::now().timestamp() {
    return Err(ApiError::Unauthorized);
  }
  Ok(claims)
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| ApiError::Validation(format!("password error: {e}")))?
      .to_string(),
  )
}

/// Verify a password against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<(), ApiError> {
  let parsed = PasswordHash::new(phc).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthorized)
}

// ─── Extractors ──────────────────────────────────────────────────────────────

fn bearer_claims<S>(
  parts: &Parts,
  state: &AppState<S>,
) -> Result<Claims, ApiError> {
  let header = parts
    .headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;
  let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;
  verify_token(&state.auth, token)
}

/// A request authenticated as a donor.
pub struct DonorClaims(pub Claims);

impl<S: Send + Sync> FromRequestParts<AppState<S>> for DonorClaims {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let claims = bearer_claims(parts, state)?;
    match claims.role {
      UserRole::Donor => Ok(Self(claims)),
      _ => Err(ApiError::Forbidden("donor account required".into())),
    }
  }
}

/// A request authenticated as a student.
pub struct StudentClaims(pub Claims);

impl<S: Send + Sync> FromRequestParts<AppState<S>> for StudentClaims {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let claims = bearer_claims(parts, state)?;
    match claims.role {
      UserRole::Student => Ok(Self(claims)),
      _ => Err(ApiError::Forbidden("student account required".into())),
    }
  }
}

/// A request authenticated as an admin or super-admin.
pub struct AdminClaims(pub Claims);

impl<S: Send + Sync> FromRequestParts<AppState<S>> for AdminClaims {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let claims = bearer_claims(parts, state)?;
    match claims.role {
      UserRole::Admin | UserRole::SuperAdmin => Ok(Self(claims)),
      _ => Err(ApiError::Forbidden("admin account required".into())),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::http::{Request, header};

  use super::*;

  fn keys() -> AuthKeys {
    AuthKeys::new(b"test-secret".to_vec())
  }

  fn state() -> AppState<()> {
    AppState { store: Arc::new(()), auth: Arc::new(keys()) }
  }

  #[test]
  fn token_roundtrip() {
    let keys = keys();
    let user_id = Uuid::new_v4();
    let token = issue_token(&keys, user_id, UserRole::Donor).unwrap();

    let claims = verify_token(&keys, &token).unwrap();
    assert_eq!(claims.user_id, user_id);
    assert!(matches!(claims.role, UserRole::Donor));
  }

  #[test]
  fn tampered_token_rejected() {
    let keys = keys();
    let token = issue_token(&keys, Uuid::new_v4(), UserRole::Donor).unwrap();
    let mut tampered = token.clone();
    tampered.replace_range(0..1, "X");
    assert!(matches!(
      verify_token(&keys, &tampered),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn token_from_other_secret_rejected() {
    let token =
      issue_token(&keys(), Uuid::new_v4(), UserRole::Admin).unwrap();
    let other = AuthKeys::new(b"other-secret".to_vec());
    assert!(matches!(
      verify_token(&other, &token),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn expired_token_rejected() {
    let keys = keys();
    let claims = Claims {
      user_id: Uuid::new_v4(),
      role:    UserRole::Donor,
      exp:     Utc::now().timestamp() - 10,
    };
    let payload = B64.encode(serde_json::to_vec(&claims).unwrap());
    let token = format!("{payload}.{}", sign(&keys, &payload));
    assert!(matches!(
      verify_token(&keys, &token),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn password_roundtrip() {
    let hash = hash_password("hunter2").unwrap();
    assert!(verify_password("hunter2", &hash).is_ok());
    assert!(matches!(
      verify_password("wrong", &hash),
      Err(ApiError::Unauthorized)
    ));
  }

  async fn extract_donor(
    token: Option<&str>,
  ) -> Result<DonorClaims, ApiError> {
    let mut builder = Request::builder();
    if let Some(t) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = builder.body(()).unwrap();
    let (mut parts, _) = req.into_parts();
    DonorClaims::from_request_parts(&mut parts, &state()).await
  }

  #[tokio::test]
  async fn missing_header_is_unauthorized() {
    assert!(matches!(
      extract_donor(None).await,
      Err(ApiError::Unauthorized)
    ));
  }

  #[tokio::test]
  async fn wrong_role_is_forbidden() {
    let token =
      issue_token(&keys(), Uuid::new_v4(), UserRole::Student).unwrap();
    assert!(matches!(
      extract_donor(Some(&token)).await,
      Err(ApiError::Forbidden(_))
    ));
  }

  #[tokio::test]
  async fn donor_token_accepted() {
    let user_id = Uuid::new_v4();
    let token = issue_token(&keys(), user_id, UserRole::Donor).unwrap();
    let DonorClaims(claims) = extract_donor(Some(&token)).await.unwrap();
    assert_eq!(claims.user_id, user_id);
  }
}
