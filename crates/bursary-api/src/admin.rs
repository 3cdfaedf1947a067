//! Handlers for the platform-admin surface: stats, user management, and the
//! verification queue.

use axum::{
  Json,
  extract::{Path, Query, State},
  response::IntoResponse,
};
use bursary_core::{
  store::PlatformStore,
  verification::VerificationStatus,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::AdminClaims, error::ApiError, respond};

/// `GET /admin/stats`
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let stats =
    state.store.platform_stats().await.map_err(ApiError::from_store)?;
  Ok(respond::ok(stats))
}

/// `GET /admin/users`
pub async fn list_users<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let users = state.store.list_users().await.map_err(ApiError::from_store)?;
  Ok(respond::ok(users))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusBody {
  pub is_active: bool,
}

/// `PUT /admin/users/{id}/status`
pub async fn set_user_status<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
  Path(id): Path<Uuid>,
  Json(body): Json<SetStatusBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let user = state
    .store
    .set_user_status(id, body.is_active)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(user))
}

// ─── Verification queue ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct QueueParams {
  pub status: Option<VerificationStatus>,
}

/// `GET /admin/verification/verifications[?status=pending|approved|rejected]`
pub async fn list_verifications<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
  Query(params): Query<QueueParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let verifications = state
    .store
    .list_verifications(params.status)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(verifications))
}

/// `GET /admin/verification/verifications/stats`
pub async fn verification_stats<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let stats = state
    .store
    .verification_stats()
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(stats))
}

/// `POST /admin/verification/verifications/{id}/approve`
pub async fn approve_verification<S>(
  State(state): State<AppState<S>>,
  AdminClaims(claims): AdminClaims,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let verification = state
    .store
    .approve_verification(id, claims.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(verification))
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub reason: String,
}

/// `POST /admin/verification/verifications/{id}/reject`
pub async fn reject_verification<S>(
  State(state): State<AppState<S>>,
  AdminClaims(claims): AdminClaims,
  Path(id): Path<Uuid>,
  Json(body): Json<RejectBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  if body.reason.trim().is_empty() {
    return Err(ApiError::Validation("a rejection reason is required".into()));
  }
  let verification = state
    .store
    .reject_verification(id, claims.user_id, body.reason)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(verification))
}
