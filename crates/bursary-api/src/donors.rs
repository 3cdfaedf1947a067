//! Handlers for donor self-service: profile, dashboard, and bookmarks.

use axum::{
  Json,
  extract::{Path, State},
  response::IntoResponse,
};
use bursary_core::{donor::DonorProfileUpdate, store::PlatformStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::DonorClaims, error::ApiError, respond};

/// `GET /donors/profile`
pub async fn get_profile<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let donor = state
    .store
    .get_donor(claims.user_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("donor profile not found".into()))?;
  Ok(respond::ok(donor))
}

/// `PUT /donors/profile`
pub async fn update_profile<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Json(update): Json<DonorProfileUpdate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let donor = state
    .store
    .update_donor_profile(claims.user_id, update)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(donor))
}

/// `GET /donors/dashboard/stats`
pub async fn dashboard<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let dashboard = state
    .store
    .donor_dashboard(claims.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(dashboard))
}

// ─── Bookmarks ───────────────────────────────────────────────────────────────

/// `GET /donors/bookmarks`
pub async fn list_bookmarks<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let students = state
    .store
    .list_bookmarks(claims.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(students))
}

#[derive(Debug, Deserialize)]
pub struct AddBookmarkBody {
  pub student_id: Uuid,
}

/// `POST /donors/bookmarks` — body: `{"student_id": "..."}`
pub async fn add_bookmark<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Json(body): Json<AddBookmarkBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  state
    .store
    .add_bookmark(claims.user_id, body.student_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::created(serde_json::json!({ "student_id": body.student_id })))
}

/// `DELETE /donors/bookmarks/{student_id}`
pub async fn remove_bookmark<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Path(student_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  state
    .store
    .remove_bookmark(claims.user_id, student_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::message("bookmark removed"))
}
