//! Handlers for student self-service: profile, registry items, and
//! verification submission.

use axum::{
  Json,
  extract::{Path, State},
  response::IntoResponse,
};
use bursary_core::{
  ledger,
  money::Cents,
  query::StudentWithProgress,
  registry::{NewRegistryItem, RegistryItemUpdate},
  store::PlatformStore,
  student::StudentProfileUpdate,
  verification::NewVerification,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::StudentClaims, error::ApiError, respond};

/// `GET /students/profile`
pub async fn get_profile<S>(
  State(state): State<AppState<S>>,
  StudentClaims(claims): StudentClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let student = state
    .store
    .get_student(claims.user_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("student profile not found".into()))?;

  let progress_percentage =
    ledger::progress_percentage(student.amount_raised, student.funding_goal);
  Ok(respond::ok(StudentWithProgress { student, progress_percentage }))
}

/// `PUT /students/profile`
pub async fn update_profile<S>(
  State(state): State<AppState<S>>,
  StudentClaims(claims): StudentClaims,
  Json(update): Json<StudentProfileUpdate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  if let Some(goal) = update.funding_goal
    && goal < 0
  {
    return Err(ApiError::Validation(
      "funding goal must not be negative".into(),
    ));
  }
  let student = state
    .store
    .update_student_profile(claims.user_id, update)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(student))
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddItemBody {
  pub name:        String,
  #[serde(default)]
  pub description: String,
  pub price:       Cents,
}

/// `POST /students/registry`
pub async fn add_registry_item<S>(
  State(state): State<AppState<S>>,
  StudentClaims(claims): StudentClaims,
  Json(body): Json<AddItemBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let item = state
    .store
    .add_registry_item(NewRegistryItem {
      student_id:  claims.user_id,
      name:        body.name,
      description: body.description,
      price:       body.price,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::created(item))
}

/// `GET /students/registry` — the caller's own items.
pub async fn list_registry<S>(
  State(state): State<AppState<S>>,
  StudentClaims(claims): StudentClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let items = state
    .store
    .list_registry_items(claims.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(items))
}

/// `PUT /students/registry/{item_id}`
pub async fn update_registry_item<S>(
  State(state): State<AppState<S>>,
  StudentClaims(claims): StudentClaims,
  Path(item_id): Path<Uuid>,
  Json(update): Json<RegistryItemUpdate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let item = state
    .store
    .update_registry_item(item_id, claims.user_id, update)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(item))
}

/// `DELETE /students/registry/{item_id}` — only items with no funding.
pub async fn remove_registry_item<S>(
  State(state): State<AppState<S>>,
  StudentClaims(claims): StudentClaims,
  Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  state
    .store
    .remove_registry_item(item_id, claims.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::message("registry item removed"))
}

// ─── Verification ────────────────────────────────────────────────────────────

/// `GET /students/schools` — the seeded school list for the picker.
pub async fn list_schools<S>(
  State(state): State<AppState<S>>,
  StudentClaims(_): StudentClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let schools =
    state.store.list_schools().await.map_err(ApiError::from_store)?;
  Ok(respond::ok(schools))
}

#[derive(Debug, Deserialize)]
pub struct SubmitVerificationBody {
  pub school_id:    Uuid,
  pub document_url: String,
}

/// `POST /students/verification` — submit (or resubmit after rejection) an
/// enrollment proof.
pub async fn submit_verification<S>(
  State(state): State<AppState<S>>,
  StudentClaims(claims): StudentClaims,
  Json(body): Json<SubmitVerificationBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  if body.document_url.trim().is_empty() {
    return Err(ApiError::Validation("document_url is required".into()));
  }
  let verification = state
    .store
    .submit_verification(NewVerification {
      student_id:   claims.user_id,
      school_id:    body.school_id,
      document_url: body.document_url,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::created(verification))
}
