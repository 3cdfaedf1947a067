//! Handlers for donor-facing student discovery.
//!
//! Query params map onto [`StudentQuery`]; the donor-facing base predicate
//! (`is_active && public_profile && verified`) is always applied here —
//! `include_unverified` is reserved for the admin surface.

use axum::{
  extract::{Path, Query, State},
  response::IntoResponse,
};
use bursary_core::{
  ledger,
  money::Cents,
  query::{DEFAULT_PAGE_SIZE, StudentQuery, StudentSort, StudentWithProgress},
  store::PlatformStore,
  student::Urgency,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::DonorClaims, error::ApiError, respond};

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  /// Free-text filter over name, school, major, and bio.
  pub search:          Option<String>,
  pub school:          Option<String>,
  pub major:           Option<String>,
  pub location:        Option<String>,
  pub graduation_year: Option<i32>,
  pub urgency:         Option<Urgency>,
  pub min_goal:        Option<Cents>,
  pub max_goal:        Option<Cents>,
  pub sort:            Option<StudentSort>,
  pub page:            Option<u32>,
  pub limit:           Option<u32>,
}

impl SearchParams {
  fn into_query(self) -> StudentQuery {
    StudentQuery {
      search:             self.search,
      school:             self.school,
      major:              self.major,
      location:           self.location,
      graduation_year:    self.graduation_year,
      urgency:            self.urgency,
      min_goal:           self.min_goal,
      max_goal:           self.max_goal,
      verified:           None,
      include_unverified: false,
      sort:               self.sort.unwrap_or_default(),
      page:               self.page.unwrap_or(1),
      limit:              self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    }
  }
}

/// `GET /donors/students`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  DonorClaims(_): DonorClaims,
  Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let page = state
    .store
    .search_students(&params.into_query())
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(page))
}

/// `GET /donors/students/{id}` — 404 for students outside the discoverable
/// set, same as for missing ids.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  DonorClaims(_): DonorClaims,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let student = state
    .store
    .get_student(id)
    .await
    .map_err(ApiError::from_store)?
    .filter(|s| s.is_active && s.public_profile && s.verified)
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))?;

  let progress_percentage =
    ledger::progress_percentage(student.amount_raised, student.funding_goal);
  Ok(respond::ok(StudentWithProgress { student, progress_percentage }))
}

/// `GET /donors/students/{id}/registry`
pub async fn list_registry<S>(
  State(state): State<AppState<S>>,
  DonorClaims(_): DonorClaims,
  Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  state
    .store
    .get_student(id)
    .await
    .map_err(ApiError::from_store)?
    .filter(|s| s.is_active && s.public_profile && s.verified)
    .ok_or_else(|| ApiError::NotFound(format!("student {id} not found")))?;

  let items = state
    .store
    .list_registry_items(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(items))
}
