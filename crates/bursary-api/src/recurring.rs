//! Handlers for donor recurring-donation plans.

use axum::{
  Json,
  extract::{Path, State},
  response::IntoResponse,
};
use bursary_core::{
  money::Cents,
  recurring::{Frequency, NewRecurringDonation, RecurringUpdate},
  store::PlatformStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::DonorClaims, error::ApiError, respond};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub student_id: Uuid,
  pub amount:     Cents,
  pub frequency:  Frequency,
}

/// `POST /donors/recurring-donations`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let plan = state
    .store
    .add_recurring_donation(NewRecurringDonation {
      donor_id:   claims.user_id,
      student_id: body.student_id,
      amount:     body.amount,
      frequency:  body.frequency,
    })
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::created(plan))
}

/// `GET /donors/recurring-donations`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let plans = state
    .store
    .list_recurring_donations(claims.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(plans))
}

/// `PATCH /donors/recurring-donations/{id}` — amount change, frequency
/// change, pause (`active: false`) or resume. Only the owning donor may
/// touch a plan; anyone else sees a 404.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Path(id): Path<Uuid>,
  Json(update): Json<RecurringUpdate>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let plan = state
    .store
    .update_recurring_donation(id, claims.user_id, update)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(plan))
}
