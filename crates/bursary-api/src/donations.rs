//! Handlers for donor donations: history, export, direct giving, and
//! registry-item sponsorship.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{StatusCode, header},
  response::IntoResponse,
};
use bursary_core::{
  donation::{DonationStatus, DonationType, NewDonation, PaymentMethod},
  export,
  money::Cents,
  query::{DEFAULT_PAGE_SIZE, DonationQuery, DonationSort, SortDirection},
  store::PlatformStore,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::DonorClaims, error::ApiError, respond};

// ─── History ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct HistoryParams {
  pub student_id: Option<Uuid>,
  pub status:     Option<DonationStatus>,
  pub kind:       Option<DonationType>,
  pub after:      Option<DateTime<Utc>>,
  pub before:     Option<DateTime<Utc>>,
  pub recurring:  Option<bool>,
  pub sort:       Option<DonationSort>,
  pub direction:  Option<SortDirection>,
  pub page:       Option<u32>,
  pub limit:      Option<u32>,
}

impl HistoryParams {
  pub(crate) fn into_query(self, donor_id: Option<Uuid>) -> DonationQuery {
    DonationQuery {
      donor_id,
      student_id: self.student_id,
      status: self.status,
      kind: self.kind,
      after: self.after,
      before: self.before,
      recurring: self.recurring,
      sort: self.sort.unwrap_or_default(),
      direction: self.direction.unwrap_or_default(),
      page: self.page.unwrap_or(1),
      limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    }
  }
}

/// `GET /donors/donations` — the caller's own history only.
pub async fn history<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let page = state
    .store
    .list_donations(&params.into_query(Some(claims.user_id)))
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(page))
}

// ─── Giving ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DonateBody {
  pub student_id:     Uuid,
  pub amount:         Cents,
  #[serde(default)]
  pub donation_type:  DonationType,
  #[serde(default)]
  pub payment_method: PaymentMethod,
}

/// `POST /donors/donations` — card donations complete immediately; Zelle
/// donations stay pending until an admin verifies the transfer.
pub async fn donate<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Json(body): Json<DonateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let input = NewDonation {
    donation_type: body.donation_type,
    payment_method: body.payment_method,
    ..NewDonation::general(body.student_id, Some(claims.user_id), body.amount)
  };

  let donation = match body.payment_method {
    PaymentMethod::Zelle => state.store.record_pending_donation(input).await,
    _ => state.store.record_completed_donation(input).await,
  }
  .map_err(ApiError::from_store)?;

  Ok(respond::created(donation))
}

#[derive(Debug, Deserialize)]
pub struct SponsorBody {
  pub amount:         Cents,
  #[serde(default)]
  pub payment_method: PaymentMethod,
}

/// `POST /donors/items/{item_id}/sponsor`
pub async fn sponsor<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Path(item_id): Path<Uuid>,
  Json(body): Json<SponsorBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let item = state
    .store
    .get_registry_item(item_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("registry item {item_id} not found"))
    })?;

  let donation = state
    .store
    .record_completed_donation(NewDonation {
      donation_type: DonationType::Item,
      payment_method: body.payment_method,
      target_registry_id: Some(item_id),
      ..NewDonation::general(
        item.student_id,
        Some(claims.user_id),
        body.amount,
      )
    })
    .await
    .map_err(ApiError::from_store)?;

  Ok(respond::created(donation))
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
  #[default]
  Csv,
  Json,
}

#[derive(Debug, Deserialize, Default)]
pub struct ExportParams {
  #[serde(default)]
  pub format: ExportFormat,
  pub after:  Option<DateTime<Utc>>,
  pub before: Option<DateTime<Utc>>,
}

/// Render export rows in the requested format. CSV carries an attachment
/// disposition; JSON is the same rows in the standard envelope.
pub(crate) fn render_export(
  rows: Vec<export::ExportRow>,
  format: ExportFormat,
) -> axum::response::Response {
  match format {
    ExportFormat::Csv => (
      StatusCode::OK,
      [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (
          header::CONTENT_DISPOSITION,
          "attachment; filename=\"donations.csv\"",
        ),
      ],
      export::to_csv(&rows),
    )
      .into_response(),
    ExportFormat::Json => respond::ok(rows).into_response(),
  }
}

/// `GET /donors/donations/export?format=csv|json[&after=...][&before=...]`
pub async fn export<S>(
  State(state): State<AppState<S>>,
  DonorClaims(claims): DonorClaims,
  Query(params): Query<ExportParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let rows = state
    .store
    .export_donations(claims.user_id, params.after, params.before)
    .await
    .map_err(ApiError::from_store)?;
  Ok(render_export(rows, params.format))
}
