//! Handlers for the donation-admin surface: the cross-donor ledger view,
//! analytics, refunds, and Zelle confirmation.

use axum::{
  Json,
  extract::{Path, Query, State},
  response::IntoResponse,
};
use bursary_core::{
  donation::{DonationStatus, DonationType},
  money::Cents,
  query::{DEFAULT_PAGE_SIZE, DonationQuery, DonationSort, SortDirection},
  store::PlatformStore,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::AdminClaims,
  donations::{ExportFormat, render_export},
  error::ApiError,
  respond,
};

#[derive(Debug, Deserialize, Default)]
pub struct AdminHistoryParams {
  /// Unlike the donor surface, admins may scope to any donor — or none.
  pub donor_id:   Option<Uuid>,
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

/// `GET /donation-admin/donations` — the full ledger, filterable.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
  Query(params): Query<AdminHistoryParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let query = DonationQuery {
    donor_id:   params.donor_id,
    student_id: params.student_id,
    status:     params.status,
    kind:       params.kind,
    after:      params.after,
    before:     params.before,
    recurring:  params.recurring,
    sort:       params.sort.unwrap_or_default(),
    direction:  params.direction.unwrap_or_default(),
    page:       params.page.unwrap_or(1),
    limit:      params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
  };
  let page = state
    .store
    .list_donations(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(page))
}

#[derive(Debug, Deserialize, Default)]
pub struct AnalyticsParams {
  pub after:  Option<DateTime<Utc>>,
  pub before: Option<DateTime<Utc>>,
}

/// `GET /donation-admin/analytics[?after=...][&before=...]`
pub async fn analytics<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
  Query(params): Query<AnalyticsParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let analytics = state
    .store
    .donation_analytics(params.after, params.before)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(analytics))
}

#[derive(Debug, Deserialize)]
pub struct RefundBody {
  pub amount: Cents,
  pub reason: String,
}

/// `POST /donation-admin/refund/{donation_id}` — full or partial refund,
/// audited under the acting admin.
pub async fn refund<S>(
  State(state): State<AppState<S>>,
  AdminClaims(claims): AdminClaims,
  Path(donation_id): Path<Uuid>,
  Json(body): Json<RefundBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  if body.amount <= 0 {
    return Err(ApiError::Validation("refund amount must be positive".into()));
  }
  if body.reason.trim().is_empty() {
    return Err(ApiError::Validation("a refund reason is required".into()));
  }
  let donation = state
    .store
    .refund_donation(donation_id, body.amount, body.reason, claims.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(donation))
}

/// `POST /donation-admin/verify-zelle/{donation_id}` — confirm an
/// out-of-band Zelle transfer, completing the pending donation.
pub async fn verify_zelle<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
  Path(donation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let donation = state
    .store
    .complete_donation(donation_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(respond::ok(donation))
}

#[derive(Debug, Deserialize)]
pub struct AdminExportParams {
  pub donor_id: Uuid,
  #[serde(default)]
  pub format:   ExportFormat,
  pub after:    Option<DateTime<Utc>>,
  pub before:   Option<DateTime<Utc>>,
}

/// `GET /donation-admin/export?donor_id=...` — any donor's export.
pub async fn export<S>(
  State(state): State<AppState<S>>,
  AdminClaims(_): AdminClaims,
  Query(params): Query<AdminExportParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  let rows = state
    .store
    .export_donations(params.donor_id, params.after, params.before)
    .await
    .map_err(ApiError::from_store)?;
  Ok(render_export(rows, params.format))
}
