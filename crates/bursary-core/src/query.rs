//! Query types for student discovery and donation history.
//!
//! Filters are explicit optional fields composed by the store into an AND
//! predicate; there is no dynamic/untyped filter object anywhere. Page and
//! limit values arriving from the HTTP layer are clamped here so every
//! backend sees the same bounds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  donation::{Donation, DonationStatus, DonationSummary, DonationType},
  money::Cents,
  student::{Student, Urgency},
};

pub const MAX_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Clamp a requested `(page, limit)` pair to valid bounds: page ≥ 1,
/// 1 ≤ limit ≤ [`MAX_PAGE_SIZE`].
pub fn clamp_paging(page: u32, limit: u32) -> (u32, u32) {
  (page.max(1), limit.clamp(1, MAX_PAGE_SIZE))
}

// ─── Student discovery ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StudentSort {
  /// `last_active` descending.
  #[default]
  Recent,
  /// Name ascending.
  Name,
  GoalAsc,
  GoalDesc,
  /// `amount_raised` descending, `funding_goal` ascending as tiebreak.
  Progress,
}

/// Parameters for [`crate::store::PlatformStore::search_students`].
#[derive(Debug, Clone, Default)]
pub struct StudentQuery {
  /// Case-insensitive substring over name, school, major, and bio.
  pub search:           Option<String>,
  pub school:           Option<String>,
  pub major:            Option<String>,
  pub location:         Option<String>,
  pub graduation_year:  Option<i32>,
  pub urgency:          Option<Urgency>,
  pub min_goal:         Option<Cents>,
  pub max_goal:         Option<Cents>,
  pub verified:         Option<bool>,
  /// Admin-facing queries lift the donor-facing
  /// `is_active && public_profile && verified` base predicate.
  pub include_unverified: bool,
  pub sort:             StudentSort,
  pub page:             u32,
  pub limit:            u32,
}

/// A student row with its derived progress percentage attached.
#[derive(Debug, Clone, Serialize)]
pub struct StudentWithProgress {
  #[serde(flatten)]
  pub student:             Student,
  pub progress_percentage: u32,
}

/// Distinct filter values currently represented among discoverable
/// students, independent of any applied filters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StudentFacets {
  pub schools:   Vec<String>,
  pub majors:    Vec<String>,
  pub locations: Vec<String>,
}

/// One page of discovery results.
#[derive(Debug, Clone, Serialize)]
pub struct StudentPage {
  pub students: Vec<StudentWithProgress>,
  pub total:    i64,
  pub page:     u32,
  pub limit:    u32,
  pub facets:   StudentFacets,
}

// ─── Donation history ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationSort {
  #[default]
  Date,
  Amount,
  StudentName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
  Asc,
  #[default]
  Desc,
}

/// Parameters for [`crate::store::PlatformStore::list_donations`].
#[derive(Debug, Clone, Default)]
pub struct DonationQuery {
  /// Restrict to one donor's history (donor self-service); `None` for the
  /// admin-facing listing across all donors.
  pub donor_id:   Option<Uuid>,
  pub student_id: Option<Uuid>,
  pub status:     Option<DonationStatus>,
  pub kind:       Option<DonationType>,
  pub after:      Option<DateTime<Utc>>,
  pub before:     Option<DateTime<Utc>>,
  /// `Some(true)` keeps only donations made under a recurring plan.
  pub recurring:  Option<bool>,
  pub sort:       DonationSort,
  pub direction:  SortDirection,
  pub page:       u32,
  pub limit:      u32,
}

/// A donation joined with the receiving student's display fields.
#[derive(Debug, Clone, Serialize)]
pub struct DonationRecord {
  #[serde(flatten)]
  pub donation:     Donation,
  pub student_name: String,
  pub school:       String,
}

/// One page of donation history plus the summary block.
#[derive(Debug, Clone, Serialize)]
pub struct DonationPage {
  pub donations: Vec<DonationRecord>,
  pub total:     i64,
  pub page:      u32,
  pub limit:     u32,
  pub summary:   DonationSummary,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn paging_clamps_to_bounds() {
    assert_eq!(clamp_paging(0, 0), (1, 1));
    assert_eq!(clamp_paging(3, 25), (3, 25));
    assert_eq!(clamp_paging(1, 500), (1, MAX_PAGE_SIZE));
  }
}
