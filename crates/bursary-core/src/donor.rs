//! Donor profiles and dashboard summary types.
//!
//! `total_donated`, `students_supported`, and `impact_score` are
//! denormalized read-mostly fields. They are written only by the ledger
//! operations and checked against the donation table by reconciliation;
//! ad-hoc code paths must not touch them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Cents;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donor {
  pub donor_id:           Uuid,
  pub name:               String,
  pub email:              String,
  /// Sum of completed, non-refunded donation amounts.
  pub total_donated:      Cents,
  /// Distinct students who received at least one completed donation.
  pub students_supported: i64,
  /// Derived score; see [`crate::ledger::impact_score`].
  pub impact_score:       i64,
  pub is_active:          bool,
  pub created_at:         DateTime<Utc>,
}

/// Input to [`crate::store::PlatformStore::add_donor`].
#[derive(Debug, Clone)]
pub struct NewDonor {
  pub name:  String,
  pub email: String,
}

/// Editable donor profile fields; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonorProfileUpdate {
  pub name:  Option<String>,
  pub email: Option<String>,
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// Percentile bucket of a donor's lifetime total among all donors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityRank {
  Top10,
  Top25,
  Top50,
  NewDonor,
}

/// The donor dashboard read model — always computed, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct DonorDashboard {
  pub total_donated:      Cents,
  pub students_supported: i64,
  pub impact_score:       i64,
  pub donation_count:     i64,
  pub active_recurring:   i64,
  pub community_rank:     CommunityRank,
  /// Sum of completed donations in the current calendar month.
  pub this_month:         Cents,
}
