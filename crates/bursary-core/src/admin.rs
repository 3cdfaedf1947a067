//! Admin-facing read models and audit records.
//!
//! All aggregate values are computed fresh per request from the donation
//! table; there is no caching layer. Only completed, non-refunded donations
//! count toward revenue totals.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::money::Cents;

// ─── Platform overview ───────────────────────────────────────────────────────

/// Top-level counters for `GET /admin/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct PlatformStats {
  pub total_donors:          i64,
  pub total_students:        i64,
  pub verified_students:     i64,
  pub total_raised:          Cents,
  pub total_donations:       i64,
  pub pending_verifications: i64,
}

// ─── Donation analytics ──────────────────────────────────────────────────────

/// One `(key, total, count)` aggregation bucket, used for both
/// payment-method and donation-type breakdowns.
#[derive(Debug, Clone, Serialize)]
pub struct Breakdown {
  pub key:   String,
  pub total: Cents,
  pub count: i64,
}

/// Completed-donation volume for one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DailyVolume {
  pub day:   NaiveDate,
  pub total: Cents,
  pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopDonor {
  pub donor_id: Uuid,
  pub name:     String,
  pub total:    Cents,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopStudent {
  pub student_id: Uuid,
  pub name:       String,
  pub raised:     Cents,
}

/// The full analytics payload for `GET /donation-admin/analytics`,
/// restricted to a date range.
#[derive(Debug, Clone, Serialize)]
pub struct DonationAnalytics {
  pub total_volume:      Cents,
  pub donation_count:    i64,
  pub refunded_total:    Cents,
  pub by_payment_method: Vec<Breakdown>,
  pub by_donation_type:  Vec<Breakdown>,
  pub daily:             Vec<DailyVolume>,
  pub top_donors:        Vec<TopDonor>,
  pub top_students:      Vec<TopStudent>,
}

// ─── User administration ─────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserRole {
  Donor,
  Student,
  Admin,
  SuperAdmin,
}

/// A row in the admin user listing — donors and students flattened into a
/// single account view.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
  pub user_id:    Uuid,
  pub name:       String,
  pub email:      String,
  pub role:       UserRole,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
}

// ─── Audit trail ─────────────────────────────────────────────────────────────

/// An audit row written alongside every admin mutation (verification
/// decisions, refunds, user-status changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAction {
  pub action_id:  Uuid,
  pub admin_id:   Uuid,
  /// Short verb, e.g. `approve_verification`, `refund_donation`.
  pub action:     String,
  pub target_id:  Uuid,
  pub detail:     Option<String>,
  pub created_at: DateTime<Utc>,
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// Result of recomputing a denormalized counter from the donation table.
/// `drift` is `stored - recomputed`; zero means the counter is consistent.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
  pub subject_id: Uuid,
  pub stored:     Cents,
  pub recomputed: Cents,
  pub drift:      Cents,
}

impl ReconcileReport {
  pub fn is_consistent(&self) -> bool { self.drift == 0 }
}
