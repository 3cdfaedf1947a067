//! Student profiles — the fundable side of the platform.
//!
//! A student's `amount_raised` is a denormalized running total. It is only
//! ever written by the ledger operations (completed donation, refund); no
//! other code path may set it directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::money::Cents;

// ─── Enums ───────────────────────────────────────────────────────────────────

/// How far along a student is in onboarding.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegistrationStatus {
  #[default]
  Incomplete,
  Complete,
}

/// Self-reported urgency of the student's funding need.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Urgency {
  Low,
  #[default]
  Medium,
  High,
}

// ─── Student ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
  pub student_id:          Uuid,
  pub name:                String,
  pub email:               String,
  pub school:              String,
  pub major:               String,
  pub location:            String,
  pub graduation_year:     i32,
  pub bio:                 String,
  pub urgency:             Urgency,
  pub funding_goal:        Cents,
  /// Maintained exclusively by ledger operations; never negative.
  pub amount_raised:       Cents,
  /// Count of completed donations received.
  pub total_donations:     i64,
  pub registration_status: RegistrationStatus,
  /// Set when a school verification is approved.
  pub verified:            bool,
  pub is_active:           bool,
  pub public_profile:      bool,
  pub last_active:         DateTime<Utc>,
  pub created_at:          DateTime<Utc>,
}

/// Input to [`crate::store::PlatformStore::add_student`].
/// Balances and flags start at their onboarding defaults.
#[derive(Debug, Clone)]
pub struct NewStudent {
  pub name:            String,
  pub email:           String,
  pub school:          String,
  pub major:           String,
  pub location:        String,
  pub graduation_year: i32,
  pub bio:             String,
  pub urgency:         Urgency,
  pub funding_goal:    Cents,
}

/// Donor- and self-service-editable profile fields. `None` leaves the field
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentProfileUpdate {
  pub name:            Option<String>,
  pub school:          Option<String>,
  pub major:           Option<String>,
  pub location:        Option<String>,
  pub graduation_year: Option<i32>,
  pub bio:             Option<String>,
  pub urgency:         Option<Urgency>,
  pub funding_goal:    Option<Cents>,
  pub public_profile:  Option<bool>,
}
