//! School-verification workflow types.
//!
//! One verification row exists per student. The lifecycle is
//! `pending → approved | rejected`; a rejected student may resubmit, which
//! overwrites the same row back to `pending` and clears the rejection
//! reason. Approval flips `Student::verified` in the same transaction as
//! the status update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationStatus {
  Pending,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolVerification {
  pub verification_id:  Uuid,
  pub student_id:       Uuid,
  pub school_id:        Uuid,
  /// Link to the uploaded enrollment proof; storage is external.
  pub document_url:     String,
  pub status:           VerificationStatus,
  pub rejection_reason: Option<String>,
  pub submitted_at:     DateTime<Utc>,
  pub reviewed_at:      Option<DateTime<Utc>>,
}

/// Input to [`crate::store::PlatformStore::submit_verification`].
#[derive(Debug, Clone)]
pub struct NewVerification {
  pub student_id:   Uuid,
  pub school_id:    Uuid,
  pub document_url: String,
}

/// A school in the seeded reference list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
  pub school_id: Uuid,
  pub name:      String,
  pub city:      String,
  pub state:     String,
}

/// Queue counts for the admin verification dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationStats {
  pub pending:  i64,
  pub approved: i64,
  pub rejected: i64,
}
