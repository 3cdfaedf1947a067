//! Donation records — the source of truth for all money movement.
//!
//! Every denormalized balance on the platform (`Student::amount_raised`,
//! `Donor::total_donated`, `RegistryItem::amount_funded`) is derivable from
//! this table by summing completed, non-refunded donations. The ledger
//! operations keep those balances in lockstep; reconciliation checks them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::money::Cents;

// ─── Enums ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DonationStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DonationType {
  #[default]
  General,
  Item,
  Emergency,
  RegistrationFee,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
  #[default]
  Card,
  Zelle,
  Other,
}

// ─── Donation ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
  pub donation_id:        Uuid,
  pub student_id:         Uuid,
  /// `None` for anonymous donations.
  pub donor_id:           Option<Uuid>,
  pub amount:             Cents,
  /// Amount net of processing fees; equals `amount` when no fee applies.
  pub net_amount:         Cents,
  pub status:             DonationStatus,
  pub donation_type:      DonationType,
  pub payment_method:     PaymentMethod,
  /// Set when this donation sponsors a specific registry item.
  pub target_registry_id: Option<Uuid>,
  /// Set when this donation was made under a recurring plan.
  pub recurring_id:       Option<Uuid>,
  pub receipt_number:     String,
  pub created_at:         DateTime<Utc>,
  /// Stamped when the donation reaches `Completed`.
  pub processed_at:       Option<DateTime<Utc>>,
  /// How much was returned; at most `amount`.
  pub refund_amount:      Option<Cents>,
  pub refund_reason:      Option<String>,
  pub refunded_at:        Option<DateTime<Utc>>,
}

/// Input to the donation-recording ledger operations. Identifiers, receipt
/// numbers, and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewDonation {
  pub student_id:         Uuid,
  pub donor_id:           Option<Uuid>,
  pub amount:             Cents,
  pub net_amount:         Cents,
  pub donation_type:      DonationType,
  pub payment_method:     PaymentMethod,
  pub target_registry_id: Option<Uuid>,
  pub recurring_id:       Option<Uuid>,
}

impl NewDonation {
  /// Convenience constructor for a general donation with no fee split.
  pub fn general(student_id: Uuid, donor_id: Option<Uuid>, amount: Cents) -> Self {
    Self {
      student_id,
      donor_id,
      amount,
      net_amount: amount,
      donation_type: DonationType::General,
      payment_method: PaymentMethod::Card,
      target_registry_id: None,
      recurring_id: None,
    }
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

/// Totals shown alongside a donor's paginated history.
#[derive(Debug, Clone, Serialize)]
pub struct DonationSummary {
  /// Sum of completed, non-refunded donation amounts.
  pub lifetime_total:   Cents,
  pub donation_count:   i64,
  pub active_recurring: i64,
}
