//! Recurring donation records.
//!
//! These are data records only: `next_payment_date` is advanced when a row
//! is created or edited, but no scheduler in this codebase consumes it to
//! trigger charges. Charge execution belongs to an external worker.

use chrono::{DateTime, Days, Months, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::money::Cents;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Frequency {
  Weekly,
  Monthly,
  Quarterly,
  Yearly,
}

impl Frequency {
  /// The payment date one interval after `from`.
  pub fn next_after(self, from: DateTime<Utc>) -> DateTime<Utc> {
    match self {
      Self::Weekly => from + Days::new(7),
      Self::Monthly => from + Months::new(1),
      Self::Quarterly => from + Months::new(3),
      Self::Yearly => from + Months::new(12),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringDonation {
  pub recurring_id:      Uuid,
  pub donor_id:          Uuid,
  pub student_id:        Uuid,
  pub amount:            Cents,
  pub frequency:         Frequency,
  pub active:            bool,
  pub next_payment_date: DateTime<Utc>,
  pub created_at:        DateTime<Utc>,
  pub cancelled_at:      Option<DateTime<Utc>>,
}

/// Input to [`crate::store::PlatformStore::add_recurring_donation`].
#[derive(Debug, Clone)]
pub struct NewRecurringDonation {
  pub donor_id:   Uuid,
  pub student_id: Uuid,
  pub amount:     Cents,
  pub frequency:  Frequency,
}

/// Patch applied to an existing recurring donation. `None` leaves the field
/// unchanged; `active: Some(false)` cancels and stamps `cancelled_at`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecurringUpdate {
  pub amount:    Option<Cents>,
  pub frequency: Option<Frequency>,
  pub active:    Option<bool>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn next_after_advances_by_interval() {
    let from = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();

    assert_eq!(
      Frequency::Weekly.next_after(from),
      Utc.with_ymd_and_hms(2026, 1, 22, 12, 0, 0).unwrap()
    );
    assert_eq!(
      Frequency::Monthly.next_after(from),
      Utc.with_ymd_and_hms(2026, 2, 15, 12, 0, 0).unwrap()
    );
    assert_eq!(
      Frequency::Quarterly.next_after(from),
      Utc.with_ymd_and_hms(2026, 4, 15, 12, 0, 0).unwrap()
    );
    assert_eq!(
      Frequency::Yearly.next_after(from),
      Utc.with_ymd_and_hms(2027, 1, 15, 12, 0, 0).unwrap()
    );
  }

  #[test]
  fn monthly_clamps_to_end_of_month() {
    let from = Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap();
    let next = Frequency::Monthly.next_after(from);
    assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
  }
}
