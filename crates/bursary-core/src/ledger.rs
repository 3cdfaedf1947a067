//! Funding-ledger arithmetic — the pure half of the ledger.
//!
//! These functions decide what the mutating store operations are allowed to
//! do; the store supplies the transaction, this module supplies the rules.
//! Nothing here performs I/O.

use crate::{
  donation::{Donation, DonationStatus},
  donor::CommunityRank,
  error::{Error, Result},
  money::Cents,
  registry::FundedStatus,
};

// ─── Progress ────────────────────────────────────────────────────────────────

/// Percentage of a student's funding goal raised, rounded to the nearest
/// integer. A zero goal yields 0 rather than dividing. Not clamped at 100:
/// a student raising past their goal reads as over 100%.
pub fn progress_percentage(amount_raised: Cents, funding_goal: Cents) -> u32 {
  if funding_goal <= 0 {
    return 0;
  }
  let ratio = amount_raised as f64 / funding_goal as f64;
  (ratio * 100.0).round() as u32
}

// ─── Funded status ───────────────────────────────────────────────────────────

/// Classification of a registry item from its cumulative funding.
/// `Funded` iff `amount_funded >= price`; `Partial` iff anything but not
/// everything has been funded; `Needed` otherwise.
pub fn funded_status(amount_funded: Cents, price: Cents) -> FundedStatus {
  if amount_funded >= price {
    FundedStatus::Funded
  } else if amount_funded > 0 {
    FundedStatus::Partial
  } else {
    FundedStatus::Needed
  }
}

// ─── Donation validation ─────────────────────────────────────────────────────

/// A donation or sponsorship amount must be strictly positive.
pub fn validate_donation_amount(amount: Cents) -> Result<()> {
  if amount <= 0 {
    return Err(Error::AmountInvalid(amount));
  }
  Ok(())
}

/// Check that `refund` is applicable to `donation`.
///
/// Only a `Completed` donation can be refunded (a second refund of the same
/// donation therefore fails, because the first transitioned it to
/// `Refunded`), and the refund may not exceed the original amount.
pub fn check_refund(donation: &Donation, refund: Cents) -> Result<()> {
  if donation.status != DonationStatus::Completed {
    return Err(Error::InvalidState(donation.donation_id));
  }
  validate_donation_amount(refund)?;
  if refund > donation.amount {
    return Err(Error::AmountExceeds { refund, amount: donation.amount });
  }
  Ok(())
}

// ─── Donor summaries ─────────────────────────────────────────────────────────

/// Percentile bucket of `total_donated` among `all_totals` (the lifetime
/// totals of every donor, in any order). Donors who have not yet completed
/// a donation rank as `NewDonor`.
pub fn community_rank(total_donated: Cents, all_totals: &[Cents]) -> CommunityRank {
  if total_donated <= 0 || all_totals.is_empty() {
    return CommunityRank::NewDonor;
  }
  let below = all_totals.iter().filter(|&&t| t < total_donated).count();
  let percentile = below as f64 / all_totals.len() as f64;

  if percentile >= 0.90 {
    CommunityRank::Top10
  } else if percentile >= 0.75 {
    CommunityRank::Top25
  } else if percentile >= 0.50 {
    CommunityRank::Top50
  } else {
    CommunityRank::NewDonor
  }
}

/// Composite engagement score shown on the donor dashboard: one point per
/// dollar donated plus a flat bonus per student supported.
pub fn impact_score(total_donated: Cents, students_supported: i64) -> i64 {
  total_donated / 100 + students_supported * 50
}
