//! Monetary amounts as integer minor units.
//!
//! All money in the platform is stored and computed in cents (`i64`), which
//! maps directly onto a SQLite INTEGER column and avoids floating-point
//! bookkeeping. Dollar rendering exists only at the presentation edge
//! (CSV export, receipts).

/// An amount of money in cents. Negative values never appear in persisted
/// balances; they can occur transiently in reconciliation deltas.
pub type Cents = i64;

/// Render cents as a plain dollar string, e.g. `1050` → `"10.50"`.
pub fn format_dollars(amount: Cents) -> String {
  let sign = if amount < 0 { "-" } else { "" };
  let abs = amount.unsigned_abs();
  format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_whole_and_fractional_dollars() {
    assert_eq!(format_dollars(0), "0.00");
    assert_eq!(format_dollars(5), "0.05");
    assert_eq!(format_dollars(1050), "10.50");
    assert_eq!(format_dollars(123_456), "1234.56");
  }

  #[test]
  fn formats_negative_amounts() {
    assert_eq!(format_dollars(-250), "-2.50");
  }
}
