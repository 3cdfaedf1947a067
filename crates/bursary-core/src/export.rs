//! Donation-history export serialization.
//!
//! The CSV column order is fixed and part of the external contract:
//! `Date,Amount,Student,School,Receipt Number,Receipt URL`. Fields
//! containing commas, quotes, or newlines are quoted with `"` doubling.
//! The whole result set is materialised before serialization — callers
//! bound the date range for large histories.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{money, money::Cents};

pub const CSV_HEADER: &str = "Date,Amount,Student,School,Receipt Number,Receipt URL";

/// One exported donation. Only completed donations are exported.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
  pub date:           DateTime<Utc>,
  pub amount:         Cents,
  pub student:        String,
  pub school:         String,
  pub receipt_number: String,
  pub receipt_url:    String,
}

/// Quote a CSV field if it contains a comma, quote, or newline.
fn csv_field(value: &str) -> String {
  if value.contains(',') || value.contains('"') || value.contains('\n') {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_owned()
  }
}

/// Serialise `rows` as a CSV document, header included.
pub fn to_csv(rows: &[ExportRow]) -> String {
  let mut out = String::from(CSV_HEADER);
  out.push('\n');
  for row in rows {
    out.push_str(&csv_field(&row.date.format("%Y-%m-%d").to_string()));
    out.push(',');
    out.push_str(&csv_field(&money::format_dollars(row.amount)));
    out.push(',');
    out.push_str(&csv_field(&row.student));
    out.push(',');
    out.push_str(&csv_field(&row.school));
    out.push(',');
    out.push_str(&csv_field(&row.receipt_number));
    out.push(',');
    out.push_str(&csv_field(&row.receipt_url));
    out.push('\n');
  }
  out
}
