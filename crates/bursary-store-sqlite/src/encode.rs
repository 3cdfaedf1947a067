//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, uuids hyphenated lowercase strings,
//! and enums their strum snake_case discriminants.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use bursary_core::{
  admin::{AdminAction, UserRecord, UserRole},
  donation::Donation,
  donor::Donor,
  query::DonationRecord,
  recurring::RecurringDonation,
  registry::RegistryItem,
  store::Credential,
  student::Student,
  verification::{School, SchoolVerification},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_uuid_opt(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_dt_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

pub fn decode_day(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Decode a strum-backed enum from its snake_case column value.
pub fn decode_enum<T: FromStr>(s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::EnumParse(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `donors` row.
pub struct RawDonor {
  pub donor_id:           String,
  pub name:               String,
  pub email:              String,
  pub total_donated:      i64,
  pub students_supported: i64,
  pub impact_score:       i64,
  pub is_active:          bool,
  pub created_at:         String,
}

impl RawDonor {
  pub fn into_donor(self) -> Result<Donor> {
    Ok(Donor {
      donor_id:           decode_uuid(&self.donor_id)?,
      name:               self.name,
      email:              self.email,
      total_donated:      self.total_donated,
      students_supported: self.students_supported,
      impact_score:       self.impact_score,
      is_active:          self.is_active,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `students` row.
pub struct RawStudent {
  pub student_id:          String,
  pub name:                String,
  pub email:               String,
  pub school:              String,
  pub major:               String,
  pub location:            String,
  pub graduation_year:     i32,
  pub bio:                 String,
  pub urgency:             String,
  pub funding_goal:        i64,
  pub amount_raised:       i64,
  pub total_donations:     i64,
  pub registration_status: String,
  pub verified:            bool,
  pub is_active:           bool,
  pub public_profile:      bool,
  pub last_active:         String,
  pub created_at:          String,
}

/// The column list matching [`RawStudent`] field order; shared by every
/// student SELECT.
pub const STUDENT_COLUMNS: &str = "student_id, name, email, school, major, \
  location, graduation_year, bio, urgency, funding_goal, amount_raised, \
  total_donations, registration_status, verified, is_active, \
  public_profile, last_active, created_at";

impl RawStudent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      student_id:          row.get(0)?,
      name:                row.get(1)?,
      email:               row.get(2)?,
      school:              row.get(3)?,
      major:               row.get(4)?,
      location:            row.get(5)?,
      graduation_year:     row.get(6)?,
      bio:                 row.get(7)?,
      urgency:             row.get(8)?,
      funding_goal:        row.get(9)?,
      amount_raised:       row.get(10)?,
      total_donations:     row.get(11)?,
      registration_status: row.get(12)?,
      verified:            row.get(13)?,
      is_active:           row.get(14)?,
      public_profile:      row.get(15)?,
      last_active:         row.get(16)?,
      created_at:          row.get(17)?,
    })
  }

  pub fn into_student(self) -> Result<Student> {
    Ok(Student {
      student_id:          decode_uuid(&self.student_id)?,
      name:                self.name,
      email:               self.email,
      school:              self.school,
      major:               self.major,
      location:            self.location,
      graduation_year:     self.graduation_year,
      bio:                 self.bio,
      urgency:             decode_enum(&self.urgency)?,
      funding_goal:        self.funding_goal,
      amount_raised:       self.amount_raised,
      total_donations:     self.total_donations,
      registration_status: decode_enum(&self.registration_status)?,
      verified:            self.verified,
      is_active:           self.is_active,
      public_profile:      self.public_profile,
      last_active:         decode_dt(&self.last_active)?,
      created_at:          decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `donations` row.
pub struct RawDonation {
  pub donation_id:        String,
  pub student_id:         String,
  pub donor_id:           Option<String>,
  pub amount:             i64,
  pub net_amount:         i64,
  pub status:             String,
  pub donation_type:      String,
  pub payment_method:     String,
  pub target_registry_id: Option<String>,
  pub recurring_id:       Option<String>,
  pub receipt_number:     String,
  pub created_at:         String,
  pub processed_at:       Option<String>,
  pub refund_amount:      Option<i64>,
  pub refund_reason:      Option<String>,
  pub refunded_at:        Option<String>,
}

/// The column list matching [`RawDonation`] field order.
pub const DONATION_COLUMNS: &str = "donation_id, student_id, donor_id, \
  amount, net_amount, status, donation_type, payment_method, \
  target_registry_id, recurring_id, receipt_number, created_at, \
  processed_at, refund_amount, refund_reason, refunded_at";

impl RawDonation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      donation_id:        row.get(0)?,
      student_id:         row.get(1)?,
      donor_id:           row.get(2)?,
      amount:             row.get(3)?,
      net_amount:         row.get(4)?,
      status:             row.get(5)?,
      donation_type:      row.get(6)?,
      payment_method:     row.get(7)?,
      target_registry_id: row.get(8)?,
      recurring_id:       row.get(9)?,
      receipt_number:     row.get(10)?,
      created_at:         row.get(11)?,
      processed_at:       row.get(12)?,
      refund_amount:      row.get(13)?,
      refund_reason:      row.get(14)?,
      refunded_at:        row.get(15)?,
    })
  }

  pub fn into_donation(self) -> Result<Donation> {
    Ok(Donation {
      donation_id:        decode_uuid(&self.donation_id)?,
      student_id:         decode_uuid(&self.student_id)?,
      donor_id:           decode_uuid_opt(self.donor_id.as_deref())?,
      amount:             self.amount,
      net_amount:         self.net_amount,
      status:             decode_enum(&self.status)?,
      donation_type:      decode_enum(&self.donation_type)?,
      payment_method:     decode_enum(&self.payment_method)?,
      target_registry_id: decode_uuid_opt(self.target_registry_id.as_deref())?,
      recurring_id:       decode_uuid_opt(self.recurring_id.as_deref())?,
      receipt_number:     self.receipt_number,
      created_at:         decode_dt(&self.created_at)?,
      processed_at:       decode_dt_opt(self.processed_at.as_deref())?,
      refund_amount:      self.refund_amount,
      refund_reason:      self.refund_reason,
      refunded_at:        decode_dt_opt(self.refunded_at.as_deref())?,
    })
  }
}

/// A donation row joined with the receiving student's display fields.
pub struct RawDonationRecord {
  pub donation:     RawDonation,
  pub student_name: String,
  pub school:       String,
}

impl RawDonationRecord {
  pub fn into_record(self) -> Result<DonationRecord> {
    Ok(DonationRecord {
      donation:     self.donation.into_donation()?,
      student_name: self.student_name,
      school:       self.school,
    })
  }
}

/// Raw strings read directly from a `registry_items` row.
pub struct RawRegistryItem {
  pub item_id:       String,
  pub student_id:    String,
  pub name:          String,
  pub description:   String,
  pub price:         i64,
  pub amount_funded: i64,
  pub funded_status: String,
  pub created_at:    String,
}

impl RawRegistryItem {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:       row.get(0)?,
      student_id:    row.get(1)?,
      name:          row.get(2)?,
      description:   row.get(3)?,
      price:         row.get(4)?,
      amount_funded: row.get(5)?,
      funded_status: row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  pub fn into_item(self) -> Result<RegistryItem> {
    Ok(RegistryItem {
      item_id:       decode_uuid(&self.item_id)?,
      student_id:    decode_uuid(&self.student_id)?,
      name:          self.name,
      description:   self.description,
      price:         self.price,
      amount_funded: self.amount_funded,
      funded_status: decode_enum(&self.funded_status)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `recurring_donations` row.
pub struct RawRecurring {
  pub recurring_id:      String,
  pub donor_id:          String,
  pub student_id:        String,
  pub amount:            i64,
  pub frequency:         String,
  pub active:            bool,
  pub next_payment_date: String,
  pub created_at:        String,
  pub cancelled_at:      Option<String>,
}

impl RawRecurring {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      recurring_id:      row.get(0)?,
      donor_id:          row.get(1)?,
      student_id:        row.get(2)?,
      amount:            row.get(3)?,
      frequency:         row.get(4)?,
      active:            row.get(5)?,
      next_payment_date: row.get(6)?,
      created_at:        row.get(7)?,
      cancelled_at:      row.get(8)?,
    })
  }

  pub fn into_recurring(self) -> Result<RecurringDonation> {
    Ok(RecurringDonation {
      recurring_id:      decode_uuid(&self.recurring_id)?,
      donor_id:          decode_uuid(&self.donor_id)?,
      student_id:        decode_uuid(&self.student_id)?,
      amount:            self.amount,
      frequency:         decode_enum(&self.frequency)?,
      active:            self.active,
      next_payment_date: decode_dt(&self.next_payment_date)?,
      created_at:        decode_dt(&self.created_at)?,
      cancelled_at:      decode_dt_opt(self.cancelled_at.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `school_verifications` row.
pub struct RawVerification {
  pub verification_id:  String,
  pub student_id:       String,
  pub school_id:        String,
  pub document_url:     String,
  pub status:           String,
  pub rejection_reason: Option<String>,
  pub submitted_at:     String,
  pub reviewed_at:      Option<String>,
}

impl RawVerification {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      verification_id:  row.get(0)?,
      student_id:       row.get(1)?,
      school_id:        row.get(2)?,
      document_url:     row.get(3)?,
      status:           row.get(4)?,
      rejection_reason: row.get(5)?,
      submitted_at:     row.get(6)?,
      reviewed_at:      row.get(7)?,
    })
  }

  pub fn into_verification(self) -> Result<SchoolVerification> {
    Ok(SchoolVerification {
      verification_id:  decode_uuid(&self.verification_id)?,
      student_id:       decode_uuid(&self.student_id)?,
      school_id:        decode_uuid(&self.school_id)?,
      document_url:     self.document_url,
      status:           decode_enum(&self.status)?,
      rejection_reason: self.rejection_reason,
      submitted_at:     decode_dt(&self.submitted_at)?,
      reviewed_at:      decode_dt_opt(self.reviewed_at.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `schools` row.
pub struct RawSchool {
  pub school_id: String,
  pub name:      String,
  pub city:      String,
  pub state:     String,
}

impl RawSchool {
  pub fn into_school(self) -> Result<School> {
    Ok(School {
      school_id: decode_uuid(&self.school_id)?,
      name:      self.name,
      city:      self.city,
      state:     self.state,
    })
  }
}

/// Raw strings read directly from an `admin_actions` row.
pub struct RawAdminAction {
  pub action_id:  String,
  pub admin_id:   String,
  pub action:     String,
  pub target_id:  String,
  pub detail:     Option<String>,
  pub created_at: String,
}

impl RawAdminAction {
  pub fn into_action(self) -> Result<AdminAction> {
    Ok(AdminAction {
      action_id:  decode_uuid(&self.action_id)?,
      admin_id:   decode_uuid(&self.admin_id)?,
      action:     self.action,
      target_id:  decode_uuid(&self.target_id)?,
      detail:     self.detail,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// A user row assembled from either the donors or students table.
pub struct RawUser {
  pub user_id:    String,
  pub name:       String,
  pub email:      String,
  pub role:       String,
  pub is_active:  bool,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<UserRecord> {
    Ok(UserRecord {
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      email:      self.email,
      role:       decode_enum::<UserRole>(&self.role)?,
      is_active:  self.is_active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `credentials` row.
pub struct RawCredential {
  pub user_id:       String,
  pub email:         String,
  pub role:          String,
  pub password_hash: String,
}

impl RawCredential {
  pub fn into_credential(self) -> Result<Credential> {
    Ok(Credential {
      user_id:       decode_uuid(&self.user_id)?,
      email:         self.email,
      role:          decode_enum(&self.role)?,
      password_hash: self.password_hash,
    })
  }
}
