//! The `PlatformStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g.
//! `bursary-store-sqlite`). The HTTP layer (`bursary-api`) depends on this
//! abstraction, not on any concrete backend.
//!
//! Ledger contract: every operation that moves money touches the donation
//! row and the affected denormalized balances inside one atomic unit. A
//! backend must make partial application impossible — a crash mid-operation
//! may not leave `amount_raised` incremented without the donation marked
//! completed, or decremented without the refund recorded.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  admin::{
    AdminAction, DonationAnalytics, PlatformStats, ReconcileReport,
    UserRecord, UserRole,
  },
  donation::{Donation, NewDonation},
  donor::{Donor, DonorDashboard, DonorProfileUpdate, NewDonor},
  export::ExportRow,
  money::Cents,
  query::{
    DonationPage, DonationQuery, StudentPage, StudentQuery,
    StudentWithProgress,
  },
  recurring::{NewRecurringDonation, RecurringDonation, RecurringUpdate},
  registry::{NewRegistryItem, RegistryItem, RegistryItemUpdate},
  student::{NewStudent, Student, StudentProfileUpdate},
  verification::{
    NewVerification, School, SchoolVerification, VerificationStats,
    VerificationStatus,
  },
};

// ─── Credentials ─────────────────────────────────────────────────────────────

/// A login credential row. Password hashing and token issuance live in the
/// HTTP layer; the store only persists the resulting PHC string.
#[derive(Debug, Clone)]
pub struct Credential {
  pub user_id:       Uuid,
  pub email:         String,
  pub password_hash: String,
  pub role:          UserRole,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Bursary storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PlatformStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Donors ────────────────────────────────────────────────────────────

  fn add_donor(
    &self,
    input: NewDonor,
  ) -> impl Future<Output = Result<Donor, Self::Error>> + Send + '_;

  fn get_donor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Donor>, Self::Error>> + Send + '_;

  fn update_donor_profile(
    &self,
    id: Uuid,
    update: DonorProfileUpdate,
  ) -> impl Future<Output = Result<Donor, Self::Error>> + Send + '_;

  /// Compute the donor dashboard read model. All values are derived from
  /// the donation table at call time, including the community-rank
  /// percentile over every donor's lifetime total.
  fn donor_dashboard(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<DonorDashboard, Self::Error>> + Send + '_;

  // ── Students ──────────────────────────────────────────────────────────

  fn add_student(
    &self,
    input: NewStudent,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  fn get_student(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Student>, Self::Error>> + Send + '_;

  fn update_student_profile(
    &self,
    id: Uuid,
    update: StudentProfileUpdate,
  ) -> impl Future<Output = Result<Student, Self::Error>> + Send + '_;

  /// Filtered, sorted, paginated discovery over students, with facet lists.
  /// Donor-facing queries see only `is_active && public_profile &&
  /// verified` students; see [`StudentQuery::include_unverified`].
  fn search_students<'a>(
    &'a self,
    query: &'a StudentQuery,
  ) -> impl Future<Output = Result<StudentPage, Self::Error>> + Send + 'a;

  // ── Bookmarks ─────────────────────────────────────────────────────────

  /// Bookmark a student. A duplicate bookmark is a conflict.
  fn add_bookmark(
    &self,
    donor_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn list_bookmarks(
    &self,
    donor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<StudentWithProgress>, Self::Error>> + Send + '_;

  fn remove_bookmark(
    &self,
    donor_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Registry items ────────────────────────────────────────────────────

  fn add_registry_item(
    &self,
    input: NewRegistryItem,
  ) -> impl Future<Output = Result<RegistryItem, Self::Error>> + Send + '_;

  fn get_registry_item(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<RegistryItem>, Self::Error>> + Send + '_;

  fn list_registry_items(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RegistryItem>, Self::Error>> + Send + '_;

  /// Apply a patch to an item owned by `student_id`. Lowering the price
  /// below the amount already funded is a conflict; the funded status is
  /// recomputed against the new price.
  fn update_registry_item(
    &self,
    item_id: Uuid,
    student_id: Uuid,
    update: RegistryItemUpdate,
  ) -> impl Future<Output = Result<RegistryItem, Self::Error>> + Send + '_;

  /// Remove an item owned by `student_id`. An item that has received any
  /// funding cannot be removed.
  fn remove_registry_item(
    &self,
    item_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Ledger operations ─────────────────────────────────────────────────

  /// Record a donation that completes immediately: insert the completed
  /// donation row, increment the student's `amount_raised` and the donor's
  /// running totals, and — when `target_registry_id` is set — apply the
  /// guarded registry funding write, all in one transaction.
  ///
  /// The registry write is conditional: it only lands if the item is not
  /// already funded and the new amount stays within the price. A failed
  /// guard aborts the whole transaction with a conflict, which closes the
  /// two-concurrent-sponsors race.
  fn record_completed_donation(
    &self,
    input: NewDonation,
  ) -> impl Future<Output = Result<Donation, Self::Error>> + Send + '_;

  /// Record a donation awaiting out-of-band confirmation (e.g. a Zelle
  /// transfer). No balance moves until [`Self::complete_donation`].
  fn record_pending_donation(
    &self,
    input: NewDonation,
  ) -> impl Future<Output = Result<Donation, Self::Error>> + Send + '_;

  /// Transition a pending donation to completed and apply the same balance
  /// updates as [`Self::record_completed_donation`], atomically.
  fn complete_donation(
    &self,
    donation_id: Uuid,
  ) -> impl Future<Output = Result<Donation, Self::Error>> + Send + '_;

  /// Refund (part of) a completed donation: decrement the student's
  /// `amount_raised`, adjust the donor's totals, mark the donation
  /// refunded, and write the audit row — one transaction. Refunding a
  /// donation that is not completed is an invalid-state error, so a second
  /// refund of the same donation always fails.
  fn refund_donation(
    &self,
    donation_id: Uuid,
    refund_amount: Cents,
    reason: String,
    admin_id: Uuid,
  ) -> impl Future<Output = Result<Donation, Self::Error>> + Send + '_;

  // ── Donation history / export / analytics ─────────────────────────────

  fn list_donations<'a>(
    &'a self,
    query: &'a DonationQuery,
  ) -> impl Future<Output = Result<DonationPage, Self::Error>> + Send + 'a;

  /// Completed donations for one donor in a date range, shaped for export.
  fn export_donations(
    &self,
    donor_id: Uuid,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Vec<ExportRow>, Self::Error>> + Send + '_;

  fn donation_analytics(
    &self,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<DonationAnalytics, Self::Error>> + Send + '_;

  // ── Recurring donations ───────────────────────────────────────────────

  fn add_recurring_donation(
    &self,
    input: NewRecurringDonation,
  ) -> impl Future<Output = Result<RecurringDonation, Self::Error>> + Send + '_;

  fn list_recurring_donations(
    &self,
    donor_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RecurringDonation>, Self::Error>> + Send + '_;

  /// Apply a patch to a recurring donation owned by `donor_id`.
  fn update_recurring_donation(
    &self,
    id: Uuid,
    donor_id: Uuid,
    update: RecurringUpdate,
  ) -> impl Future<Output = Result<RecurringDonation, Self::Error>> + Send + '_;

  // ── School verification ───────────────────────────────────────────────

  fn list_schools(
    &self,
  ) -> impl Future<Output = Result<Vec<School>, Self::Error>> + Send + '_;

  /// Insert reference schools, skipping names already present.
  fn seed_schools(
    &self,
    schools: Vec<School>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Submit (or resubmit) an enrollment proof. At most one verification row
  /// exists per student: a rejected row is overwritten back to pending with
  /// its rejection reason cleared; a pending or approved row conflicts.
  fn submit_verification(
    &self,
    input: NewVerification,
  ) -> impl Future<Output = Result<SchoolVerification, Self::Error>> + Send + '_;

  fn list_verifications(
    &self,
    status: Option<VerificationStatus>,
  ) -> impl Future<Output = Result<Vec<SchoolVerification>, Self::Error>> + Send + '_;

  fn verification_stats(
    &self,
  ) -> impl Future<Output = Result<VerificationStats, Self::Error>> + Send + '_;

  /// Approve a pending verification and set the student's `verified` flag
  /// in the same transaction — partial application is impossible.
  fn approve_verification(
    &self,
    verification_id: Uuid,
    admin_id: Uuid,
  ) -> impl Future<Output = Result<SchoolVerification, Self::Error>> + Send + '_;

  fn reject_verification(
    &self,
    verification_id: Uuid,
    admin_id: Uuid,
    reason: String,
  ) -> impl Future<Output = Result<SchoolVerification, Self::Error>> + Send + '_;

  // ── Platform administration ───────────────────────────────────────────

  fn platform_stats(
    &self,
  ) -> impl Future<Output = Result<PlatformStats, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<UserRecord>, Self::Error>> + Send + '_;

  fn set_user_status(
    &self,
    user_id: Uuid,
    is_active: bool,
  ) -> impl Future<Output = Result<UserRecord, Self::Error>> + Send + '_;

  fn list_admin_actions(
    &self,
    target_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AdminAction>, Self::Error>> + Send + '_;

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Recompute a student's `amount_raised` from the donation table and
  /// report drift against the stored counter.
  fn reconcile_student(
    &self,
    student_id: Uuid,
  ) -> impl Future<Output = Result<ReconcileReport, Self::Error>> + Send + '_;

  /// Recompute a donor's `total_donated` likewise.
  fn reconcile_donor(
    &self,
    donor_id: Uuid,
  ) -> impl Future<Output = Result<ReconcileReport, Self::Error>> + Send + '_;

  // ── Credentials ───────────────────────────────────────────────────────

  /// Store a login credential; a duplicate email is a conflict.
  fn add_credential(
    &self,
    credential: Credential,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_credential<'a>(
    &'a self,
    email: &'a str,
    role: UserRole,
  ) -> impl Future<Output = Result<Option<Credential>, Self::Error>> + Send + 'a;
}
