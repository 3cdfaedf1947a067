//! Integration tests for `SqliteStore` against an in-memory database.

use bursary_core::{
  Error as CoreError,
  admin::UserRole,
  donation::{DonationStatus, DonationType, NewDonation, PaymentMethod},
  donor::{CommunityRank, DonorProfileUpdate, NewDonor},
  query::{DonationQuery, StudentQuery, StudentSort},
  recurring::{Frequency, NewRecurringDonation, RecurringUpdate},
  ledger,
  registry::{FundedStatus, NewRegistryItem, RegistryItemUpdate},
  store::{Credential, PlatformStore},
  student::{NewStudent, StudentProfileUpdate, Urgency},
  verification::{NewVerification, School, VerificationStatus},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_donor(name: &str) -> NewDonor {
  NewDonor {
    name:  name.to_owned(),
    email: format!("{}@example.com", name.to_lowercase()),
  }
}

fn new_student(name: &str, goal: i64) -> NewStudent {
  NewStudent {
    name:            name.to_owned(),
    email:           format!("{}@school.edu", name.to_lowercase()),
    school:          "State University".into(),
    major:           "Computer Science".into(),
    location:        "Springfield".into(),
    graduation_year: 2027,
    bio:             "Working toward a degree.".into(),
    urgency:         Urgency::Medium,
    funding_goal:    goal,
  }
}

async fn verified_student(s: &SqliteStore, name: &str, goal: i64) -> Uuid {
  let student = s.add_student(new_student(name, goal)).await.unwrap();
  let school = School {
    school_id: Uuid::new_v4(),
    name:      format!("{name} High"),
    city:      "Springfield".into(),
    state:     "IL".into(),
  };
  s.seed_schools(vec![school.clone()]).await.unwrap();
  let v = s
    .submit_verification(NewVerification {
      student_id:   student.student_id,
      school_id:    school.school_id,
      document_url: "https://docs.example.com/proof.pdf".into(),
    })
    .await
    .unwrap();
  s.approve_verification(v.verification_id, Uuid::new_v4())
    .await
    .unwrap();
  student.student_id
}

// ─── Donors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_donor() {
  let s = store().await;

  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  assert_eq!(donor.total_donated, 0);
  assert!(donor.is_active);

  let fetched = s.get_donor(donor.donor_id).await.unwrap().unwrap();
  assert_eq!(fetched.donor_id, donor.donor_id);
  assert_eq!(fetched.email, "alice@example.com");
}

#[tokio::test]
async fn get_donor_missing_returns_none() {
  let s = store().await;
  assert!(s.get_donor(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_donor_profile_partial() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();

  let updated = s
    .update_donor_profile(donor.donor_id, DonorProfileUpdate {
      name: Some("Alice B.".into()),
      email: None,
    })
    .await
    .unwrap();

  assert_eq!(updated.name, "Alice B.");
  assert_eq!(updated.email, "alice@example.com");
}

// ─── Students and discovery ──────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_student() {
  let s = store().await;
  let student = s.add_student(new_student("Bea", 500_000)).await.unwrap();

  assert_eq!(student.amount_raised, 0);
  assert!(!student.verified);

  let fetched = s.get_student(student.student_id).await.unwrap().unwrap();
  assert_eq!(fetched.funding_goal, 500_000);
}

#[tokio::test]
async fn search_hides_unverified_students() {
  let s = store().await;
  s.add_student(new_student("Hidden", 100_000)).await.unwrap();
  verified_student(&s, "Visible", 100_000).await;

  let page = s.search_students(&StudentQuery::default()).await.unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.students[0].student.name, "Visible");

  let admin_view = s
    .search_students(&StudentQuery {
      include_unverified: true,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(admin_view.total, 2);
}

#[tokio::test]
async fn search_text_matches_bio_and_name() {
  let s = store().await;
  let id = verified_student(&s, "Cora", 100_000).await;
  verified_student(&s, "Dana", 100_000).await;

  let page = s
    .search_students(&StudentQuery {
      search: Some("Cora".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.students[0].student.student_id, id);
}

#[tokio::test]
async fn search_goal_range_and_sort() {
  let s = store().await;
  verified_student(&s, "Small", 100_000).await;
  verified_student(&s, "Large", 900_000).await;

  let page = s
    .search_students(&StudentQuery {
      min_goal: Some(500_000),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.total, 1);
  assert_eq!(page.students[0].student.name, "Large");

  let sorted = s
    .search_students(&StudentQuery {
      sort: StudentSort::GoalAsc,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(sorted.students[0].student.name, "Small");
}

#[tokio::test]
async fn search_facets_ignore_filters() {
  let s = store().await;
  verified_student(&s, "Eve", 100_000).await;
  verified_student(&s, "Finn", 100_000).await;

  let page = s
    .search_students(&StudentQuery {
      search: Some("Eve".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  // Both students share one school string; the facet list is unaffected by
  // the text filter.
  assert_eq!(page.facets.schools, vec!["State University".to_string()]);
}

#[tokio::test]
async fn private_profile_leaves_discovery() {
  let s = store().await;
  let id = verified_student(&s, "Gia", 100_000).await;

  s.update_student_profile(id, StudentProfileUpdate {
    public_profile: Some(false),
    ..Default::default()
  })
  .await
  .unwrap();

  let page = s.search_students(&StudentQuery::default()).await.unwrap();
  assert_eq!(page.total, 0);
}

// ─── Bookmarks ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn bookmark_roundtrip() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 100_000).await;

  s.add_bookmark(donor.donor_id, student_id).await.unwrap();
  let list = s.list_bookmarks(donor.donor_id).await.unwrap();
  assert_eq!(list.len(), 1);
  assert_eq!(list[0].student.student_id, student_id);

  s.remove_bookmark(donor.donor_id, student_id).await.unwrap();
  assert!(s.list_bookmarks(donor.donor_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_bookmark_conflicts() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 100_000).await;

  s.add_bookmark(donor.donor_id, student_id).await.unwrap();
  let err = s.add_bookmark(donor.donor_id, student_id).await.unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::Conflict(_))));
}

#[tokio::test]
async fn remove_missing_bookmark_fails() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let err = s
    .remove_bookmark(donor.donor_id, Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::BookmarkNotFound(_))));
}

// ─── Ledger: completed donations ─────────────────────────────────────────────

#[tokio::test]
async fn completed_donation_moves_balances() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let donation = s
    .record_completed_donation(NewDonation::general(
      student_id,
      Some(donor.donor_id),
      25_000,
    ))
    .await
    .unwrap();

  assert_eq!(donation.status, DonationStatus::Completed);
  assert!(donation.processed_at.is_some());
  assert!(donation.receipt_number.starts_with("BRS-"));

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 25_000);
  assert_eq!(student.total_donations, 1);

  let donor = s.get_donor(donor.donor_id).await.unwrap().unwrap();
  assert_eq!(donor.total_donated, 25_000);
  assert_eq!(donor.students_supported, 1);
}

#[tokio::test]
async fn anonymous_donation_has_no_donor() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let donation = s
    .record_completed_donation(NewDonation::general(student_id, None, 10_000))
    .await
    .unwrap();
  assert!(donation.donor_id.is_none());

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 10_000);
}

#[tokio::test]
async fn nonpositive_amount_rejected() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let err = s
    .record_completed_donation(NewDonation::general(student_id, None, 0))
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::AmountInvalid(0))));
}

#[tokio::test]
async fn donation_to_missing_student_fails() {
  let s = store().await;
  let err = s
    .record_completed_donation(NewDonation::general(Uuid::new_v4(), None, 100))
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::StudentNotFound(_))));
}

// ─── Ledger: pending flow ────────────────────────────────────────────────────

#[tokio::test]
async fn pending_donation_moves_nothing_until_completed() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let pending = s
    .record_pending_donation(NewDonation {
      payment_method: PaymentMethod::Zelle,
      ..NewDonation::general(student_id, Some(donor.donor_id), 40_000)
    })
    .await
    .unwrap();
  assert_eq!(pending.status, DonationStatus::Pending);

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 0);

  let completed = s.complete_donation(pending.donation_id).await.unwrap();
  assert_eq!(completed.status, DonationStatus::Completed);

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 40_000);
}

#[tokio::test]
async fn completing_twice_is_invalid_state() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let pending = s
    .record_pending_donation(NewDonation::general(student_id, None, 5_000))
    .await
    .unwrap();
  s.complete_donation(pending.donation_id).await.unwrap();

  let err = s.complete_donation(pending.donation_id).await.unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::InvalidState(_))));

  // The double application must not have landed.
  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 5_000);
}

// ─── Ledger: refunds ─────────────────────────────────────────────────────────

#[tokio::test]
async fn full_refund_reverses_balances() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let admin_id = Uuid::new_v4();

  let donation = s
    .record_completed_donation(NewDonation::general(
      student_id,
      Some(donor.donor_id),
      30_000,
    ))
    .await
    .unwrap();

  let refunded = s
    .refund_donation(donation.donation_id, 30_000, "duplicate charge".into(), admin_id)
    .await
    .unwrap();
  assert_eq!(refunded.status, DonationStatus::Refunded);
  assert_eq!(refunded.refund_amount, Some(30_000));

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 0);
  let donor = s.get_donor(donor.donor_id).await.unwrap().unwrap();
  assert_eq!(donor.total_donated, 0);
}

#[tokio::test]
async fn partial_refund_leaves_remainder() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let donation = s
    .record_completed_donation(NewDonation::general(
      student_id,
      Some(donor.donor_id),
      30_000,
    ))
    .await
    .unwrap();
  s.refund_donation(donation.donation_id, 10_000, "partial".into(), Uuid::new_v4())
    .await
    .unwrap();

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 20_000);

  let report = s.reconcile_student(student_id).await.unwrap();
  assert_eq!(report.drift, 0);
}

#[tokio::test]
async fn refunding_twice_fails() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let donation = s
    .record_completed_donation(NewDonation::general(student_id, None, 20_000))
    .await
    .unwrap();

  s.refund_donation(donation.donation_id, 20_000, "first".into(), Uuid::new_v4())
    .await
    .unwrap();
  let err = s
    .refund_donation(donation.donation_id, 20_000, "second".into(), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::InvalidState(_))));

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 0);
}

#[tokio::test]
async fn refund_exceeding_amount_fails() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let donation = s
    .record_completed_donation(NewDonation::general(student_id, None, 20_000))
    .await
    .unwrap();

  let err = s
    .refund_donation(donation.donation_id, 25_000, "too much".into(), Uuid::new_v4())
    .await
    .unwrap_err();
  assert!(matches!(
    err.as_domain(),
    Some(CoreError::AmountExceeds { refund: 25_000, amount: 20_000 })
  ));
}

#[tokio::test]
async fn refund_writes_audit_action() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let admin_id = Uuid::new_v4();
  let donation = s
    .record_completed_donation(NewDonation::general(student_id, None, 20_000))
    .await
    .unwrap();

  s.refund_donation(donation.donation_id, 20_000, "fraud".into(), admin_id)
    .await
    .unwrap();

  let actions = s.list_admin_actions(donation.donation_id).await.unwrap();
  assert_eq!(actions.len(), 1);
  assert_eq!(actions[0].action, "refund_donation");
  assert_eq!(actions[0].admin_id, admin_id);
  assert_eq!(actions[0].detail.as_deref(), Some("fraud"));
}

// ─── Registry sponsorship ────────────────────────────────────────────────────

#[tokio::test]
async fn sponsoring_updates_funded_status() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let item = s
    .add_registry_item(NewRegistryItem {
      student_id,
      name: "Laptop".into(),
      description: "For coursework".into(),
      price: 100_000,
    })
    .await
    .unwrap();
  assert_eq!(item.funded_status, FundedStatus::Needed);

  let sponsor = |amount| {
    s.record_completed_donation(NewDonation {
      donation_type: DonationType::Item,
      target_registry_id: Some(item.item_id),
      ..NewDonation::general(student_id, Some(donor.donor_id), amount)
    })
  };

  sponsor(40_000).await.unwrap();
  let item_now = s.get_registry_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(item_now.amount_funded, 40_000);
  assert_eq!(item_now.funded_status, FundedStatus::Partial);

  sponsor(60_000).await.unwrap();
  let item_now = s.get_registry_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(item_now.funded_status, FundedStatus::Funded);
}

#[tokio::test]
async fn overfunding_sponsorship_conflicts_and_rolls_back() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let item = s
    .add_registry_item(NewRegistryItem {
      student_id,
      name: "Books".into(),
      description: String::new(),
      price: 50_000,
    })
    .await
    .unwrap();

  let err = s
    .record_completed_donation(NewDonation {
      donation_type: DonationType::Item,
      target_registry_id: Some(item.item_id),
      ..NewDonation::general(student_id, None, 60_000)
    })
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::Conflict(_))));

  // The whole transaction rolled back: no donation row, no balance change.
  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 0);
  assert_eq!(student.total_donations, 0);
}

#[tokio::test]
async fn sponsoring_funded_item_is_closed() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let item = s
    .add_registry_item(NewRegistryItem {
      student_id,
      name: "Calculator".into(),
      description: String::new(),
      price: 10_000,
    })
    .await
    .unwrap();

  s.record_completed_donation(NewDonation {
    donation_type: DonationType::Item,
    target_registry_id: Some(item.item_id),
    ..NewDonation::general(student_id, None, 10_000)
  })
  .await
  .unwrap();

  let err = s
    .record_completed_donation(NewDonation {
      donation_type: DonationType::Item,
      target_registry_id: Some(item.item_id),
      ..NewDonation::general(student_id, None, 1_000)
    })
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::RegistryClosed(_))));
}

#[tokio::test]
async fn registry_item_update_respects_funding() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let item = s
    .add_registry_item(NewRegistryItem {
      student_id,
      name: "Tablet".into(),
      description: String::new(),
      price: 50_000,
    })
    .await
    .unwrap();

  s.record_completed_donation(NewDonation {
    donation_type: DonationType::Item,
    target_registry_id: Some(item.item_id),
    ..NewDonation::general(student_id, None, 30_000)
  })
  .await
  .unwrap();

  // Raising the price reopens nothing, lowering to the funded amount closes.
  let updated = s
    .update_registry_item(item.item_id, student_id, RegistryItemUpdate {
      price: Some(30_000),
      ..RegistryItemUpdate::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.funded_status, FundedStatus::Funded);

  // Lowering below the funded amount conflicts.
  let err = s
    .update_registry_item(item.item_id, student_id, RegistryItemUpdate {
      price: Some(20_000),
      ..RegistryItemUpdate::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::Conflict(_))));

  // Another student's id does not reach the item.
  let err = s
    .update_registry_item(item.item_id, Uuid::new_v4(), RegistryItemUpdate {
      name: Some("Stolen".into()),
      ..RegistryItemUpdate::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err.as_domain(),
    Some(CoreError::RegistryItemNotFound(_))
  ));
}

#[tokio::test]
async fn funded_registry_item_cannot_be_removed() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;
  let item = s
    .add_registry_item(NewRegistryItem {
      student_id,
      name: "Monitor".into(),
      description: String::new(),
      price: 40_000,
    })
    .await
    .unwrap();

  s.record_completed_donation(NewDonation {
    donation_type: DonationType::Item,
    target_registry_id: Some(item.item_id),
    ..NewDonation::general(student_id, None, 5_000)
  })
  .await
  .unwrap();

  let err = s
    .remove_registry_item(item.item_id, student_id)
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::Conflict(_))));

  let unfunded = s
    .add_registry_item(NewRegistryItem {
      student_id,
      name: "Desk".into(),
      description: String::new(),
      price: 15_000,
    })
    .await
    .unwrap();
  s.remove_registry_item(unfunded.item_id, student_id)
    .await
    .unwrap();
  assert!(
    s.get_registry_item(unfunded.item_id)
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn sponsor_then_refund_leaves_registry_untouched() {
  // Goal $1000, item $200, sponsor $50, refund $50.
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 100_000).await;
  let item = s
    .add_registry_item(NewRegistryItem {
      student_id,
      name: "Textbooks".into(),
      description: String::new(),
      price: 20_000,
    })
    .await
    .unwrap();

  let donation = s
    .record_completed_donation(NewDonation {
      donation_type: DonationType::Item,
      target_registry_id: Some(item.item_id),
      ..NewDonation::general(student_id, Some(donor.donor_id), 5_000)
    })
    .await
    .unwrap();

  let item_now = s.get_registry_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(item_now.funded_status, FundedStatus::Partial);
  assert_eq!(item_now.amount_funded, 5_000);

  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 5_000);
  assert_eq!(
    ledger::progress_percentage(student.amount_raised, student.funding_goal),
    5
  );

  s.refund_donation(
    donation.donation_id,
    5_000,
    "changed their mind".into(),
    Uuid::new_v4(),
  )
  .await
  .unwrap();

  // Student balance reverses; the item keeps its funding.
  let student = s.get_student(student_id).await.unwrap().unwrap();
  assert_eq!(student.amount_raised, 0);
  let item_now = s.get_registry_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(item_now.amount_funded, 5_000);
}

// ─── History, export, analytics ──────────────────────────────────────────────

#[tokio::test]
async fn donation_history_filters_and_summary() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let other = s.add_donor(new_donor("Zed")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  s.record_completed_donation(NewDonation::general(
    student_id,
    Some(donor.donor_id),
    10_000,
  ))
  .await
  .unwrap();
  s.record_completed_donation(NewDonation::general(
    student_id,
    Some(donor.donor_id),
    20_000,
  ))
  .await
  .unwrap();
  s.record_completed_donation(NewDonation::general(
    student_id,
    Some(other.donor_id),
    99_000,
  ))
  .await
  .unwrap();

  let page = s
    .list_donations(&DonationQuery {
      donor_id: Some(donor.donor_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.total, 2);
  assert_eq!(page.summary.lifetime_total, 30_000);
  assert_eq!(page.summary.donation_count, 2);
  assert_eq!(page.donations[0].student_name, "Bea");
}

#[tokio::test]
async fn donation_history_status_filter() {
  let s = store().await;
  let student_id = verified_student(&s, "Bea", 500_000).await;

  s.record_completed_donation(NewDonation::general(student_id, None, 10_000))
    .await
    .unwrap();
  s.record_pending_donation(NewDonation::general(student_id, None, 20_000))
    .await
    .unwrap();

  let pending = s
    .list_donations(&DonationQuery {
      status: Some(DonationStatus::Pending),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pending.total, 1);
  assert_eq!(pending.donations[0].donation.amount, 20_000);
}

#[tokio::test]
async fn export_contains_only_completed_rows() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let kept = s
    .record_completed_donation(NewDonation::general(
      student_id,
      Some(donor.donor_id),
      10_000,
    ))
    .await
    .unwrap();
  s.record_pending_donation(NewDonation::general(
    student_id,
    Some(donor.donor_id),
    20_000,
  ))
  .await
  .unwrap();

  let rows = s.export_donations(donor.donor_id, None, None).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].amount, 10_000);
  assert_eq!(rows[0].student, "Bea");
  assert_eq!(rows[0].receipt_number, kept.receipt_number);
  assert_eq!(rows[0].receipt_url, format!("/receipts/{}", kept.receipt_number));
}

#[tokio::test]
async fn analytics_aggregates_by_method_and_type() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  s.record_completed_donation(NewDonation::general(
    student_id,
    Some(donor.donor_id),
    10_000,
  ))
  .await
  .unwrap();
  s.record_completed_donation(NewDonation {
    payment_method: PaymentMethod::Zelle,
    ..NewDonation::general(student_id, Some(donor.donor_id), 30_000)
  })
  .await
  .unwrap();

  let analytics = s.donation_analytics(None, None).await.unwrap();
  assert_eq!(analytics.total_volume, 40_000);
  assert_eq!(analytics.donation_count, 2);
  assert_eq!(analytics.by_payment_method.len(), 2);
  assert_eq!(analytics.daily.len(), 1);
  assert_eq!(analytics.top_donors.len(), 1);
  assert_eq!(analytics.top_donors[0].total, 40_000);
  assert_eq!(analytics.top_students[0].raised, 40_000);
}

// ─── Donor dashboard ─────────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_reflects_ledger() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let a = verified_student(&s, "Bea", 500_000).await;
  let b = verified_student(&s, "Cora", 500_000).await;

  s.record_completed_donation(NewDonation::general(a, Some(donor.donor_id), 10_000))
    .await
    .unwrap();
  s.record_completed_donation(NewDonation::general(b, Some(donor.donor_id), 15_000))
    .await
    .unwrap();
  s.add_recurring_donation(NewRecurringDonation {
    donor_id:   donor.donor_id,
    student_id: a,
    amount:     5_000,
    frequency:  Frequency::Monthly,
  })
  .await
  .unwrap();

  let dash = s.donor_dashboard(donor.donor_id).await.unwrap();
  assert_eq!(dash.total_donated, 25_000);
  assert_eq!(dash.students_supported, 2);
  assert_eq!(dash.donation_count, 2);
  assert_eq!(dash.active_recurring, 1);
  assert_eq!(dash.this_month, 25_000);
  // Sole donor on the platform: everyone below them is 0% of donors.
  assert_eq!(dash.community_rank, CommunityRank::NewDonor);
}

// ─── Recurring donations ─────────────────────────────────────────────────────

#[tokio::test]
async fn recurring_roundtrip_and_cancel() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let plan = s
    .add_recurring_donation(NewRecurringDonation {
      donor_id:   donor.donor_id,
      student_id,
      amount:     5_000,
      frequency:  Frequency::Monthly,
    })
    .await
    .unwrap();
  assert!(plan.active);
  assert!(plan.next_payment_date > plan.created_at);

  let cancelled = s
    .update_recurring_donation(plan.recurring_id, donor.donor_id, RecurringUpdate {
      active: Some(false),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(!cancelled.active);
  assert!(cancelled.cancelled_at.is_some());

  let list = s.list_recurring_donations(donor.donor_id).await.unwrap();
  assert_eq!(list.len(), 1);
  assert!(!list[0].active);
}

#[tokio::test]
async fn recurring_update_requires_ownership() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let stranger = s.add_donor(new_donor("Mallory")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let plan = s
    .add_recurring_donation(NewRecurringDonation {
      donor_id:   donor.donor_id,
      student_id,
      amount:     5_000,
      frequency:  Frequency::Weekly,
    })
    .await
    .unwrap();

  let err = s
    .update_recurring_donation(plan.recurring_id, stranger.donor_id, RecurringUpdate {
      amount: Some(1_000),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(
    err.as_domain(),
    Some(CoreError::RecurringDonationNotFound(_))
  ));
}

// ─── Verification workflow ───────────────────────────────────────────────────

#[tokio::test]
async fn approval_flips_student_verified_atomically() {
  let s = store().await;
  let student = s.add_student(new_student("Bea", 100_000)).await.unwrap();
  let school = School {
    school_id: Uuid::new_v4(),
    name:      "Springfield High".into(),
    city:      "Springfield".into(),
    state:     "IL".into(),
  };
  s.seed_schools(vec![school.clone()]).await.unwrap();

  let v = s
    .submit_verification(NewVerification {
      student_id:   student.student_id,
      school_id:    school.school_id,
      document_url: "https://docs.example.com/id.pdf".into(),
    })
    .await
    .unwrap();
  assert_eq!(v.status, VerificationStatus::Pending);

  let approved = s
    .approve_verification(v.verification_id, Uuid::new_v4())
    .await
    .unwrap();
  assert_eq!(approved.status, VerificationStatus::Approved);
  assert!(approved.reviewed_at.is_some());

  let student = s.get_student(student.student_id).await.unwrap().unwrap();
  assert!(student.verified);
}

#[tokio::test]
async fn pending_verification_blocks_resubmission() {
  let s = store().await;
  let student = s.add_student(new_student("Bea", 100_000)).await.unwrap();
  let school = School {
    school_id: Uuid::new_v4(),
    name:      "Springfield High".into(),
    city:      "Springfield".into(),
    state:     "IL".into(),
  };
  s.seed_schools(vec![school.clone()]).await.unwrap();

  let input = NewVerification {
    student_id:   student.student_id,
    school_id:    school.school_id,
    document_url: "https://docs.example.com/id.pdf".into(),
  };
  s.submit_verification(input.clone()).await.unwrap();
  let err = s.submit_verification(input).await.unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::Conflict(_))));
}

#[tokio::test]
async fn rejection_allows_resubmission() {
  let s = store().await;
  let student = s.add_student(new_student("Bea", 100_000)).await.unwrap();
  let school = School {
    school_id: Uuid::new_v4(),
    name:      "Springfield High".into(),
    city:      "Springfield".into(),
    state:     "IL".into(),
  };
  s.seed_schools(vec![school.clone()]).await.unwrap();

  let input = NewVerification {
    student_id:   student.student_id,
    school_id:    school.school_id,
    document_url: "https://docs.example.com/blurry.pdf".into(),
  };
  let v = s.submit_verification(input.clone()).await.unwrap();
  let rejected = s
    .reject_verification(v.verification_id, Uuid::new_v4(), "illegible".into())
    .await
    .unwrap();
  assert_eq!(rejected.status, VerificationStatus::Rejected);
  assert_eq!(rejected.rejection_reason.as_deref(), Some("illegible"));

  let resubmitted = s
    .submit_verification(NewVerification {
      document_url: "https://docs.example.com/clear.pdf".into(),
      ..input
    })
    .await
    .unwrap();
  // Same row, back to pending, reason cleared.
  assert_eq!(resubmitted.verification_id, v.verification_id);
  assert_eq!(resubmitted.status, VerificationStatus::Pending);
  assert!(resubmitted.rejection_reason.is_none());

  let stats = s.verification_stats().await.unwrap();
  assert_eq!(stats.pending, 1);
  assert_eq!(stats.rejected, 0);
}

#[tokio::test]
async fn verification_queue_filters_by_status() {
  let s = store().await;
  let a = s.add_student(new_student("Bea", 100_000)).await.unwrap();
  let b = s.add_student(new_student("Cora", 100_000)).await.unwrap();
  let school = School {
    school_id: Uuid::new_v4(),
    name:      "Springfield High".into(),
    city:      "Springfield".into(),
    state:     "IL".into(),
  };
  s.seed_schools(vec![school.clone()]).await.unwrap();

  let va = s
    .submit_verification(NewVerification {
      student_id:   a.student_id,
      school_id:    school.school_id,
      document_url: "https://docs.example.com/a.pdf".into(),
    })
    .await
    .unwrap();
  s.submit_verification(NewVerification {
    student_id:   b.student_id,
    school_id:    school.school_id,
    document_url: "https://docs.example.com/b.pdf".into(),
  })
  .await
  .unwrap();
  s.approve_verification(va.verification_id, Uuid::new_v4())
    .await
    .unwrap();

  let pending = s
    .list_verifications(Some(VerificationStatus::Pending))
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].student_id, b.student_id);
}

// ─── Platform administration ─────────────────────────────────────────────────

#[tokio::test]
async fn platform_stats_counts() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;
  s.add_student(new_student("Cora", 100_000)).await.unwrap();

  s.record_completed_donation(NewDonation::general(
    student_id,
    Some(donor.donor_id),
    10_000,
  ))
  .await
  .unwrap();

  let stats = s.platform_stats().await.unwrap();
  assert_eq!(stats.total_donors, 1);
  assert_eq!(stats.total_students, 2);
  assert_eq!(stats.verified_students, 1);
  assert_eq!(stats.total_raised, 10_000);
  assert_eq!(stats.total_donations, 1);
}

#[tokio::test]
async fn user_listing_and_deactivation() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  s.add_student(new_student("Bea", 100_000)).await.unwrap();

  let users = s.list_users().await.unwrap();
  assert_eq!(users.len(), 2);

  let updated = s.set_user_status(donor.donor_id, false).await.unwrap();
  assert!(!updated.is_active);
  assert_eq!(updated.role, UserRole::Donor);

  let err = s.set_user_status(Uuid::new_v4(), false).await.unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::UserNotFound(_))));
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn reconciliation_is_clean_after_mixed_activity() {
  let s = store().await;
  let donor = s.add_donor(new_donor("Alice")).await.unwrap();
  let student_id = verified_student(&s, "Bea", 500_000).await;

  let d1 = s
    .record_completed_donation(NewDonation::general(
      student_id,
      Some(donor.donor_id),
      50_000,
    ))
    .await
    .unwrap();
  s.record_completed_donation(NewDonation::general(
    student_id,
    Some(donor.donor_id),
    25_000,
  ))
  .await
  .unwrap();
  s.refund_donation(d1.donation_id, 20_000, "partial".into(), Uuid::new_v4())
    .await
    .unwrap();

  let student_report = s.reconcile_student(student_id).await.unwrap();
  assert_eq!(student_report.stored, 55_000);
  assert_eq!(student_report.recomputed, 55_000);
  assert!(student_report.is_consistent());

  let donor_report = s.reconcile_donor(donor.donor_id).await.unwrap();
  assert_eq!(donor_report.drift, 0);
}

// ─── Credentials ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn credential_roundtrip_and_duplicate_conflict() {
  let s = store().await;
  let user_id = Uuid::new_v4();

  s.add_credential(Credential {
    user_id,
    email: "alice@example.com".into(),
    password_hash: "$argon2id$stub".into(),
    role: UserRole::Donor,
  })
  .await
  .unwrap();

  let found = s
    .get_credential("alice@example.com", UserRole::Donor)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.user_id, user_id);

  // Same email under a different role is a separate account.
  assert!(
    s.get_credential("alice@example.com", UserRole::Student)
      .await
      .unwrap()
      .is_none()
  );

  let err = s
    .add_credential(Credential {
      user_id: Uuid::new_v4(),
      email: "alice@example.com".into(),
      password_hash: "$argon2id$other".into(),
      role: UserRole::Donor,
    })
    .await
    .unwrap_err();
  assert!(matches!(err.as_domain(), Some(CoreError::Conflict(_))));
}
