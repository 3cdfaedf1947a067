//! Integration tests: the full router against an in-memory store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use bursary_core::{
  admin::UserRole,
  store::PlatformStore,
  verification::School,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, AuthKeys, api_router, auth::issue_token};
use bursary_store_sqlite::SqliteStore;

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState {
    store: Arc::new(store),
    auth:  Arc::new(AuthKeys::new(b"test-secret".to_vec())),
  }
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value, axum::http::HeaderMap) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder =
      builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let request = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string())),
    None => builder.body(Body::empty()),
  }
  .unwrap();

  let response = api_router(state.clone()).oneshot(request).await.unwrap();
  let status = response.status();
  let headers = response.headers().clone();
  let bytes =
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes)
      .unwrap_or(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
  };
  (status, value, headers)
}

fn admin_token(state: &AppState<SqliteStore>) -> String {
  issue_token(&state.auth, Uuid::new_v4(), UserRole::Admin).unwrap()
}

async fn register_donor(
  state: &AppState<SqliteStore>,
  name: &str,
) -> (String, Uuid) {
  let (status, body, _) = send(
    state,
    "POST",
    "/auth/register/donor",
    None,
    Some(json!({
      "name": name,
      "email": format!("{}@example.com", name.to_lowercase()),
      "password": "hunter2",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let token = body["data"]["token"].as_str().unwrap().to_owned();
  let donor_id = body["data"]["donor"]["donor_id"]
    .as_str()
    .unwrap()
    .parse()
    .unwrap();
  (token, donor_id)
}

async fn register_student(
  state: &AppState<SqliteStore>,
  name: &str,
) -> (String, Uuid) {
  let (status, body, _) = send(
    state,
    "POST",
    "/auth/register/student",
    None,
    Some(json!({
      "name": name,
      "email": format!("{}@school.edu", name.to_lowercase()),
      "password": "hunter2",
      "school": "State University",
      "major": "Biology",
      "location": "Springfield",
      "graduation_year": 2027,
      "funding_goal": 100_000,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let token = body["data"]["token"].as_str().unwrap().to_owned();
  let student_id = body["data"]["student"]["student_id"]
    .as_str()
    .unwrap()
    .parse()
    .unwrap();
  (token, student_id)
}

/// Register a student and walk them through verification approval.
async fn verified_student(
  state: &AppState<SqliteStore>,
  name: &str,
) -> (String, Uuid) {
  let (token, student_id) = register_student(state, name).await;

  let school = School {
    school_id: Uuid::new_v4(),
    name:      format!("{name} High"),
    city:      "Springfield".into(),
    state:     "IL".into(),
  };
  state.store.seed_schools(vec![school.clone()]).await.unwrap();

  let (status, body, _) = send(
    state,
    "POST",
    "/students/verification",
    Some(&token),
    Some(json!({
      "school_id": school.school_id,
      "document_url": "https://docs.example.com/proof.pdf",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let verification_id = body["data"]["verification_id"].as_str().unwrap();

  let admin = admin_token(state);
  let (status, body, _) = send(
    state,
    "POST",
    &format!("/admin/verification/verifications/{verification_id}/approve"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");

  (token, student_id)
}

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_then_login() {
  let state = make_state().await;
  register_donor(&state, "Alice").await;

  let (status, body, _) = send(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "alice@example.com", "password": "hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["data"]["token"].is_string());
}

#[tokio::test]
async fn wrong_password_is_401() {
  let state = make_state().await;
  register_donor(&state, "Alice").await;

  let (status, body, _) = send(
    &state,
    "POST",
    "/auth/login",
    None,
    Some(json!({ "email": "alice@example.com", "password": "wrong" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn duplicate_registration_is_409() {
  let state = make_state().await;
  register_donor(&state, "Alice").await;

  let (status, _, _) = send(
    &state,
    "POST",
    "/auth/register/donor",
    None,
    Some(json!({
      "name": "Alice Again",
      "email": "alice@example.com",
      "password": "other",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() {
  let state = make_state().await;
  let (_, donor_id) = register_donor(&state, "Alice").await;

  let admin = admin_token(&state);
  let (status, _, _) = send(
    &state,
    "PUT",
    &format!("/admin/users/{donor_id}/status"),
    Some(&admin),
    Some(json!({ "is_active": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let login = json!({ "email": "alice@example.com", "password": "hunter2" });
  let (status, body, _) =
    send(&state, "POST", "/auth/login", None, Some(login.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["success"], json!(false));

  // Reactivation restores access.
  let (status, _, _) = send(
    &state,
    "PUT",
    &format!("/admin/users/{donor_id}/status"),
    Some(&admin),
    Some(json!({ "is_active": true })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _, _) =
    send(&state, "POST", "/auth/login", None, Some(login)).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
  let state = make_state().await;
  let (status, _, _) =
    send(&state, "GET", "/donors/profile", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn donor_token_on_admin_route_is_403() {
  let state = make_state().await;
  let (token, _) = register_donor(&state, "Alice").await;
  let (status, _, _) =
    send(&state, "GET", "/admin/stats", Some(&token), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Discovery ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn discovery_shows_only_verified_students() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  register_student(&state, "Hidden").await;
  let (_, visible_id) = verified_student(&state, "Visible").await;

  let (status, body, _) =
    send(&state, "GET", "/donors/students", Some(&donor_token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["total"], json!(1));
  assert_eq!(
    body["data"]["students"][0]["student_id"],
    json!(visible_id.to_string())
  );
}

#[tokio::test]
async fn unverified_student_detail_is_404() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (_, hidden_id) = register_student(&state, "Hidden").await;

  let (status, _, _) = send(
    &state,
    "GET",
    &format!("/donors/students/{hidden_id}"),
    Some(&donor_token),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Donations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn card_donation_completes_and_shows_in_dashboard() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (_, student_id) = verified_student(&state, "Bea").await;

  let (status, body, _) = send(
    &state,
    "POST",
    "/donors/donations",
    Some(&donor_token),
    Some(json!({ "student_id": student_id, "amount": 25_000 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["data"]["status"], json!("completed"));

  let (status, body, _) = send(
    &state,
    "GET",
    "/donors/dashboard/stats",
    Some(&donor_token),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["total_donated"], json!(25_000));
  assert_eq!(body["data"]["students_supported"], json!(1));
}

#[tokio::test]
async fn zelle_donation_stays_pending_until_admin_verifies() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (_, student_id) = verified_student(&state, "Bea").await;

  let (status, body, _) = send(
    &state,
    "POST",
    "/donors/donations",
    Some(&donor_token),
    Some(json!({
      "student_id": student_id,
      "amount": 40_000,
      "payment_method": "zelle",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["data"]["status"], json!("pending"));
  let donation_id = body["data"]["donation_id"].as_str().unwrap().to_owned();

  let admin = admin_token(&state);
  let (status, body, _) = send(
    &state,
    "POST",
    &format!("/donation-admin/verify-zelle/{donation_id}"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["status"], json!("completed"));

  // Verifying a second time conflicts.
  let (status, _, _) = send(
    &state,
    "POST",
    &format!("/donation-admin/verify-zelle/{donation_id}"),
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_amount_is_400() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (_, student_id) = verified_student(&state, "Bea").await;

  let (status, _, _) = send(
    &state,
    "POST",
    "/donors/donations",
    Some(&donor_token),
    Some(json!({ "student_id": student_id, "amount": -5 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sponsoring_past_the_price_is_409() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (student_token, _) = verified_student(&state, "Bea").await;

  let (status, body, _) = send(
    &state,
    "POST",
    "/students/registry",
    Some(&student_token),
    Some(json!({ "name": "Laptop", "price": 100_000 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let item_id = body["data"]["item_id"].as_str().unwrap().to_owned();

  let (status, _, _) = send(
    &state,
    "POST",
    &format!("/donors/items/{item_id}/sponsor"),
    Some(&donor_token),
    Some(json!({ "amount": 90_000 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body, _) = send(
    &state,
    "POST",
    &format!("/donors/items/{item_id}/sponsor"),
    Some(&donor_token),
    Some(json!({ "amount": 20_000 })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT, "{body}");
}

#[tokio::test]
async fn refund_requires_reason_and_applies_once() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (_, student_id) = verified_student(&state, "Bea").await;

  let (_, body, _) = send(
    &state,
    "POST",
    "/donors/donations",
    Some(&donor_token),
    Some(json!({ "student_id": student_id, "amount": 30_000 })),
  )
  .await;
  let donation_id = body["data"]["donation_id"].as_str().unwrap().to_owned();

  let admin = admin_token(&state);
  let (status, _, _) = send(
    &state,
    "POST",
    &format!("/donation-admin/refund/{donation_id}"),
    Some(&admin),
    Some(json!({ "amount": 30_000, "reason": "" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body, _) = send(
    &state,
    "POST",
    &format!("/donation-admin/refund/{donation_id}"),
    Some(&admin),
    Some(json!({ "amount": 30_000, "reason": "duplicate charge" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["data"]["status"], json!("refunded"));

  let (status, _, _) = send(
    &state,
    "POST",
    &format!("/donation-admin/refund/{donation_id}"),
    Some(&admin),
    Some(json!({ "amount": 30_000, "reason": "again" })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn csv_export_carries_header_and_disposition() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (_, student_id) = verified_student(&state, "Bea").await;

  send(
    &state,
    "POST",
    "/donors/donations",
    Some(&donor_token),
    Some(json!({ "student_id": student_id, "amount": 12_345 })),
  )
  .await;

  let (status, body, headers) = send(
    &state,
    "GET",
    "/donors/donations/export?format=csv",
    Some(&donor_token),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let content_type =
    headers.get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
  assert!(content_type.contains("text/csv"));

  let text = body.as_str().unwrap();
  assert!(text.starts_with(
    "Date,Amount,Student,School,Receipt Number,Receipt URL\n"
  ));
  assert!(text.contains("123.45"));
  assert!(text.contains("Bea"));
}

#[tokio::test]
async fn json_export_uses_envelope() {
  let state = make_state().await;
  let (donor_token, _) = register_donor(&state, "Alice").await;
  let (_, student_id) = verified_student(&state, "Bea").await;

  send(
    &state,
    "POST",
    "/donors/donations",
    Some(&donor_token),
    Some(json!({ "student_id": student_id, "amount": 5_000 })),
  )
  .await;

  let (status, body, _) = send(
    &state,
    "GET",
    "/donors/donations/export?format=json",
    Some(&donor_token),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], json!(true));
  assert_eq!(body["data"].as_array().unwrap().len(), 1);
  assert_eq!(body["data"][0]["amount"], json!(5_000));
}

// ─── Verification queue ──────────────────────────────────────────────────────

#[tokio::test]
async fn rejection_carries_reason_and_allows_resubmission() {
  let state = make_state().await;
  let (student_token, _) = register_student(&state, "Bea").await;

  let school = School {
    school_id: Uuid::new_v4(),
    name:      "Springfield High".into(),
    city:      "Springfield".into(),
    state:     "IL".into(),
  };
  state.store.seed_schools(vec![school.clone()]).await.unwrap();

  let (_, body, _) = send(
    &state,
    "POST",
    "/students/verification",
    Some(&student_token),
    Some(json!({
      "school_id": school.school_id,
      "document_url": "https://docs.example.com/blurry.pdf",
    })),
  )
  .await;
  let verification_id =
    body["data"]["verification_id"].as_str().unwrap().to_owned();

  let admin = admin_token(&state);
  let (status, body, _) = send(
    &state,
    "POST",
    &format!("/admin/verification/verifications/{verification_id}/reject"),
    Some(&admin),
    Some(json!({ "reason": "illegible" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["rejection_reason"], json!("illegible"));

  let (status, body, _) = send(
    &state,
    "POST",
    "/students/verification",
    Some(&student_token),
    Some(json!({
      "school_id": school.school_id,
      "document_url": "https://docs.example.com/clear.pdf",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["data"]["status"], json!("pending"));
}

#[tokio::test]
async fn admin_stats_reflect_platform() {
  let state = make_state().await;
  register_donor(&state, "Alice").await;
  verified_student(&state, "Bea").await;
  register_student(&state, "Cora").await;

  let admin = admin_token(&state);
  let (status, body, _) =
    send(&state, "GET", "/admin/stats", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["total_donors"], json!(1));
  assert_eq!(body["data"]["total_students"], json!(2));
  assert_eq!(body["data"]["verified_students"], json!(1));
}
