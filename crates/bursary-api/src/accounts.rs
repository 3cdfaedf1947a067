//! Handlers for `/auth` endpoints: registration and login.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register/donor` | Body: name, email, password |
//! | `POST` | `/auth/register/student` | Body: profile fields + password |
//! | `POST` | `/auth/login` | Donor or student login |
//! | `POST` | `/auth/login/admin` | Admin login |

use axum::{Json, extract::State, response::IntoResponse};
use bursary_core::{
  admin::UserRole,
  donor::NewDonor,
  money::Cents,
  store::{Credential, PlatformStore},
  student::{NewStudent, Urgency},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
  AppState,
  auth::{hash_password, issue_token, verify_password},
  error::ApiError,
  respond,
};

// ─── Registration ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterDonorBody {
  pub name:     String,
  pub email:    String,
  pub password: String,
}

/// `POST /auth/register/donor`
pub async fn register_donor<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterDonorBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  if state
    .store
    .get_credential(&body.email, UserRole::Donor)
    .await
    .map_err(ApiError::from_store)?
    .is_some()
  {
    return Err(ApiError::Conflict(
      "an account already exists for this email".into(),
    ));
  }

  let donor = state
    .store
    .add_donor(NewDonor { name: body.name, email: body.email.clone() })
    .await
    .map_err(ApiError::from_store)?;

  state
    .store
    .add_credential(Credential {
      user_id:       donor.donor_id,
      email:         body.email,
      password_hash: hash_password(&body.password)?,
      role:          UserRole::Donor,
    })
    .await
    .map_err(ApiError::from_store)?;

  let token = issue_token(&state.auth, donor.donor_id, UserRole::Donor)?;
  Ok(respond::created(json!({ "token": token, "donor": donor })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterStudentBody {
  pub name:            String,
  pub email:           String,
  pub password:        String,
  pub school:          String,
  pub major:           String,
  pub location:        String,
  pub graduation_year: i32,
  #[serde(default)]
  pub bio:             String,
  #[serde(default)]
  pub urgency:         Urgency,
  pub funding_goal:    Cents,
}

/// `POST /auth/register/student`
pub async fn register_student<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<RegisterStudentBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  if body.funding_goal < 0 {
    return Err(ApiError::Validation(
      "funding goal must not be negative".into(),
    ));
  }
  if state
    .store
    .get_credential(&body.email, UserRole::Student)
    .await
    .map_err(ApiError::from_store)?
    .is_some()
  {
    return Err(ApiError::Conflict(
      "an account already exists for this email".into(),
    ));
  }

  let student = state
    .store
    .add_student(NewStudent {
      name:            body.name,
      email:           body.email.clone(),
      school:          body.school,
      major:           body.major,
      location:        body.location,
      graduation_year: body.graduation_year,
      bio:             body.bio,
      urgency:         body.urgency,
      funding_goal:    body.funding_goal,
    })
    .await
    .map_err(ApiError::from_store)?;

  state
    .store
    .add_credential(Credential {
      user_id:       student.student_id,
      email:         body.email,
      password_hash: hash_password(&body.password)?,
      role:          UserRole::Student,
    })
    .await
    .map_err(ApiError::from_store)?;

  let token = issue_token(&state.auth, student.student_id, UserRole::Student)?;
  Ok(respond::created(json!({ "token": token, "student": student })))
}

// ─── Login ───────────────────────────────────────────────────────────────────

fn default_role() -> UserRole {
  UserRole::Donor
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
  /// `donor` (default) or `student`.
  #[serde(default = "default_role")]
  pub role:     UserRole,
}

async fn login_as<S>(
  state: &AppState<S>,
  email: &str,
  password: &str,
  role: UserRole,
) -> Result<String, ApiError>
where
  S: PlatformStore,
{
  let credential = state
    .store
    .get_credential(email, role)
    .await
    .map_err(ApiError::from_store)?
    .ok_or(ApiError::Unauthorized)?;

  verify_password(password, &credential.password_hash)?;
  require_active(state, credential.user_id, role).await?;
  issue_token(&state.auth, credential.user_id, role)
}

/// A deactivated account keeps its credential but may not log in.
async fn require_active<S>(
  state: &AppState<S>,
  user_id: uuid::Uuid,
  role: UserRole,
) -> Result<(), ApiError>
where
  S: PlatformStore,
{
  let is_active = match role {
    UserRole::Donor => state
      .store
      .get_donor(user_id)
      .await
      .map_err(ApiError::from_store)?
      .map(|d| d.is_active),
    UserRole::Student => state
      .store
      .get_student(user_id)
      .await
      .map_err(ApiError::from_store)?
      .map(|s| s.is_active),
    // Admin accounts have no profile record to deactivate.
    UserRole::Admin | UserRole::SuperAdmin => Some(true),
  };
  match is_active {
    Some(true) => Ok(()),
    _ => Err(ApiError::Forbidden("account is deactivated".into())),
  }
}

/// `POST /auth/login` — donor and student accounts.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  if !matches!(body.role, UserRole::Donor | UserRole::Student) {
    return Err(ApiError::Validation(
      "role must be donor or student".into(),
    ));
  }
  let token = login_as(&state, &body.email, &body.password, body.role).await?;
  Ok(respond::ok(json!({ "token": token, "role": body.role })))
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login/admin`
pub async fn login_admin<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<AdminLoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PlatformStore,
{
  for role in [UserRole::Admin, UserRole::SuperAdmin] {
    match login_as(&state, &body.email, &body.password, role).await {
      Ok(token) => {
        return Ok(respond::ok(json!({ "token": token, "role": role })));
      }
      Err(ApiError::Unauthorized) => continue,
      Err(e) => return Err(e),
    }
  }
  Err(ApiError::Unauthorized)
}
