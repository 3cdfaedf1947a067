//! JSON REST API for Bursary.
//!
//! Exposes an axum [`Router`] backed by any
//! [`bursary_core::store::PlatformStore`]. TLS and transport concerns are
//! the caller's responsibility; authentication is handled here via signed
//! bearer tokens (see [`auth`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bursary_api::api_router(state))
//! ```

pub mod accounts;
pub mod admin;
pub mod auth;
pub mod discovery;
pub mod donation_admin;
pub mod donations;
pub mod donors;
pub mod error;
pub mod recurring;
pub mod respond;
pub mod students;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use bursary_core::store::PlatformStore;

pub use auth::AuthKeys;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthKeys>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), auth: self.auth.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: PlatformStore + 'static,
{
  Router::new()
    // Accounts
    .route("/auth/register/donor", post(accounts::register_donor::<S>))
    .route("/auth/register/student", post(accounts::register_student::<S>))
    .route("/auth/login", post(accounts::login::<S>))
    .route("/auth/login/admin", post(accounts::login_admin::<S>))
    // Donor self-service
    .route(
      "/donors/profile",
      get(donors::get_profile::<S>).put(donors::update_profile::<S>),
    )
    .route("/donors/dashboard/stats", get(donors::dashboard::<S>))
    .route(
      "/donors/bookmarks",
      get(donors::list_bookmarks::<S>).post(donors::add_bookmark::<S>),
    )
    .route(
      "/donors/bookmarks/{student_id}",
      axum::routing::delete(donors::remove_bookmark::<S>),
    )
    // Discovery
    .route("/donors/students", get(discovery::search::<S>))
    .route("/donors/students/{id}", get(discovery::get_one::<S>))
    .route(
      "/donors/students/{id}/registry",
      get(discovery::list_registry::<S>),
    )
    // Donations
    .route(
      "/donors/donations",
      get(donations::history::<S>).post(donations::donate::<S>),
    )
    .route("/donors/donations/export", get(donations::export::<S>))
    .route("/donors/items/{item_id}/sponsor", post(donations::sponsor::<S>))
    // Recurring donations
    .route(
      "/donors/recurring-donations",
      get(recurring::list::<S>).post(recurring::create::<S>),
    )
    .route(
      "/donors/recurring-donations/{id}",
      patch(recurring::update::<S>),
    )
    // Student self-service
    .route(
      "/students/profile",
      get(students::get_profile::<S>).put(students::update_profile::<S>),
    )
    .route(
      "/students/registry",
      get(students::list_registry::<S>).post(students::add_registry_item::<S>),
    )
    .route(
      "/students/registry/{item_id}",
      put(students::update_registry_item::<S>)
        .delete(students::remove_registry_item::<S>),
    )
    .route("/students/schools", get(students::list_schools::<S>))
    .route("/students/verification", post(students::submit_verification::<S>))
    // Platform administration
    .route("/admin/stats", get(admin::stats::<S>))
    .route("/admin/users", get(admin::list_users::<S>))
    .route("/admin/users/{id}/status", put(admin::set_user_status::<S>))
    .route(
      "/admin/verification/verifications",
      get(admin::list_verifications::<S>),
    )
    .route(
      "/admin/verification/verifications/stats",
      get(admin::verification_stats::<S>),
    )
    .route(
      "/admin/verification/verifications/{id}/approve",
      post(admin::approve_verification::<S>),
    )
    .route(
      "/admin/verification/verifications/{id}/reject",
      post(admin::reject_verification::<S>),
    )
    // Donation administration
    .route("/donation-admin/donations", get(donation_admin::list::<S>))
    .route("/donation-admin/analytics", get(donation_admin::analytics::<S>))
    .route(
      "/donation-admin/refund/{donation_id}",
      post(donation_admin::refund::<S>),
    )
    .route(
      "/donation-admin/verify-zelle/{donation_id}",
      post(donation_admin::verify_zelle::<S>),
    )
    .route("/donation-admin/export", get(donation_admin::export::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
