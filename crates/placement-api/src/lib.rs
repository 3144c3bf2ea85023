//! JSON REST API for the placement portal.
//!
//! Exposes an axum [`Router`] backed by any [`PortalStore`]. Identity comes
//! from a bearer token (see [`token`]); role and ownership checks happen in
//! [`placement_core::Portal`]. TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", placement_api::api_router(state))
//! ```

pub mod accounts;
pub mod admin;
pub mod applications;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod profiles;
pub mod token;


use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, patch, post},
};
use placement_core::{Portal, store::PortalStore};
use serde_json::{Value, json};

pub use error::ApiError;
pub use token::{CurrentUser, TokenKeys};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub portal: Portal<S>,
  pub tokens: Arc<TokenKeys>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      portal: self.portal.clone(),
      tokens: Arc::clone(&self.tokens),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: PortalStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Accounts
    .route("/auth/register", post(accounts::register::<S>))
    .route("/auth/login", post(accounts::login::<S>))
    .route("/auth/me", get(accounts::me::<S>))
    .route("/auth/logout", post(accounts::logout))
    // Jobs
    .route("/jobs", get(jobs::list::<S>).post(jobs::create::<S>))
    .route("/jobs/company/mine", get(jobs::mine::<S>))
    .route(
      "/jobs/{id}",
      get(jobs::get_one::<S>)
        .put(jobs::update::<S>)
        .delete(jobs::delete::<S>),
    )
    .route("/jobs/{id}/eligibility", get(jobs::eligibility::<S>))
    // Applications
    .route("/applications", post(applications::submit::<S>))
    .route("/applications/me", get(applications::mine::<S>))
    .route("/applications/job/{job_id}", get(applications::for_job::<S>))
    .route("/applications/{id}", get(applications::get_one::<S>))
    .route("/applications/{id}/stage", patch(applications::stage::<S>))
    .route("/applications/{id}/review", post(applications::review::<S>))
    .route("/applications/{id}/withdraw", post(applications::withdraw::<S>))
    // Profiles
    .route(
      "/profiles/me",
      get(profiles::mine::<S>).put(profiles::update_mine::<S>),
    )
    .route("/profiles", get(profiles::list::<S>))
    .route("/profiles/{id}", get(profiles::get_one::<S>))
    // Admin
    .route("/admin/stats/users", get(admin::user_stats::<S>))
    .route("/admin/stats/jobs", get(admin::job_stats::<S>))
    .route("/admin/users", get(admin::users::<S>))
    .route("/admin/users/{id}/status", patch(admin::set_status::<S>))
    .route("/admin/analytics/placement", get(admin::placement::<S>))
    .route("/admin/analytics/companies", get(admin::companies::<S>))
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
