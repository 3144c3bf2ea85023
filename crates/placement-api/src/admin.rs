//! Handlers for `/admin` endpoints. Every route requires the admin role.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/admin/stats/users` | Active accounts by role |
//! | `GET`   | `/admin/stats/jobs` | Postings, funnel, skill demand, top companies |
//! | `GET`   | `/admin/users` | `?role=&department=&search=&page=&limit=` |
//! | `PATCH` | `/admin/users/:id/status` | Body: `{"is_active":false}` |
//! | `GET`   | `/admin/analytics/placement` | `?batch=&department=` |
//! | `GET`   | `/admin/analytics/companies` | |

use axum::{Json, extract::State};
use placement_core::{
  Role,
  page::{Page, PageRequest},
  stats::{CompanyFunnel, JobStats, PlacementAnalytics, UserStats},
  store::PortalStore,
  user::{StatusChange, User, UserQuery},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::{Id, Params, Payload},
};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

// ─── Stats ────────────────────────────────────────────────────────────────────

/// `GET /admin/stats/users`
pub async fn user_stats<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<UserStats>, ApiError> {
  Ok(Json(state.portal.user_stats(&current.actor()).await?))
}

/// `GET /admin/stats/jobs`
pub async fn job_stats<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<JobStats>, ApiError> {
  Ok(Json(state.portal.job_stats(&current.actor()).await?))
}

// ─── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct UserParams {
  pub role:       Option<Role>,
  pub department: Option<String>,
  pub search:     Option<String>,
  pub page:       Option<u32>,
  pub limit:      Option<u32>,
}

/// `GET /admin/users`
pub async fn users<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<UserParams>,
) -> Result<Json<Page<User>>, ApiError> {
  let page = PageRequest::new(params.page, params.limit, DEFAULT_LIMIT, MAX_LIMIT)?;
  let query = UserQuery {
    role:       params.role,
    department: params.department,
    search:     params.search,
  };
  Ok(Json(state.portal.list_users(&current.actor(), query, page).await?))
}

/// `PATCH /admin/users/:id/status`
pub async fn set_status<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
  Payload(body): Payload<StatusChange>,
) -> Result<Json<User>, ApiError> {
  Ok(Json(state.portal.set_user_status(&current.actor(), id, body).await?))
}

// ─── Analytics ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PlacementParams {
  /// Graduation year.
  pub batch:      Option<i32>,
  pub department: Option<String>,
}

/// `GET /admin/analytics/placement`
pub async fn placement<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<PlacementParams>,
) -> Result<Json<PlacementAnalytics>, ApiError> {
  let analytics = state
    .portal
    .placement_analytics(&current.actor(), params.batch, params.department)
    .await?;
  Ok(Json(analytics))
}

/// `GET /admin/analytics/companies`
pub async fn companies<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<Vec<CompanyFunnel>>, ApiError> {
  Ok(Json(state.portal.company_analytics(&current.actor()).await?))
}
