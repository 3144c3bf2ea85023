//! Handlers for `/jobs` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/jobs` | Public; `?search=&skills=a,b&location=&job_type=&page=&limit=` |
//! | `GET`    | `/jobs/:id` | Public |
//! | `GET`    | `/jobs/:id/eligibility` | Student |
//! | `POST`   | `/jobs` | Company |
//! | `GET`    | `/jobs/company/mine` | Company; `?status=&page=` |
//! | `PUT`    | `/jobs/:id` | Owning company; partial update |
//! | `DELETE` | `/jobs/:id` | Owning company; 409 once anyone has applied |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use placement_core::{
  eligibility::EligibilityReport,
  job::{CompanyJob, Job, JobPatch, JobQuery, JobStatus, JobType, NewJob},
  page::{Page, PageRequest},
  store::PortalStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::{Id, Params, Payload, split_list},
};

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;

// ─── Public board ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct BoardParams {
  pub search:   Option<String>,
  /// Comma-separated; matches postings requiring any of them.
  pub skills:   Option<String>,
  pub location: Option<String>,
  pub job_type: Option<JobType>,
  pub page:     Option<u32>,
  pub limit:    Option<u32>,
}

/// `GET /jobs`
pub async fn list<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Params(params): Params<BoardParams>,
) -> Result<Json<Page<Job>>, ApiError> {
  let page = PageRequest::new(params.page, params.limit, DEFAULT_LIMIT, MAX_LIMIT)?;
  let query = JobQuery {
    search:   params.search,
    skills:   split_list(params.skills),
    location: params.location,
    job_type: params.job_type,
  };
  Ok(Json(state.portal.list_jobs(query, page).await?))
}

/// `GET /jobs/:id`
pub async fn get_one<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Id(id): Id<Uuid>,
) -> Result<Json<Job>, ApiError> {
  Ok(Json(state.portal.get_job(id).await?))
}

/// `GET /jobs/:id/eligibility`
pub async fn eligibility<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
) -> Result<Json<EligibilityReport>, ApiError> {
  Ok(Json(state.portal.check_eligibility(&current.actor(), id).await?))
}

// ─── Company postings ─────────────────────────────────────────────────────────

/// `POST /jobs`
pub async fn create<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Payload(body): Payload<NewJob>,
) -> Result<impl IntoResponse, ApiError> {
  let job = state.portal.create_job(&current.actor(), body).await?;
  Ok((StatusCode::CREATED, Json(job)))
}

#[derive(Debug, Default, Deserialize)]
pub struct MineParams {
  pub status: Option<JobStatus>,
  pub page:   Option<u32>,
}

/// `GET /jobs/company/mine`
pub async fn mine<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<MineParams>,
) -> Result<Json<Page<CompanyJob>>, ApiError> {
  let jobs = state
    .portal
    .company_jobs(&current.actor(), params.status, params.page)
    .await?;
  Ok(Json(jobs))
}

/// `PUT /jobs/:id`
pub async fn update<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
  Payload(body): Payload<JobPatch>,
) -> Result<Json<Job>, ApiError> {
  Ok(Json(state.portal.update_job(&current.actor(), id, body).await?))
}

/// `DELETE /jobs/:id`
pub async fn delete<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
) -> Result<StatusCode, ApiError> {
  state.portal.delete_job(&current.actor(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}
