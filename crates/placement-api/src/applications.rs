//! Handlers for `/applications` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `POST`  | `/applications` | Student |
//! | `GET`   | `/applications/me` | Student; `?stage=&page=`, `status` accepted for `stage` |
//! | `GET`   | `/applications/job/:job_id` | Owning company; `?stage=&page=` |
//! | `GET`   | `/applications/:id` | Owning student, owning company, or admin |
//! | `PATCH` | `/applications/:id/stage` | Owning company |
//! | `POST`  | `/applications/:id/review` | Owning company |
//! | `POST`  | `/applications/:id/withdraw` | Owning student; body optional |

use axum::{
  Json,
  body::Bytes,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use placement_core::{
  application::{
    Application, JobApplications, Review, Stage, StageUpdate,
    StudentApplication, Submission, Withdrawal,
  },
  page::Page,
  store::PortalStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::{Id, Params, Payload},
};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(alias = "status")]
  pub stage: Option<Stage>,
  pub page:  Option<u32>,
}

// ─── Students ─────────────────────────────────────────────────────────────────

/// `POST /applications`
pub async fn submit<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Payload(body): Payload<Submission>,
) -> Result<impl IntoResponse, ApiError> {
  let application = state
    .portal
    .submit_application(&current.actor(), body)
    .await?;
  Ok((StatusCode::CREATED, Json(application)))
}

/// `GET /applications/me`
pub async fn mine<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<ListParams>,
) -> Result<Json<Page<StudentApplication>>, ApiError> {
  let page = state
    .portal
    .my_applications(&current.actor(), params.stage, params.page)
    .await?;
  Ok(Json(page))
}

/// `POST /applications/:id/withdraw`
///
/// An empty body withdraws without a reason.
pub async fn withdraw<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
  body: Bytes,
) -> Result<Json<Application>, ApiError> {
  let withdrawal = if body.iter().all(u8::is_ascii_whitespace) {
    Withdrawal::default()
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| ApiError::BadRequest(format!("invalid withdrawal: {e}")))?
  };
  let application = state
    .portal
    .withdraw_application(&current.actor(), id, withdrawal)
    .await?;
  Ok(Json(application))
}

// ─── Companies ────────────────────────────────────────────────────────────────

/// `GET /applications/job/:job_id`
pub async fn for_job<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(job_id): Id<Uuid>,
  Params(params): Params<ListParams>,
) -> Result<Json<JobApplications>, ApiError> {
  let listing = state
    .portal
    .job_applications(&current.actor(), job_id, params.stage, params.page)
    .await?;
  Ok(Json(listing))
}

/// `PATCH /applications/:id/stage`
pub async fn stage<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
  Payload(body): Payload<StageUpdate>,
) -> Result<Json<Application>, ApiError> {
  let application = state
    .portal
    .transition_stage(&current.actor(), id, body)
    .await?;
  Ok(Json(application))
}

/// `POST /applications/:id/review`
pub async fn review<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
  Payload(body): Payload<Review>,
) -> Result<Json<Application>, ApiError> {
  let application = state
    .portal
    .review_application(&current.actor(), id, body)
    .await?;
  Ok(Json(application))
}

// ─── Shared ───────────────────────────────────────────────────────────────────

/// `GET /applications/:id`
pub async fn get_one<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
) -> Result<Json<Application>, ApiError> {
  Ok(Json(state.portal.get_application(&current.actor(), id).await?))
}
