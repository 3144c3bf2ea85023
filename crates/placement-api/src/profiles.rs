//! Handlers for `/profiles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/profiles/me` | Student; 404 until a profile exists |
//! | `PUT`  | `/profiles/me` | Student; partial update, creates if missing |
//! | `GET`  | `/profiles` | Admin; `?department=&graduation_year=&skills=a,b&page=&limit=` |
//! | `GET`  | `/profiles/:id` | Admin |

use axum::{Json, extract::State};
use placement_core::{
  page::{Page, PageRequest},
  profile::{ProfilePatch, ProfileQuery, ProfileWithStudent},
  store::PortalStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, CurrentUser,
  error::ApiError,
  extract::{Id, Params, Payload, split_list},
};

const DEFAULT_LIMIT: u32 = 20;
const MAX_LIMIT: u32 = 100;

/// `GET /profiles/me`
pub async fn mine<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<ProfileWithStudent>, ApiError> {
  Ok(Json(state.portal.my_profile(&current.actor()).await?))
}

/// `PUT /profiles/me`
pub async fn update_mine<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Payload(body): Payload<ProfilePatch>,
) -> Result<Json<ProfileWithStudent>, ApiError> {
  let profile = state
    .portal
    .update_my_profile(&current.actor(), body)
    .await?;
  Ok(Json(profile))
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryParams {
  pub department:      Option<String>,
  pub graduation_year: Option<i32>,
  /// Comma-separated; matches profiles listing any of them.
  pub skills:          Option<String>,
  pub page:            Option<u32>,
  pub limit:           Option<u32>,
}

/// `GET /profiles`
pub async fn list<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Params(params): Params<DirectoryParams>,
) -> Result<Json<Page<ProfileWithStudent>>, ApiError> {
  let page = PageRequest::new(params.page, params.limit, DEFAULT_LIMIT, MAX_LIMIT)?;
  let query = ProfileQuery {
    department:      params.department,
    graduation_year: params.graduation_year,
    skills:          split_list(params.skills),
  };
  Ok(Json(state.portal.list_profiles(&current.actor(), query, page).await?))
}

/// `GET /profiles/:id`
pub async fn get_one<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
  Id(id): Id<Uuid>,
) -> Result<Json<ProfileWithStudent>, ApiError> {
  Ok(Json(state.portal.get_profile(&current.actor(), id).await?))
}
