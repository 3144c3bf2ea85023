//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Students and companies only; returns a token |
//! | `POST` | `/auth/login`    | Returns a token |
//! | `GET`  | `/auth/me`       | The caller's account |
//! | `POST` | `/auth/logout`   | Tokens are stateless; always succeeds |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use placement_core::{
  store::PortalStore,
  user::{Credentials, Registration, User},
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{AppState, CurrentUser, error::ApiError, extract::Payload};

#[derive(Debug, Serialize)]
pub struct Session {
  pub token: String,
  pub user:  User,
}

/// `POST /auth/register`
pub async fn register<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Payload(body): Payload<Registration>,
) -> Result<impl IntoResponse, ApiError> {
  let user = state.portal.register(body).await?;
  let token = state.tokens.issue(&user)?;
  Ok((StatusCode::CREATED, Json(Session { token, user })))
}

/// `POST /auth/login`
pub async fn login<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  Payload(body): Payload<Credentials>,
) -> Result<Json<Session>, ApiError> {
  let user = state.portal.login(body).await?;
  let token = state.tokens.issue(&user)?;
  Ok(Json(Session { token, user }))
}

/// `GET /auth/me`
pub async fn me<S: PortalStore + 'static>(
  State(state): State<AppState<S>>,
  current: CurrentUser,
) -> Result<Json<User>, ApiError> {
  Ok(Json(state.portal.me(&current.actor()).await?))
}

/// `POST /auth/logout`
pub async fn logout() -> Json<Value> {
  Json(json!({ "message": "Logged out successfully" }))
}
