//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as
//! `{"error": <kind>, "message": <text>, "details": [<field errors>]}` with
//! `details` present only for validation failures.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use placement_core::{Error, ErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler or extractor.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] Error),

  /// The request could not be decoded into the handler's input type.
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("token error: {0}")]
  Token(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      ApiError::Core(e) => e.kind(),
      ApiError::BadRequest(_) => ErrorKind::Validation,
      ApiError::Token(_) => ErrorKind::Internal,
    }
  }

  pub fn status(&self) -> StatusCode {
    match self.kind() {
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::Conflict => StatusCode::CONFLICT,
      ErrorKind::Forbidden => StatusCode::FORBIDDEN,
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
      ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let kind = self.kind();
    let body = match &self {
      _ if kind == ErrorKind::Internal => {
        error!(error = %self, "request failed");
        json!({ "error": kind, "message": "Internal server error" })
      }
      ApiError::Core(Error::Validation(fields)) => json!({
        "error":   kind,
        "message": "Validation failed",
        "details": fields,
      }),
      ApiError::Core(e) => json!({ "error": kind, "message": e.to_string() }),
      ApiError::BadRequest(m) => json!({ "error": kind, "message": m }),
      ApiError::Token(_) => json!({ "error": kind }),
    };
    (self.status(), Json(body)).into_response()
  }
}

// ─── Extractor rejections ────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
  fn from(r: JsonRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(r: QueryRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(r: PathRejection) -> Self { ApiError::BadRequest(r.body_text()) }
}
