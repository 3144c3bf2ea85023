//! Bearer-token issuing and the authenticated-user extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use placement_core::{Actor, Error, Role, store::PortalStore, user::User};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// How long an issued token stays valid unless configured otherwise.
pub const DEFAULT_TTL_HOURS: i64 = 7 * 24;

// ─── Claims ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
  /// The account id.
  pub sub:  Uuid,
  pub role: Role,
  pub iat:  i64,
  pub exp:  i64,
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// HS256 signing material shared by every request handler.
#[derive(Clone)]
pub struct TokenKeys {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  ttl:        Duration,
}

impl TokenKeys {
  pub fn new(secret: &[u8], ttl: Duration) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation: Validation::new(Algorithm::HS256),
      ttl,
    }
  }

  pub fn issue(&self, user: &User) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub:  user.user_id,
      role: user.role,
      iat:  now.timestamp(),
      exp:  (now + self.ttl).timestamp(),
    };
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
  }

  /// Check signature and expiry. Any failure is reported as a missing
  /// authentication, never as a server error.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(|e| {
        debug!(error = %e, "rejected bearer token");
        ApiError::Core(Error::Unauthenticated)
      })
  }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The live account behind the request's bearer token.
///
/// The account is re-read on every request, so a deactivation takes effect
/// immediately even for tokens issued earlier.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
  pub fn actor(&self) -> Actor { self.0.actor() }
}

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: PortalStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer(&parts.headers).ok_or(Error::Unauthenticated)?;
    let claims = state.tokens.verify(token)?;
    let user = state.portal.authenticate(claims.sub).await?;
    Ok(CurrentUser(user))
  }
}
