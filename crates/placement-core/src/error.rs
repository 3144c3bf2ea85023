//! Error types for `placement-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{eligibility::Ineligible, job::JobStatus, validate::FieldError};

/// The stable, transport-independent category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  NotFound,
  Conflict,
  Forbidden,
  Validation,
  Unauthorized,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("job not found: {0}")]
  JobNotFound(Uuid),

  #[error("application not found: {0}")]
  ApplicationNotFound(Uuid),

  #[error("profile not found")]
  ProfileNotFound,

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("you have already applied for this job")]
  AlreadyApplied,

  #[error("job is not accepting applications (status: {0})")]
  JobNotOpen(JobStatus),

  #[error("application deadline has passed")]
  DeadlinePassed,

  #[error(
    "cannot delete job with {0} existing application(s); close the job instead"
  )]
  JobHasApplications(u64),

  #[error("user already exists with this email")]
  EmailTaken,

  #[error("application is already withdrawn")]
  AlreadyWithdrawn,

  #[error("{0}")]
  NotEligible(Ineligible),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("validation failed")]
  Validation(Vec<FieldError>),

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("account is deactivated")]
  AccountDeactivated,

  #[error("authentication required")]
  Unauthenticated,

  #[error("credential error: {0}")]
  Credential(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::JobNotFound(_)
      | Self::ApplicationNotFound(_)
      | Self::ProfileNotFound
      | Self::UserNotFound(_) => ErrorKind::NotFound,
      Self::AlreadyApplied
      | Self::JobNotOpen(_)
      | Self::DeadlinePassed
      | Self::JobHasApplications(_)
      | Self::EmailTaken
      | Self::AlreadyWithdrawn
      | Self::NotEligible(_) => ErrorKind::Conflict,
      Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::Validation(_) => ErrorKind::Validation,
      Self::InvalidCredentials
      | Self::AccountDeactivated
      | Self::Unauthenticated => ErrorKind::Unauthorized,
      Self::Credential(_) | Self::Store(_) => ErrorKind::Internal,
    }
  }

  /// Wrap a backend error as an opaque internal failure.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// A single-field validation failure.
  pub fn invalid(field: &str, message: &str) -> Self {
    Self::Validation(vec![FieldError {
      field:   field.to_owned(),
      message: message.to_owned(),
    }])
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
