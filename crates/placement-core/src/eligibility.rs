//! Matching a student's profile against a job's eligibility predicate.

use serde::Serialize;
use thiserror::Error;

use crate::{job::Eligibility, profile::StudentProfile};

/// Why a profile does not satisfy a predicate. The display text is shown to
/// the student verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligible {
  #[error("CGPA requirement not met")]
  Cgpa,
  #[error("Graduation year requirement not met")]
  GraduationYear,
  #[error("Please complete your profile before applying")]
  IncompleteProfile,
}

/// Evaluate `profile` against `predicate`, surfacing the first failing
/// check.
///
/// Checks run in order: minimum CGPA (inclusive), graduation year
/// membership, then profile completeness. All three must pass. A missing
/// profile has no CGPA, no graduation year, and is never complete.
///
/// An unrecorded CGPA counts as failing a CGPA requirement, so the student
/// sees the CGPA reason rather than the completeness one even though a
/// profile without a CGPA is also incomplete.
pub fn evaluate(
  predicate: &Eligibility,
  profile: Option<&StudentProfile>,
) -> Result<(), Ineligible> {
  if let Some(min) = predicate.min_cgpa {
    let cgpa = profile.and_then(|p| p.cgpa);
    if cgpa.is_none_or(|c| c < min) {
      return Err(Ineligible::Cgpa);
    }
  }

  if !predicate.graduation_years.is_empty() {
    let year = profile.map(|p| p.graduation_year);
    if year.is_none_or(|y| !predicate.graduation_years.contains(&y)) {
      return Err(Ineligible::GraduationYear);
    }
  }

  if !profile.is_some_and(|p| p.is_complete) {
    return Err(Ineligible::IncompleteProfile);
  }

  Ok(())
}

/// The outcome of an eligibility check in response form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityReport {
  pub eligible: bool,
  pub reason:   Option<String>,
}

impl From<Result<(), Ineligible>> for EligibilityReport {
  fn from(r: Result<(), Ineligible>) -> Self {
    match r {
      Ok(()) => Self { eligible: true, reason: None },
      Err(why) => Self { eligible: false, reason: Some(why.to_string()) },
    }
  }
}
