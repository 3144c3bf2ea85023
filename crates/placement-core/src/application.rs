//! Applications and the review pipeline they move through.
//!
//! The stage machine is permissive: a company may move an application from
//! any stage to any of `applied`, `shortlisted`, `interview`, `offered`, or
//! `rejected`, including backwards and onto the current stage. Only the
//! student can reach `withdrawn`. Every change, including a no-op one,
//! appends exactly one [`StageChange`] to the history, which is never
//! rewritten.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  job::JobType,
  page::Page,
  user::StudentSummary,
  validate::{Violations, min_chars, non_blank},
};

// ─── Stage ───────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
  Applied,
  Shortlisted,
  Interview,
  Offered,
  Rejected,
  Withdrawn,
}

impl Stage {
  /// Whether a company may move an application into this stage.
  pub fn is_company_settable(self) -> bool { self != Self::Withdrawn }
}

/// Per-stage application counts.
pub type Funnel = BTreeMap<Stage, u64>;

// ─── Child records ───────────────────────────────────────────────────────────

/// One entry in an application's stage history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageChange {
  pub stage:      Stage,
  pub changed_by: Uuid,
  pub changed_at: DateTime<Utc>,
  pub reason:     Option<String>,
}

/// A free-text remark left by a company reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewerNote {
  pub note:       String,
  pub reviewer:   Uuid,
  pub created_at: DateTime<Utc>,
}

/// Reviewer sub-scores, each 0–100 when present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scores {
  pub aptitude:      Option<i32>,
  pub technical:     Option<i32>,
  pub communication: Option<i32>,
}

impl Scores {
  fn check(&self, v: &mut Violations) {
    for (field, value) in [
      ("scores.aptitude", self.aptitude),
      ("scores.technical", self.technical),
      ("scores.communication", self.communication),
    ] {
      v.check(
        value.is_none_or(|s| (0..=100).contains(&s)),
        field,
        "Score must be between 0 and 100",
      );
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningAnswer {
  pub question: String,
  pub answer:   String,
}

// ─── Application ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
  pub application_id:    Uuid,
  pub job_id:            Uuid,
  pub student_id:        Uuid,
  pub cover_letter:      String,
  pub resume_url:        Option<String>,
  pub screening_answers: Vec<ScreeningAnswer>,
  pub stage:             Stage,
  pub scores:            Scores,
  /// Append-only, oldest first.
  pub reviewer_notes:    Vec<ReviewerNote>,
  /// Append-only, oldest first. Never empty.
  pub stage_history:     Vec<StageChange>,
  pub created_at:        DateTime<Utc>,
  pub updated_at:        DateTime<Utc>,
}

impl Application {
  /// A fresh application in the `applied` stage with its single initial
  /// history entry.
  pub fn submit(
    submission: Submission,
    student_id: Uuid,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      application_id: Uuid::new_v4(),
      job_id: submission.job_id,
      student_id,
      cover_letter: submission.cover_letter.trim().to_owned(),
      resume_url: non_blank(submission.resume_url),
      screening_answers: submission.screening_answers,
      stage: Stage::Applied,
      scores: Scores::default(),
      reviewer_notes: Vec::new(),
      stage_history: vec![StageChange {
        stage:      Stage::Applied,
        changed_by: student_id,
        changed_at: now,
        reason:     None,
      }],
      created_at: now,
      updated_at: now,
    }
  }

  /// Build the history entry for moving to `stage`.
  ///
  /// `changed_at` never precedes the latest entry, so the history stays
  /// ordered even if the wall clock steps backwards.
  pub fn stage_change(
    &self,
    stage: Stage,
    changed_by: Uuid,
    reason: Option<String>,
    now: DateTime<Utc>,
  ) -> StageChange {
    let changed_at = self
      .stage_history
      .last()
      .map_or(now, |last| last.changed_at.max(now));
    StageChange {
      stage,
      changed_by,
      changed_at,
      reason: non_blank(reason),
    }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A student's application payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
  pub job_id:            Uuid,
  pub cover_letter:      String,
  pub resume_url:        Option<String>,
  #[serde(default)]
  pub screening_answers: Vec<ScreeningAnswer>,
}

impl Submission {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::new();
    v.check(
      min_chars(&self.cover_letter, 50),
      "cover_letter",
      "Cover letter must be at least 50 characters",
    );
    v.finish()
  }
}

/// A company's stage-transition request.
#[derive(Debug, Clone, Deserialize)]
pub struct StageUpdate {
  pub stage:  Stage,
  pub reason: Option<String>,
}

impl StageUpdate {
  pub fn validate(&self) -> Result<()> {
    if self.stage.is_company_settable() {
      Ok(())
    } else {
      Err(Error::invalid("stage", "Invalid stage"))
    }
  }
}

/// A student's withdrawal request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Withdrawal {
  pub reason: Option<String>,
}

/// A company's review: an optional note and optional score updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Review {
  pub note:   Option<String>,
  pub scores: Option<Scores>,
}

impl Review {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::new();
    if let Some(scores) = &self.scores {
      scores.check(&mut v);
    }
    v.finish()
  }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// The job fields shown next to a student's own applications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
  pub job_id:   Uuid,
  pub title:    String,
  pub company:  String,
  pub location: String,
  pub job_type: JobType,
  pub deadline: DateTime<Utc>,
}

/// One row of a student's application list.
#[derive(Debug, Clone, Serialize)]
pub struct StudentApplication {
  #[serde(flatten)]
  pub application: Application,
  pub job:         JobSummary,
}

/// One row of a company's applicant list.
#[derive(Debug, Clone, Serialize)]
pub struct Applicant {
  #[serde(flatten)]
  pub application: Application,
  pub student:     StudentSummary,
}

/// A page of a job's applicants plus per-stage counts for the whole job.
#[derive(Debug, Clone, Serialize)]
pub struct JobApplications {
  #[serde(flatten)]
  pub page:        Page<Applicant>,
  pub stage_stats: Funnel,
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn submitted(now: DateTime<Utc>) -> Application {
    Application::submit(
      Submission {
        job_id:            Uuid::new_v4(),
        cover_letter:      "x".repeat(60),
        resume_url:        Some("  ".into()),
        screening_answers: vec![],
      },
      Uuid::new_v4(),
      now,
    )
  }

  #[test]
  fn submission_starts_applied_with_one_entry() {
    let now = Utc::now();
    let app = submitted(now);
    assert_eq!(app.stage, Stage::Applied);
    assert_eq!(app.stage_history.len(), 1);
    assert_eq!(app.stage_history[0].changed_by, app.student_id);
    assert_eq!(app.stage_history[0].changed_at, now);
    assert!(app.resume_url.is_none());
  }

  #[test]
  fn transitions_are_unconstrained() {
    let now = Utc::now();
    let company = Uuid::new_v4();
    let mut app = submitted(now);

    for stage in [Stage::Offered, Stage::Shortlisted, Stage::Shortlisted, Stage::Applied] {
      let change = app.stage_change(stage, company, None, Utc::now());
      assert_eq!(change.stage, stage);
      app.stage_history.push(change);
    }
    assert_eq!(app.stage_history.len(), 5);
  }

  #[test]
  fn history_timestamps_never_go_backwards() {
    let now = Utc::now();
    let mut app = submitted(now);
    let earlier = now - Duration::minutes(5);

    let change = app.stage_change(Stage::Rejected, Uuid::new_v4(), None, earlier);
    assert_eq!(change.changed_at, now);
    app.stage_history.push(change);

    let later = now + Duration::minutes(1);
    let change = app.stage_change(Stage::Interview, Uuid::new_v4(), None, later);
    assert_eq!(change.changed_at, later);
  }

  #[test]
  fn blank_reason_is_dropped() {
    let app = submitted(Utc::now());
    let change =
      app.stage_change(Stage::Rejected, Uuid::new_v4(), Some("   ".into()), Utc::now());
    assert!(change.reason.is_none());
  }

  #[test]
  fn company_cannot_set_withdrawn() {
    let update = StageUpdate { stage: Stage::Withdrawn, reason: None };
    assert!(matches!(update.validate(), Err(Error::Validation(_))));
    let update = StageUpdate { stage: Stage::Applied, reason: None };
    assert!(update.validate().is_ok());
  }

  #[test]
  fn short_cover_letter_is_rejected() {
    let s = Submission {
      job_id:            Uuid::new_v4(),
      cover_letter:      "too short".into(),
      resume_url:        None,
      screening_answers: vec![],
    };
    assert!(matches!(s.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn out_of_range_scores_are_rejected() {
    let review = Review {
      note:   None,
      scores: Some(Scores { aptitude: Some(101), technical: Some(-1), communication: Some(100) }),
    };
    match review.validate() {
      Err(Error::Validation(fields)) => assert_eq!(fields.len(), 2),
      other => panic!("expected validation error, got {other:?}"),
    }
  }

  #[test]
  fn funnel_serialises_stage_keys_lowercase() {
    let mut funnel = Funnel::new();
    funnel.insert(Stage::Shortlisted, 2);
    let json = serde_json::to_string(&funnel).unwrap();
    assert_eq!(json, r#"{"shortlisted":2}"#);
  }
}
