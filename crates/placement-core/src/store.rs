//! The `PortalStore` trait and its supporting result types.
//!
//! The trait is implemented by storage backends (e.g.
//! `placement-store-sqlite`). [`crate::service::Portal`] depends on this
//! abstraction, not on any concrete backend.
//!
//! Invariants a backend must enforce atomically, not by check-then-write:
//!
//! - one application per `(job_id, student_id)` pair;
//! - one account per email;
//! - a job is only deleted when no application references it;
//! - a stage change updates the stage and appends its history entry
//!   together, and its `changed_at` never precedes the stored history;
//! - score updates merge into the stored scores rather than replacing them.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  application::{
    Applicant, Application, Funnel, ReviewerNote, Scores, Stage, StageChange,
    StudentApplication,
  },
  job::{CompanyJob, Job, JobQuery, JobStatus},
  page::PageRequest,
  profile::{ProfileQuery, ProfileWithStudent, StudentProfile},
  stats::{CompanyJobCount, FunnelFilter, GroupedStageCount, SkillDemand},
  user::{Role, User, UserQuery},
};

// ─── Result types ────────────────────────────────────────────────────────────

/// Outcome of an insert guarded by a unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum Inserted<T> {
  Created(T),
  /// The unique key was already taken; nothing was written.
  Duplicate,
}

/// Outcome of a guarded job deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobDeletion {
  Deleted,
  /// Applications still reference the job; nothing was written.
  Referenced(u64),
  Missing,
}

/// Outcome of a conditional write to an existing record.
#[derive(Debug, Clone, PartialEq)]
pub enum Guarded<T> {
  /// The write went through; carries the record as stored.
  Written(T),
  /// The record is already in the state the write excludes; nothing was
  /// written.
  Refused,
  Missing,
}

/// A page of rows plus the total number of matching rows.
pub type Listing<T> = (Vec<T>, u64);

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a placement portal storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PortalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new account, and for students their stub profile, in one
  /// transaction. Returns [`Inserted::Duplicate`] if the email is taken.
  fn register_user(
    &self,
    user: User,
    profile: Option<StudentProfile>,
  ) -> impl Future<Output = Result<Inserted<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look up an account by its (already normalised) email.
  fn find_user_by_email(
    &self,
    email: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Newest accounts first.
  fn list_users<'a>(
    &'a self,
    query: &'a UserQuery,
    page: PageRequest,
  ) -> impl Future<Output = Result<Listing<User>, Self::Error>> + Send + 'a;

  /// Set the active flag and return the updated account, or `None` if it
  /// does not exist.
  fn set_user_active(
    &self,
    id: Uuid,
    active: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Insert or replace the profile keyed by its `user_id`.
  fn save_profile(
    &self,
    profile: StudentProfile,
  ) -> impl Future<Output = Result<StudentProfile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    profile_id: Uuid,
  ) -> impl Future<Output = Result<Option<StudentProfile>, Self::Error>> + Send + '_;

  fn get_profile_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<StudentProfile>, Self::Error>> + Send + '_;

  /// Newest profiles first.
  fn list_profiles<'a>(
    &'a self,
    query: &'a ProfileQuery,
    page: PageRequest,
  ) -> impl Future<Output = Result<Listing<ProfileWithStudent>, Self::Error>>
  + Send
  + 'a;

  // ── Jobs ──────────────────────────────────────────────────────────────

  fn insert_job(
    &self,
    job: Job,
  ) -> impl Future<Output = Result<Job, Self::Error>> + Send + '_;

  fn get_job(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Job>, Self::Error>> + Send + '_;

  /// Overwrite every mutable field of an existing job. `None` if the job no
  /// longer exists.
  fn update_job(
    &self,
    job: Job,
  ) -> impl Future<Output = Result<Option<Job>, Self::Error>> + Send + '_;

  /// Delete a job only if no application references it.
  fn delete_job(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<JobDeletion, Self::Error>> + Send + '_;

  /// Open postings whose deadline is after `now`, newest first.
  fn list_open_jobs<'a>(
    &'a self,
    query: &'a JobQuery,
    now: DateTime<Utc>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Listing<Job>, Self::Error>> + Send + 'a;

  /// A company's own postings, newest first, with application counts.
  fn list_company_jobs(
    &self,
    company_id: Uuid,
    status: Option<JobStatus>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Listing<CompanyJob>, Self::Error>> + Send + '_;

  // ── Applications ──────────────────────────────────────────────────────

  /// Persist a new application with its initial history. Returns
  /// [`Inserted::Duplicate`] if the student already applied to the job.
  fn insert_application(
    &self,
    application: Application,
  ) -> impl Future<Output = Result<Inserted<Application>, Self::Error>> + Send + '_;

  fn application_exists(
    &self,
    job_id: Uuid,
    student_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Fetch an application with its notes and full stage history.
  fn get_application(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  /// Set the stage and append `change` to the history in one transaction,
  /// unless the application already sits in `unless`.
  ///
  /// The stored `changed_at` is raised to the latest existing entry if it
  /// would precede it. Returns the application as stored.
  fn append_stage_change(
    &self,
    id: Uuid,
    change: StageChange,
    unless: Option<Stage>,
  ) -> impl Future<Output = Result<Guarded<Application>, Self::Error>> + Send + '_;

  /// Append `note` (if any) and overwrite the scores present in `scores`,
  /// keeping the stored value for the rest. Returns the application as
  /// stored, or `None` if it does not exist.
  fn add_review(
    &self,
    id: Uuid,
    note: Option<ReviewerNote>,
    scores: Scores,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  /// A student's applications, newest first.
  fn list_student_applications(
    &self,
    student_id: Uuid,
    stage: Option<Stage>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Listing<StudentApplication>, Self::Error>>
  + Send
  + '_;

  /// Applications to one job, newest first.
  fn list_job_applications(
    &self,
    job_id: Uuid,
    stage: Option<Stage>,
    page: PageRequest,
  ) -> impl Future<Output = Result<Listing<Applicant>, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  fn count_active_users_by_role(
    &self,
  ) -> impl Future<Output = Result<Vec<(Role, u64)>, Self::Error>> + Send + '_;

  fn count_jobs_by_status(
    &self,
  ) -> impl Future<Output = Result<Vec<(JobStatus, u64)>, Self::Error>> + Send + '_;

  /// Applications grouped by stage, optionally restricted by `filter`.
  fn funnel<'a>(
    &'a self,
    filter: &'a FunnelFilter,
  ) -> impl Future<Output = Result<Funnel, Self::Error>> + Send + 'a;

  /// The `limit` most requested skills across open postings, most frequent
  /// first.
  fn skill_demand(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<SkillDemand>, Self::Error>> + Send + '_;

  /// The `limit` companies with the most postings.
  fn top_companies_by_jobs(
    &self,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<CompanyJobCount>, Self::Error>> + Send + '_;

  /// Application counts grouped by student department and stage.
  fn department_funnels(
    &self,
  ) -> impl Future<
    Output = Result<Vec<GroupedStageCount<Option<String>>>, Self::Error>,
  > + Send
  + '_;

  /// Application counts grouped by owning company and stage, companies with
  /// the most applications first.
  fn company_funnels(
    &self,
  ) -> impl Future<
    Output = Result<Vec<GroupedStageCount<(Uuid, Option<String>)>>, Self::Error>,
  > + Send
  + '_;
}
