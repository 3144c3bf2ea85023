//! Job postings, their eligibility predicate, and the posting lifecycle.
//!
//! A posting moves between `draft`, `open`, and `closed` freely at its
//! owner's request. It accepts applications only while `open` and strictly
//! before its deadline; both conditions are re-checked at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  profile::clean_list,
  validate::{Violations, min_chars, within},
};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum JobStatus {
  #[default]
  Open,
  Closed,
  Draft,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum JobType {
  Internship,
  FullTime,
  PartTime,
}

// ─── Eligibility predicate ───────────────────────────────────────────────────

/// Conditions a student must satisfy to apply.
///
/// Only `min_cgpa` and `graduation_years` are evaluated (see
/// [`crate::eligibility::evaluate`]); `departments` and
/// `verification_required` are informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Eligibility {
  pub min_cgpa:              Option<f64>,
  /// Empty means any year.
  pub graduation_years:      Vec<i32>,
  pub departments:           Vec<String>,
  pub verification_required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningQuestion {
  pub question: String,
  #[serde(default)]
  pub required: bool,
}

// ─── Job ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  pub job_id:              Uuid,
  /// The owning company account.
  pub company_id:          Uuid,
  pub title:               String,
  pub description:         String,
  /// Display name of the hiring company.
  pub company:             String,
  pub skills:              Vec<String>,
  pub eligibility:         Eligibility,
  pub location:            String,
  pub is_remote:           bool,
  pub job_type:            JobType,
  pub stipend:             Option<f64>,
  pub salary:              Option<f64>,
  pub deadline:            DateTime<Utc>,
  pub status:              JobStatus,
  pub max_applications:    Option<u32>,
  pub screening_questions: Vec<ScreeningQuestion>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl Job {
  /// Whether a submission made at `now` may proceed.
  pub fn accepts_applications(&self, now: DateTime<Utc>) -> Result<()> {
    if self.status != JobStatus::Open {
      return Err(Error::JobNotOpen(self.status));
    }
    if self.deadline <= now {
      return Err(Error::DeadlinePassed);
    }
    Ok(())
  }

  /// Apply a validated patch. Only the fields present in the patch change.
  pub fn apply(&mut self, patch: JobPatch, now: DateTime<Utc>) {
    let JobPatch {
      title,
      description,
      company,
      skills,
      eligibility,
      location,
      is_remote,
      job_type,
      stipend,
      salary,
      deadline,
      status,
      max_applications,
      screening_questions,
    } = patch;

    if let Some(v) = title {
      self.title = v.trim().to_owned();
    }
    if let Some(v) = description {
      self.description = v.trim().to_owned();
    }
    if let Some(v) = company {
      self.company = v.trim().to_owned();
    }
    if let Some(v) = skills {
      self.skills = clean_list(v);
    }
    if let Some(v) = eligibility {
      self.eligibility = v;
    }
    if let Some(v) = location {
      self.location = v.trim().to_owned();
    }
    if let Some(v) = is_remote {
      self.is_remote = v;
    }
    if let Some(v) = job_type {
      self.job_type = v;
    }
    if stipend.is_some() {
      self.stipend = stipend;
    }
    if salary.is_some() {
      self.salary = salary;
    }
    if let Some(v) = deadline {
      self.deadline = v;
    }
    if let Some(v) = status {
      self.status = v;
    }
    if max_applications.is_some() {
      self.max_applications = max_applications;
    }
    if let Some(v) = screening_questions {
      self.screening_questions = v;
    }
    self.updated_at = now;
  }
}

/// A company's own posting together with how many applications it holds.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyJob {
  #[serde(flatten)]
  pub job:               Job,
  pub application_count: u64,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Payload for creating a posting.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
  pub title:               String,
  pub description:         String,
  pub company:             String,
  pub skills:              Vec<String>,
  #[serde(default)]
  pub eligibility:         Eligibility,
  pub location:            String,
  #[serde(default)]
  pub is_remote:           bool,
  pub job_type:            JobType,
  pub stipend:             Option<f64>,
  pub salary:              Option<f64>,
  pub deadline:            DateTime<Utc>,
  #[serde(default)]
  pub status:              JobStatus,
  pub max_applications:    Option<u32>,
  #[serde(default)]
  pub screening_questions: Vec<ScreeningQuestion>,
}

impl NewJob {
  pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
    let mut v = Violations::new();
    check_title(&mut v, &self.title);
    check_description(&mut v, &self.description);
    check_company(&mut v, &self.company);
    check_skills(&mut v, &self.skills);
    check_location(&mut v, &self.location);
    check_deadline(&mut v, self.deadline, now);
    check_eligibility(&mut v, &self.eligibility);
    check_money(&mut v, self.stipend, self.salary);
    v.finish()
  }

  pub fn into_job(self, company_id: Uuid, now: DateTime<Utc>) -> Job {
    Job {
      job_id: Uuid::new_v4(),
      company_id,
      title: self.title.trim().to_owned(),
      description: self.description.trim().to_owned(),
      company: self.company.trim().to_owned(),
      skills: clean_list(self.skills),
      eligibility: self.eligibility,
      location: self.location.trim().to_owned(),
      is_remote: self.is_remote,
      job_type: self.job_type,
      stipend: self.stipend,
      salary: self.salary,
      deadline: self.deadline,
      status: self.status,
      max_applications: self.max_applications,
      screening_questions: self.screening_questions,
      created_at: now,
      updated_at: now,
    }
  }
}

/// The fields an owning company may change. Unknown keys are rejected at
/// deserialisation; ownership and identity fields are not listed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobPatch {
  pub title:               Option<String>,
  pub description:         Option<String>,
  pub company:             Option<String>,
  pub skills:              Option<Vec<String>>,
  pub eligibility:         Option<Eligibility>,
  pub location:            Option<String>,
  pub is_remote:           Option<bool>,
  pub job_type:            Option<JobType>,
  pub stipend:             Option<f64>,
  pub salary:              Option<f64>,
  pub deadline:            Option<DateTime<Utc>>,
  pub status:              Option<JobStatus>,
  pub max_applications:    Option<u32>,
  pub screening_questions: Option<Vec<ScreeningQuestion>>,
}

impl JobPatch {
  pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
    let mut v = Violations::new();
    if let Some(t) = &self.title {
      check_title(&mut v, t);
    }
    if let Some(d) = &self.description {
      check_description(&mut v, d);
    }
    if let Some(c) = &self.company {
      check_company(&mut v, c);
    }
    if let Some(s) = &self.skills {
      check_skills(&mut v, s);
    }
    if let Some(l) = &self.location {
      check_location(&mut v, l);
    }
    if let Some(d) = self.deadline {
      check_deadline(&mut v, d, now);
    }
    if let Some(e) = &self.eligibility {
      check_eligibility(&mut v, e);
    }
    check_money(&mut v, self.stipend, self.salary);
    v.finish()
  }
}

fn check_title(v: &mut Violations, title: &str) {
  v.check(min_chars(title, 3), "title", "Title must be at least 3 characters");
}

fn check_description(v: &mut Violations, description: &str) {
  v.check(
    min_chars(description, 10),
    "description",
    "Description must be at least 10 characters",
  );
}

fn check_company(v: &mut Violations, company: &str) {
  v.check(min_chars(company, 2), "company", "Company name is required");
}

fn check_skills(v: &mut Violations, skills: &[String]) {
  v.check(
    skills.iter().any(|s| !s.trim().is_empty()),
    "skills",
    "At least one skill is required",
  );
}

fn check_location(v: &mut Violations, location: &str) {
  v.check(!location.trim().is_empty(), "location", "Location is required");
}

fn check_deadline(v: &mut Violations, deadline: DateTime<Utc>, now: DateTime<Utc>) {
  v.check(deadline > now, "deadline", "Deadline must be in the future");
}

fn check_eligibility(v: &mut Violations, e: &Eligibility) {
  v.check(
    within(e.min_cgpa, 0.0, 10.0),
    "eligibility.min_cgpa",
    "Minimum CGPA must be between 0 and 10",
  );
}

fn check_money(v: &mut Violations, stipend: Option<f64>, salary: Option<f64>) {
  v.check(
    stipend.is_none_or(|s| s >= 0.0),
    "stipend",
    "Stipend cannot be negative",
  )
  .check(
    salary.is_none_or(|s| s >= 0.0),
    "salary",
    "Salary cannot be negative",
  );
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Filters for the public job board. Only open postings whose deadline has
/// not passed are ever returned.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
  /// Case-insensitive match over title, company, and description.
  pub search:   Option<String>,
  /// Matches postings requiring any of these skills.
  pub skills:   Vec<String>,
  /// Case-insensitive substring of the location.
  pub location: Option<String>,
  pub job_type: Option<JobType>,
}
