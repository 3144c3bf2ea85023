//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so they sort
//! lexicographically. Enumerations are stored by their wire name. Nested
//! structures (eligibility, projects, screening data, skill lists) are
//! compact JSON. UUIDs are hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use placement_core::{
  application::{
    Applicant, Application, JobSummary, ReviewerNote, Scores, StageChange,
    StudentApplication,
  },
  job::{CompanyJob, Job},
  profile::{ProfileWithStudent, StudentProfile},
  user::{StudentSummary, User},
};
use rusqlite::Row;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_enum<T: FromStr>(what: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownVariant {
    what,
    value: s.to_owned(),
  })
}

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Column lists ────────────────────────────────────────────────────────────
//
// Each `Raw*::read` expects its columns in exactly this order, starting at
// the given offset, so joined rows can be read piecewise.

pub const USER_COLUMNS: &str = "u.user_id, u.name, u.email, u.password_hash, \
  u.role, u.department, u.company_name, u.is_active, u.created_at";

pub const STUDENT_COLUMNS: &str = "u.user_id, u.name, u.email, u.department";

pub const PROFILE_COLUMNS: &str = "p.profile_id, p.user_id, p.program, \
  p.graduation_year, p.cgpa, p.skills, p.projects, p.resume_url, \
  p.linkedin_url, p.github_url, p.portfolio_url, p.is_complete, \
  p.created_at, p.updated_at";

pub const JOB_COLUMNS: &str = "j.job_id, j.company_id, j.title, \
  j.description, j.company, j.skills, j.eligibility, j.location, j.is_remote, \
  j.job_type, j.stipend, j.salary, j.deadline, j.status, j.max_applications, \
  j.screening_questions, j.created_at, j.updated_at";

pub const JOB_SUMMARY_COLUMNS: &str =
  "j.job_id, j.title, j.company, j.location, j.job_type, j.deadline";

pub const APPLICATION_COLUMNS: &str = "a.application_id, a.job_id, \
  a.student_id, a.cover_letter, a.resume_url, a.screening_answers, a.stage, \
  a.aptitude, a.technical, a.communication, a.created_at, a.updated_at";

pub const USER_WIDTH: usize = 9;
pub const PROFILE_WIDTH: usize = 14;
pub const JOB_WIDTH: usize = 18;
pub const APPLICATION_WIDTH: usize = 12;

// ─── Users ───────────────────────────────────────────────────────────────────

pub struct RawUser {
  pub user_id:       String,
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub role:          String,
  pub department:    Option<String>,
  pub company_name:  Option<String>,
  pub is_active:     bool,
  pub created_at:    String,
}

impl RawUser {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(at)?,
      name:          row.get(at + 1)?,
      email:         row.get(at + 2)?,
      password_hash: row.get(at + 3)?,
      role:          row.get(at + 4)?,
      department:    row.get(at + 5)?,
      company_name:  row.get(at + 6)?,
      is_active:     row.get(at + 7)?,
      created_at:    row.get(at + 8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      name:          self.name,
      email:         self.email,
      password_hash: self.password_hash,
      role:          decode_enum("role", &self.role)?,
      department:    self.department,
      company_name:  self.company_name,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawStudent {
  pub user_id:    String,
  pub name:       String,
  pub email:      String,
  pub department: Option<String>,
}

impl RawStudent {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(at)?,
      name:       row.get(at + 1)?,
      email:      row.get(at + 2)?,
      department: row.get(at + 3)?,
    })
  }

  pub fn into_summary(self) -> Result<StudentSummary> {
    Ok(StudentSummary {
      user_id:    decode_uuid(&self.user_id)?,
      name:       self.name,
      email:      self.email,
      department: self.department,
    })
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

pub struct RawProfile {
  pub profile_id:      String,
  pub user_id:         String,
  pub program:         String,
  pub graduation_year: i32,
  pub cgpa:            Option<f64>,
  pub skills:          String,
  pub projects:        String,
  pub resume_url:      Option<String>,
  pub linkedin_url:    Option<String>,
  pub github_url:      Option<String>,
  pub portfolio_url:   Option<String>,
  pub is_complete:     bool,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawProfile {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id:      row.get(at)?,
      user_id:         row.get(at + 1)?,
      program:         row.get(at + 2)?,
      graduation_year: row.get(at + 3)?,
      cgpa:            row.get(at + 4)?,
      skills:          row.get(at + 5)?,
      projects:        row.get(at + 6)?,
      resume_url:      row.get(at + 7)?,
      linkedin_url:    row.get(at + 8)?,
      github_url:      row.get(at + 9)?,
      portfolio_url:   row.get(at + 10)?,
      is_complete:     row.get(at + 11)?,
      created_at:      row.get(at + 12)?,
      updated_at:      row.get(at + 13)?,
    })
  }

  pub fn into_profile(self) -> Result<StudentProfile> {
    Ok(StudentProfile {
      profile_id:      decode_uuid(&self.profile_id)?,
      user_id:         decode_uuid(&self.user_id)?,
      program:         self.program,
      graduation_year: self.graduation_year,
      cgpa:            self.cgpa,
      skills:          decode_json(&self.skills)?,
      projects:        decode_json(&self.projects)?,
      resume_url:      self.resume_url,
      linkedin_url:    self.linkedin_url,
      github_url:      self.github_url,
      portfolio_url:   self.portfolio_url,
      is_complete:     self.is_complete,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawProfileWithStudent {
  pub profile: RawProfile,
  pub student: RawStudent,
}

impl RawProfileWithStudent {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      profile: RawProfile::read(row, 0)?,
      student: RawStudent::read(row, PROFILE_WIDTH)?,
    })
  }

  pub fn into_profile_with_student(self) -> Result<ProfileWithStudent> {
    Ok(ProfileWithStudent {
      profile: self.profile.into_profile()?,
      student: self.student.into_summary()?,
    })
  }
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

pub struct RawJob {
  pub job_id:              String,
  pub company_id:          String,
  pub title:               String,
  pub description:         String,
  pub company:             String,
  pub skills:              String,
  pub eligibility:         String,
  pub location:            String,
  pub is_remote:           bool,
  pub job_type:            String,
  pub stipend:             Option<f64>,
  pub salary:              Option<f64>,
  pub deadline:            String,
  pub status:              String,
  pub max_applications:    Option<u32>,
  pub screening_questions: String,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawJob {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      job_id:              row.get(at)?,
      company_id:          row.get(at + 1)?,
      title:               row.get(at + 2)?,
      description:         row.get(at + 3)?,
      company:             row.get(at + 4)?,
      skills:              row.get(at + 5)?,
      eligibility:         row.get(at + 6)?,
      location:            row.get(at + 7)?,
      is_remote:           row.get(at + 8)?,
      job_type:            row.get(at + 9)?,
      stipend:             row.get(at + 10)?,
      salary:              row.get(at + 11)?,
      deadline:            row.get(at + 12)?,
      status:              row.get(at + 13)?,
      max_applications:    row.get(at + 14)?,
      screening_questions: row.get(at + 15)?,
      created_at:          row.get(at + 16)?,
      updated_at:          row.get(at + 17)?,
    })
  }

  pub fn into_job(self) -> Result<Job> {
    Ok(Job {
      job_id:              decode_uuid(&self.job_id)?,
      company_id:          decode_uuid(&self.company_id)?,
      title:               self.title,
      description:         self.description,
      company:             self.company,
      skills:              decode_json(&self.skills)?,
      eligibility:         decode_json(&self.eligibility)?,
      location:            self.location,
      is_remote:           self.is_remote,
      job_type:            decode_enum("job type", &self.job_type)?,
      stipend:             self.stipend,
      salary:              self.salary,
      deadline:            decode_dt(&self.deadline)?,
      status:              decode_enum("job status", &self.status)?,
      max_applications:    self.max_applications,
      screening_questions: decode_json(&self.screening_questions)?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawCompanyJob {
  pub job:               RawJob,
  pub application_count: i64,
}

impl RawCompanyJob {
  pub fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      job:               RawJob::read(row, 0)?,
      application_count: row.get(JOB_WIDTH)?,
    })
  }

  pub fn into_company_job(self) -> Result<CompanyJob> {
    Ok(CompanyJob {
      job:               self.job.into_job()?,
      application_count: self.application_count as u64,
    })
  }
}

pub struct RawJobSummary {
  pub job_id:   String,
  pub title:    String,
  pub company:  String,
  pub location: String,
  pub job_type: String,
  pub deadline: String,
}

impl RawJobSummary {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      job_id:   row.get(at)?,
      title:    row.get(at + 1)?,
      company:  row.get(at + 2)?,
      location: row.get(at + 3)?,
      job_type: row.get(at + 4)?,
      deadline: row.get(at + 5)?,
    })
  }

  pub fn into_summary(self) -> Result<JobSummary> {
    Ok(JobSummary {
      job_id:   decode_uuid(&self.job_id)?,
      title:    self.title,
      company:  self.company,
      location: self.location,
      job_type: decode_enum("job type", &self.job_type)?,
      deadline: decode_dt(&self.deadline)?,
    })
  }
}

// ─── Applications ────────────────────────────────────────────────────────────

pub struct RawStageChange {
  pub stage:      String,
  pub changed_by: String,
  pub changed_at: String,
  pub reason:     Option<String>,
}

impl RawStageChange {
  pub fn into_change(self) -> Result<StageChange> {
    Ok(StageChange {
      stage:      decode_enum("stage", &self.stage)?,
      changed_by: decode_uuid(&self.changed_by)?,
      changed_at: decode_dt(&self.changed_at)?,
      reason:     self.reason,
    })
  }
}

pub struct RawNote {
  pub note:       String,
  pub reviewer:   String,
  pub created_at: String,
}

impl RawNote {
  pub fn into_note(self) -> Result<ReviewerNote> {
    Ok(ReviewerNote {
      note:       self.note,
      reviewer:   decode_uuid(&self.reviewer)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// An `applications` row plus its child rows, which are loaded separately.
pub struct RawApplication {
  pub application_id:    String,
  pub job_id:            String,
  pub student_id:        String,
  pub cover_letter:      String,
  pub resume_url:        Option<String>,
  pub screening_answers: String,
  pub stage:             String,
  pub aptitude:          Option<i32>,
  pub technical:         Option<i32>,
  pub communication:     Option<i32>,
  pub created_at:        String,
  pub updated_at:        String,
  pub history:           Vec<RawStageChange>,
  pub notes:             Vec<RawNote>,
}

impl RawApplication {
  pub fn read(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id:    row.get(at)?,
      job_id:            row.get(at + 1)?,
      student_id:        row.get(at + 2)?,
      cover_letter:      row.get(at + 3)?,
      resume_url:        row.get(at + 4)?,
      screening_answers: row.get(at + 5)?,
      stage:             row.get(at + 6)?,
      aptitude:          row.get(at + 7)?,
      technical:         row.get(at + 8)?,
      communication:     row.get(at + 9)?,
      created_at:        row.get(at + 10)?,
      updated_at:        row.get(at + 11)?,
      history:           Vec::new(),
      notes:             Vec::new(),
    })
  }

  pub fn into_application(self) -> Result<Application> {
    Ok(Application {
      application_id:    decode_uuid(&self.application_id)?,
      job_id:            decode_uuid(&self.job_id)?,
      student_id:        decode_uuid(&self.student_id)?,
      cover_letter:      self.cover_letter,
      resume_url:        self.resume_url,
      screening_answers: decode_json(&self.screening_answers)?,
      stage:             decode_enum("stage", &self.stage)?,
      scores:            Scores {
        aptitude:      self.aptitude,
        technical:     self.technical,
        communication: self.communication,
      },
      reviewer_notes:    self
        .notes
        .into_iter()
        .map(RawNote::into_note)
        .collect::<Result<_>>()?,
      stage_history:     self
        .history
        .into_iter()
        .map(RawStageChange::into_change)
        .collect::<Result<_>>()?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawStudentApplication {
  pub application: RawApplication,
  pub job:         RawJobSummary,
}

impl RawStudentApplication {
  pub fn into_student_application(self) -> Result<StudentApplication> {
    Ok(StudentApplication {
      application: self.application.into_application()?,
      job:         self.job.into_summary()?,
    })
  }
}

pub struct RawApplicant {
  pub application: RawApplication,
  pub student:     RawStudent,
}

impl RawApplicant {
  pub fn into_applicant(self) -> Result<Applicant> {
    Ok(Applicant {
      application: self.application.into_application()?,
      student:     self.student.into_summary()?,
    })
  }
}
