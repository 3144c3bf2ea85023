//! Student profiles: academic record, skills, projects, and links.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  user::StudentSummary,
  validate::{Violations, min_chars, non_blank, within},
};

/// Program recorded on the stub profile created at registration.
pub const UNSPECIFIED_PROGRAM: &str = "Not specified";

/// Years accepted for `graduation_year` on profile edits.
pub const GRADUATION_YEARS: std::ops::RangeInclusive<i32> = 2020..=2030;

/// A portfolio entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  pub title:        String,
  pub description:  Option<String>,
  #[serde(default)]
  pub technologies: Vec<String>,
  pub url:          Option<String>,
}

/// The academic profile owned by exactly one student account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
  pub profile_id:      Uuid,
  pub user_id:         Uuid,
  pub program:         String,
  pub graduation_year: i32,
  /// On a 0–10 scale.
  pub cgpa:            Option<f64>,
  pub skills:          Vec<String>,
  pub projects:        Vec<Project>,
  pub resume_url:      Option<String>,
  pub linkedin_url:    Option<String>,
  pub github_url:      Option<String>,
  pub portfolio_url:   Option<String>,
  /// Derived from the other fields on every write; see
  /// [`StudentProfile::derive_complete`].
  pub is_complete:     bool,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl StudentProfile {
  /// The placeholder profile every student starts with.
  pub fn stub(user_id: Uuid, now: DateTime<Utc>) -> Self {
    Self {
      profile_id: Uuid::new_v4(),
      user_id,
      program: UNSPECIFIED_PROGRAM.to_owned(),
      graduation_year: now.year() + 4,
      cgpa: None,
      skills: Vec::new(),
      projects: Vec::new(),
      resume_url: None,
      linkedin_url: None,
      github_url: None,
      portfolio_url: None,
      is_complete: false,
      created_at: now,
      updated_at: now,
    }
  }

  /// A profile is complete once it names a program, records a CGPA, lists
  /// at least one skill, and links a resume.
  pub fn derive_complete(&self) -> bool {
    let program = self.program.trim();
    !program.is_empty()
      && program != UNSPECIFIED_PROGRAM
      && self.cgpa.is_some()
      && !self.skills.is_empty()
      && self.resume_url.is_some()
  }

  /// Apply a validated patch and refresh the derived flag.
  pub fn apply(&mut self, patch: ProfilePatch, now: DateTime<Utc>) {
    let ProfilePatch {
      program,
      graduation_year,
      cgpa,
      skills,
      projects,
      resume_url,
      linkedin_url,
      github_url,
      portfolio_url,
    } = patch;

    if let Some(program) = program {
      self.program = program.trim().to_owned();
    }
    if let Some(year) = graduation_year {
      self.graduation_year = year;
    }
    if cgpa.is_some() {
      self.cgpa = cgpa;
    }
    if let Some(skills) = skills {
      self.skills = clean_list(skills);
    }
    if let Some(projects) = projects {
      self.projects = projects;
    }
    // Links: a supplied blank string clears the link.
    if let Some(url) = resume_url {
      self.resume_url = non_blank(Some(url));
    }
    if let Some(url) = linkedin_url {
      self.linkedin_url = non_blank(Some(url));
    }
    if let Some(url) = github_url {
      self.github_url = non_blank(Some(url));
    }
    if let Some(url) = portfolio_url {
      self.portfolio_url = non_blank(Some(url));
    }

    self.is_complete = self.derive_complete();
    self.updated_at = now;
  }
}

/// Trim entries, drop blanks, and de-duplicate while keeping order.
pub(crate) fn clean_list(items: Vec<String>) -> Vec<String> {
  let mut out: Vec<String> = Vec::with_capacity(items.len());
  for item in items {
    let item = item.trim();
    if !item.is_empty() && !out.iter().any(|s| s == item) {
      out.push(item.to_owned());
    }
  }
  out
}

/// The fields a student may change on their own profile. Unknown keys are
/// rejected at deserialisation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePatch {
  pub program:         Option<String>,
  pub graduation_year: Option<i32>,
  pub cgpa:            Option<f64>,
  pub skills:          Option<Vec<String>>,
  pub projects:        Option<Vec<Project>>,
  pub resume_url:      Option<String>,
  pub linkedin_url:    Option<String>,
  pub github_url:      Option<String>,
  pub portfolio_url:   Option<String>,
}

impl ProfilePatch {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::new();
    v.check(
      self.program.as_deref().is_none_or(|p| min_chars(p, 2)),
      "program",
      "Program must be at least 2 characters",
    )
    .check(
      self
        .graduation_year
        .is_none_or(|y| GRADUATION_YEARS.contains(&y)),
      "graduation_year",
      "Graduation year must be between 2020 and 2030",
    )
    .check(
      within(self.cgpa, 0.0, 10.0),
      "cgpa",
      "CGPA must be between 0 and 10",
    );
    if let Some(projects) = &self.projects {
      v.check(
        projects.iter().all(|p| !p.title.trim().is_empty()),
        "projects",
        "Every project needs a title",
      );
    }
    v.finish()
  }
}

/// A profile together with the account it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileWithStudent {
  #[serde(flatten)]
  pub profile: StudentProfile,
  pub student: StudentSummary,
}

/// Filters for the admin profile directory.
#[derive(Debug, Clone, Default)]
pub struct ProfileQuery {
  pub department:      Option<String>,
  pub graduation_year: Option<i32>,
  /// Matches profiles listing any of these skills.
  pub skills:          Vec<String>,
}
