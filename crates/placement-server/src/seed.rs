//! Demo accounts and a sample posting for local development.
//!
//! Seeding is additive: accounts whose email is already registered are left
//! untouched, and anything that depends on them is skipped.

use chrono::{Duration, Utc};
use placement_core::{
  Error, Portal, Role,
  job::{Eligibility, JobStatus, JobType, NewJob},
  profile::{ProfilePatch, Project},
  store::PortalStore,
  user::{Registration, User},
};
use tracing::{info, warn};

pub const ADMIN_EMAIL: &str = "admin@portal.com";
pub const STUDENT_EMAIL: &str = "student@test.com";
pub const COMPANY_EMAIL: &str = "company@test.com";

/// What a seeding run created.
#[derive(Debug, Default)]
pub struct SeedReport {
  pub accounts: Vec<String>,
  pub jobs:     usize,
}

pub async fn seed<S: PortalStore>(portal: &Portal<S>) -> Result<SeedReport, Error> {
  let mut report = SeedReport::default();

  let admin = portal
    .create_admin("System Admin".into(), ADMIN_EMAIL.into(), "admin123".into())
    .await;
  if created(admin, ADMIN_EMAIL)?.is_some() {
    report.accounts.push(format!("Admin: {ADMIN_EMAIL} / admin123"));
  }

  let student = portal
    .register(Registration {
      name:         "John Doe".into(),
      email:        STUDENT_EMAIL.into(),
      password:     "student123".into(),
      role:         Role::Student,
      department:   Some("Computer Science".into()),
      company_name: None,
    })
    .await;
  if let Some(student) = created(student, STUDENT_EMAIL)? {
    portal
      .update_my_profile(&student.actor(), ProfilePatch {
        program: Some("B.Tech Computer Science".into()),
        graduation_year: Some(2025),
        cgpa: Some(8.5),
        skills: Some(vec![
          "JavaScript".into(),
          "React".into(),
          "Node.js".into(),
          "MongoDB".into(),
        ]),
        projects: Some(vec![Project {
          title:        "E-commerce Website".into(),
          description:  Some(
            "Full-stack e-commerce application with React and Node.js".into(),
          ),
          technologies: vec!["React".into(), "Node.js".into(), "MongoDB".into()],
          url:          Some("https://github.com/johndoe/ecommerce".into()),
        }]),
        resume_url: Some("https://example.com/resume.pdf".into()),
        ..ProfilePatch::default()
      })
      .await?;
    report.accounts.push(format!("Student: {STUDENT_EMAIL} / student123"));
  }

  let company = portal
    .register(Registration {
      name:         "Tech Corp".into(),
      email:        COMPANY_EMAIL.into(),
      password:     "company123".into(),
      role:         Role::Company,
      department:   None,
      company_name: Some("Tech Corp Solutions".into()),
    })
    .await;
  if let Some(company) = created(company, COMPANY_EMAIL)? {
    portal
      .create_job(&company.actor(), NewJob {
        title:               "Software Engineering Intern".into(),
        description:         "Build and ship features across our web platform."
          .into(),
        company:             "Tech Corp Solutions".into(),
        skills:              vec!["JavaScript".into(), "React".into()],
        eligibility:         Eligibility {
          min_cgpa: Some(7.0),
          ..Eligibility::default()
        },
        location:            "Bangalore".into(),
        is_remote:           false,
        job_type:            JobType::Internship,
        stipend:             Some(30000.0),
        salary:              None,
        deadline:            Utc::now() + Duration::days(60),
        status:              JobStatus::Open,
        max_applications:    None,
        screening_questions: Vec::new(),
      })
      .await?;
    report.jobs += 1;
    report.accounts.push(format!("Company: {COMPANY_EMAIL} / company123"));
  }

  info!(
    accounts = report.accounts.len(),
    jobs = report.jobs,
    "seed data loaded"
  );
  Ok(report)
}

/// `Some(user)` if the account was created, `None` if it already existed.
fn created(outcome: Result<User, Error>, email: &str) -> Result<Option<User>, Error> {
  match outcome {
    Ok(user) => Ok(Some(user)),
    Err(Error::EmailTaken) => {
      warn!(email, "account already exists, skipping");
      Ok(None)
    }
    Err(e) => Err(e),
  }
}
