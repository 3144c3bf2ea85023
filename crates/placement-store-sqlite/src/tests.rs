//! Integration tests for `SqliteStore` against an in-memory database, both
//! directly and through the `Portal` services.

use std::sync::Arc;

use chrono::{Duration, Utc};
use placement_core::{
  Actor, Error, Portal, Role,
  application::{
    Review, Scores, Stage, StageChange, StageUpdate, Submission, Withdrawal,
  },
  eligibility::Ineligible,
  job::{Eligibility, JobPatch, JobQuery, JobStatus, JobType, NewJob},
  page::PageRequest,
  profile::{ProfilePatch, ProfileQuery, StudentProfile},
  stats::FunnelFilter,
  store::{Guarded, Inserted, JobDeletion, PortalStore},
  user::{Credentials, Registration, StatusChange, User, UserQuery},
};
use uuid::Uuid;

use crate::SqliteStore;

const COVER_LETTER: &str = "I have built several backend services in Rust \
  and would love to bring that experience to your team.";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn portal(s: &SqliteStore) -> Portal<SqliteStore> { Portal::new(Arc::new(s.clone())) }

/// Insert an account directly, skipping password hashing.
async fn add_user(s: &SqliteStore, role: Role, department: Option<&str>) -> User {
  let now = Utc::now();
  let user_id = Uuid::new_v4();
  let user = User {
    user_id,
    name: format!("{role} {}", &user_id.simple().to_string()[..6]),
    email: format!("{}@campus.test", user_id.simple()),
    password_hash: "unused".into(),
    role,
    department: department.map(str::to_owned),
    company_name: (role == Role::Company).then(|| "Acme Corp".to_owned()),
    is_active: true,
    created_at: now,
  };
  let profile = (role == Role::Student).then(|| StudentProfile::stub(user_id, now));
  match s.register_user(user, profile).await.unwrap() {
    Inserted::Created(u) => u,
    Inserted::Duplicate => panic!("fresh email reported as duplicate"),
  }
}

/// A student whose profile is complete.
async fn ready_student(
  s: &SqliteStore,
  department: &str,
  cgpa: f64,
  graduation_year: i32,
) -> Actor {
  let actor = add_user(s, Role::Student, Some(department)).await.actor();
  portal(s)
    .update_my_profile(&actor, ProfilePatch {
      program: Some("B.Tech Computer Science".into()),
      graduation_year: Some(graduation_year),
      cgpa: Some(cgpa),
      skills: Some(vec!["Rust".into(), "SQL".into()]),
      resume_url: Some("https://cv.example/resume.pdf".into()),
      ..ProfilePatch::default()
    })
    .await
    .unwrap();
  actor
}

fn posting(title: &str) -> NewJob {
  NewJob {
    title:               title.into(),
    description:         "Work on production systems with a small team.".into(),
    company:             "Acme Corp".into(),
    skills:              vec!["Rust".into(), "SQL".into()],
    eligibility:         Eligibility::default(),
    location:            "Pune".into(),
    is_remote:           false,
    job_type:            JobType::Internship,
    stipend:             Some(15000.0),
    salary:              None,
    deadline:            Utc::now() + Duration::days(14),
    status:              JobStatus::Open,
    max_applications:    None,
    screening_questions: vec![],
  }
}

fn submission(job_id: Uuid) -> Submission {
  Submission {
    job_id,
    cover_letter: COVER_LETTER.into(),
    resume_url: None,
    screening_answers: vec![],
  }
}

fn page(limit: u32) -> PageRequest { PageRequest::fixed(None, limit).unwrap() }

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_email_is_reported_not_written() {
  let s = store().await;
  let first = add_user(&s, Role::Company, None).await;

  let mut clash = first.clone();
  clash.user_id = Uuid::new_v4();
  let outcome = s.register_user(clash, None).await.unwrap();
  assert!(matches!(outcome, Inserted::Duplicate));

  let (users, total) = s.list_users(&UserQuery::default(), page(20)).await.unwrap();
  assert_eq!(total, 1);
  assert_eq!(users[0].user_id, first.user_id);
}

#[tokio::test]
async fn student_registration_creates_stub_profile() {
  let s = store().await;
  let student = add_user(&s, Role::Student, Some("CSE")).await;
  let company = add_user(&s, Role::Company, None).await;

  let profile = s.get_profile_for_user(student.user_id).await.unwrap().unwrap();
  assert_eq!(profile.program, "Not specified");
  assert!(!profile.is_complete);
  assert!(s.get_profile_for_user(company.user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn user_round_trips_and_is_found_by_email() {
  let s = store().await;
  let user = add_user(&s, Role::Student, Some("ECE")).await;

  let by_id = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(by_id.email, user.email);
  assert_eq!(by_id.created_at, user.created_at);
  assert_eq!(by_id.department.as_deref(), Some("ECE"));

  let by_email = s.find_user_by_email(user.email.clone()).await.unwrap();
  assert_eq!(by_email.map(|u| u.user_id), Some(user.user_id));
  assert!(s.find_user_by_email("nobody@campus.test".into()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_users_filters_and_pages() {
  let s = store().await;
  for _ in 0..3 {
    add_user(&s, Role::Student, Some("CSE")).await;
  }
  add_user(&s, Role::Student, Some("Mechanical")).await;
  add_user(&s, Role::Company, None).await;

  let students = UserQuery { role: Some(Role::Student), ..UserQuery::default() };
  let (rows, total) = s
    .list_users(&students, PageRequest::new(Some(2), Some(3), 20, 100).unwrap())
    .await
    .unwrap();
  assert_eq!(total, 4);
  assert_eq!(rows.len(), 1);

  let cse = UserQuery { department: Some("cse".into()), ..UserQuery::default() };
  let (_, total) = s.list_users(&cse, page(20)).await.unwrap();
  assert_eq!(total, 3);

  let search = UserQuery { search: Some("COMPANY".into()), ..UserQuery::default() };
  let (rows, _) = s.list_users(&search, page(20)).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].role, Role::Company);
}

#[tokio::test]
async fn set_user_active_on_missing_user_is_none() {
  let s = store().await;
  assert!(s.set_user_active(Uuid::new_v4(), false).await.unwrap().is_none());

  let user = add_user(&s, Role::Company, None).await;
  let updated = s.set_user_active(user.user_id, false).await.unwrap().unwrap();
  assert!(!updated.is_active);
}

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn saving_a_profile_keeps_its_identity() {
  let s = store().await;
  let student = add_user(&s, Role::Student, Some("CSE")).await;
  let stub = s.get_profile_for_user(student.user_id).await.unwrap().unwrap();

  let mut fresh = StudentProfile::stub(student.user_id, Utc::now());
  fresh.program = "M.Tech".into();
  let saved = s.save_profile(fresh).await.unwrap();

  assert_eq!(saved.profile_id, stub.profile_id);
  assert_eq!(saved.created_at, stub.created_at);
  assert_eq!(saved.program, "M.Tech");
}

#[tokio::test]
async fn profile_directory_matches_any_skill() {
  let s = store().await;
  let rustacean = ready_student(&s, "CSE", 8.0, 2025).await;
  add_user(&s, Role::Student, Some("CSE")).await;

  let query = ProfileQuery {
    skills: vec!["rust".into(), "Haskell".into()],
    ..ProfileQuery::default()
  };
  let (rows, total) = s.list_profiles(&query, page(20)).await.unwrap();
  assert_eq!(total, 1);
  assert_eq!(rows[0].student.user_id, rustacean.user_id);

  let by_year = ProfileQuery { graduation_year: Some(2025), ..ProfileQuery::default() };
  assert_eq!(s.list_profiles(&by_year, page(20)).await.unwrap().1, 1);
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn job_round_trips() {
  let s = store().await;
  let company = add_user(&s, Role::Company, None).await;

  let mut input = posting("Backend Intern");
  input.eligibility = Eligibility {
    min_cgpa:              Some(7.5),
    graduation_years:      vec![2025, 2026],
    departments:           vec!["CSE".into()],
    verification_required: true,
  };
  let job = s
    .insert_job(input.into_job(company.user_id, Utc::now()))
    .await
    .unwrap();

  let fetched = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(fetched, job);
}

#[tokio::test]
async fn job_board_lists_only_live_postings() {
  let s = store().await;
  let company = add_user(&s, Role::Company, None).await;
  let now = Utc::now();

  let mut open = posting("Rust Backend Intern").into_job(company.user_id, now);
  open.location = "Remote - India".into();
  s.insert_job(open.clone()).await.unwrap();

  let mut closed = posting("Closed Role").into_job(company.user_id, now);
  closed.status = JobStatus::Closed;
  s.insert_job(closed).await.unwrap();

  let mut draft = posting("Draft Role").into_job(company.user_id, now);
  draft.status = JobStatus::Draft;
  s.insert_job(draft).await.unwrap();

  let mut expired = posting("Expired Role").into_job(company.user_id, now);
  expired.deadline = now - Duration::hours(1);
  s.insert_job(expired).await.unwrap();

  let mut full_time = posting("Data Engineer").into_job(company.user_id, now);
  full_time.job_type = JobType::FullTime;
  full_time.skills = vec!["Python".into()];
  s.insert_job(full_time).await.unwrap();

  let all = JobQuery::default();
  let (_, total) = s.list_open_jobs(&all, now, page(10)).await.unwrap();
  assert_eq!(total, 2);

  let search = JobQuery { search: Some("backend".into()), ..JobQuery::default() };
  let (rows, _) = s.list_open_jobs(&search, now, page(10)).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].job_id, open.job_id);

  let skills = JobQuery { skills: vec!["python".into()], ..JobQuery::default() };
  let (rows, _) = s.list_open_jobs(&skills, now, page(10)).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].job_type, JobType::FullTime);

  let location = JobQuery { location: Some("remote".into()), ..JobQuery::default() };
  assert_eq!(s.list_open_jobs(&location, now, page(10)).await.unwrap().1, 1);

  let internships = JobQuery { job_type: Some(JobType::Internship), ..JobQuery::default() };
  assert_eq!(s.list_open_jobs(&internships, now, page(10)).await.unwrap().1, 1);
}

#[tokio::test]
async fn like_wildcards_in_search_are_literal() {
  let s = store().await;
  let company = add_user(&s, Role::Company, None).await;
  s.insert_job(posting("Backend Intern").into_job(company.user_id, Utc::now()))
    .await
    .unwrap();

  let query = JobQuery { search: Some("%".into()), ..JobQuery::default() };
  let (_, total) = s.list_open_jobs(&query, Utc::now(), page(10)).await.unwrap();
  assert_eq!(total, 0);
}

#[tokio::test]
async fn delete_is_refused_while_applications_exist() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;

  let busy = p.create_job(&company, posting("Busy Role")).await.unwrap();
  let idle = p.create_job(&company, posting("Idle Role")).await.unwrap();
  p.submit_application(&student, submission(busy.job_id)).await.unwrap();

  assert_eq!(s.delete_job(busy.job_id).await.unwrap(), JobDeletion::Referenced(1));
  assert!(s.get_job(busy.job_id).await.unwrap().is_some());

  assert_eq!(s.delete_job(idle.job_id).await.unwrap(), JobDeletion::Deleted);
  assert_eq!(s.delete_job(idle.job_id).await.unwrap(), JobDeletion::Missing);

  let err = p.delete_job(&company, busy.job_id).await.unwrap_err();
  assert!(matches!(err, Error::JobHasApplications(1)));
}

#[tokio::test]
async fn company_jobs_carry_application_counts() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let other = add_user(&s, Role::Company, None).await.actor();

  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  p.create_job(&other, posting("Someone Else")).await.unwrap();
  for _ in 0..2 {
    let student = ready_student(&s, "CSE", 8.0, 2025).await;
    p.submit_application(&student, submission(job.job_id)).await.unwrap();
  }

  let mine = p.company_jobs(&company, None, None).await.unwrap();
  assert_eq!(mine.pagination.total, 1);
  assert_eq!(mine.items[0].application_count, 2);

  let closed = p
    .company_jobs(&company, Some(JobStatus::Closed), None)
    .await
    .unwrap();
  assert_eq!(closed.pagination.total, 0);
}

// ─── Applications ────────────────────────────────────────────────────────────

#[tokio::test]
async fn submission_records_initial_history() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();

  let app = p.submit_application(&student, submission(job.job_id)).await.unwrap();
  let stored = s.get_application(app.application_id).await.unwrap().unwrap();

  assert_eq!(stored, app);
  assert_eq!(stored.stage, Stage::Applied);
  assert_eq!(stored.stage_history.len(), 1);
  assert_eq!(stored.stage_history[0].changed_by, student.user_id);
  assert!(s.application_exists(job.job_id, student.user_id).await.unwrap());
}

#[tokio::test]
async fn second_application_to_same_job_is_rejected() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();

  p.submit_application(&student, submission(job.job_id)).await.unwrap();
  let err = p
    .submit_application(&student, submission(job.job_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AlreadyApplied));

  let (_, total) = s
    .list_job_applications(job.job_id, None, page(20))
    .await
    .unwrap();
  assert_eq!(total, 1);
}

#[tokio::test]
async fn concurrent_duplicate_submissions_store_one_application() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();

  let (a, b) = tokio::join!(
    p.submit_application(&student, submission(job.job_id)),
    p.submit_application(&student, submission(job.job_id)),
  );
  let outcomes = [a, b];
  assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(
    outcomes
      .iter()
      .any(|r| matches!(r, Err(Error::AlreadyApplied)))
  );
}

#[tokio::test]
async fn closed_and_expired_jobs_refuse_applications() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;

  let mut input = posting("Closed Role");
  input.status = JobStatus::Closed;
  let closed = p.create_job(&company, input).await.unwrap();
  let err = p
    .submit_application(&student, submission(closed.job_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::JobNotOpen(JobStatus::Closed)));

  let mut expired = posting("Expired Role").into_job(company.user_id, Utc::now());
  expired.deadline = Utc::now() - Duration::minutes(1);
  let expired = s.insert_job(expired).await.unwrap();
  let err = p
    .submit_application(&student, submission(expired.job_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::DeadlinePassed));

  let err = p
    .submit_application(&student, submission(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::JobNotFound(_)));
}

#[tokio::test]
async fn eligibility_is_enforced_on_submission() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();

  let mut input = posting("Selective Role");
  input.eligibility.min_cgpa = Some(7.5);
  input.eligibility.graduation_years = vec![2025];
  let job = p.create_job(&company, input).await.unwrap();

  let low = ready_student(&s, "CSE", 7.0, 2025).await;
  let err = p.submit_application(&low, submission(job.job_id)).await.unwrap_err();
  assert!(matches!(err, Error::NotEligible(Ineligible::Cgpa)));

  let wrong_year = ready_student(&s, "CSE", 9.0, 2026).await;
  let err = p
    .submit_application(&wrong_year, submission(job.job_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotEligible(Ineligible::GraduationYear)));

  let exact = ready_student(&s, "CSE", 7.5, 2025).await;
  assert!(p.submit_application(&exact, submission(job.job_id)).await.is_ok());

  let report = p.check_eligibility(&low, job.job_id).await.unwrap();
  assert!(!report.eligible);
  assert_eq!(report.reason.as_deref(), Some("CGPA requirement not met"));
}

#[tokio::test]
async fn incomplete_profile_cannot_apply() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let job = p.create_job(&company, posting("Open Role")).await.unwrap();

  let student = add_user(&s, Role::Student, Some("CSE")).await.actor();
  let err = p
    .submit_application(&student, submission(job.job_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotEligible(Ineligible::IncompleteProfile)));
  assert!(!s.application_exists(job.job_id, student.user_id).await.unwrap());
}

#[tokio::test]
async fn stage_machine_is_permissive_and_history_append_only() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  let app = p.submit_application(&student, submission(job.job_id)).await.unwrap();

  for stage in [Stage::Offered, Stage::Shortlisted, Stage::Shortlisted, Stage::Rejected] {
    let update = StageUpdate { stage, reason: Some("panel decision".into()) };
    let moved = p
      .transition_stage(&company, app.application_id, update)
      .await
      .unwrap();
    assert_eq!(moved.stage, stage);
  }

  let stored = s.get_application(app.application_id).await.unwrap().unwrap();
  assert_eq!(stored.stage, Stage::Rejected);
  let stages: Vec<_> = stored.stage_history.iter().map(|c| c.stage).collect();
  assert_eq!(stages, [
    Stage::Applied,
    Stage::Offered,
    Stage::Shortlisted,
    Stage::Shortlisted,
    Stage::Rejected,
  ]);
  assert!(
    stored
      .stage_history
      .windows(2)
      .all(|w| w[0].changed_at <= w[1].changed_at)
  );
  assert_eq!(stored.stage_history[1].changed_by, company.user_id);
}

#[tokio::test]
async fn only_the_owning_company_may_review() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let rival = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  let app = p.submit_application(&student, submission(job.job_id)).await.unwrap();

  let update = StageUpdate { stage: Stage::Shortlisted, reason: None };
  let err = p
    .transition_stage(&rival, app.application_id, update)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  let err = p
    .transition_stage(&company, app.application_id, StageUpdate {
      stage:  Stage::Withdrawn,
      reason: None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let err = p
    .update_job(&rival, job.job_id, JobPatch {
      status: Some(JobStatus::Closed),
      ..JobPatch::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::JobNotFound(_)));

  let err = p.get_application(&rival, app.application_id).await.unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
  assert!(p.get_application(&company, app.application_id).await.is_ok());
  assert!(p.get_application(&student, app.application_id).await.is_ok());

  let stored = s.get_application(app.application_id).await.unwrap().unwrap();
  assert_eq!(stored.stage_history.len(), 1);
}

#[tokio::test]
async fn review_appends_notes_and_merges_scores() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  let app = p.submit_application(&student, submission(job.job_id)).await.unwrap();

  p.review_application(&company, app.application_id, Review {
    note:   Some("Strong systems background".into()),
    scores: Some(Scores { aptitude: Some(80), technical: Some(70), communication: None }),
  })
  .await
  .unwrap();
  let reviewed = p
    .review_application(&company, app.application_id, Review {
      note:   Some("Good follow-up call".into()),
      scores: Some(Scores { technical: Some(90), ..Scores::default() }),
    })
    .await
    .unwrap();
  assert_eq!(reviewed.reviewer_notes.len(), 2);

  let stored = s.get_application(app.application_id).await.unwrap().unwrap();
  assert_eq!(stored.scores, Scores {
    aptitude:      Some(80),
    technical:     Some(90),
    communication: None,
  });
  let notes: Vec<_> = stored.reviewer_notes.iter().map(|n| n.note.as_str()).collect();
  assert_eq!(notes, ["Strong systems background", "Good follow-up call"]);
  assert_eq!(stored.stage, Stage::Applied);
}

#[tokio::test]
async fn concurrent_reviews_keep_every_score() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  let id = p
    .submit_application(&student, submission(job.job_id))
    .await
    .unwrap()
    .application_id;

  let scored = |scores: Scores| Review { note: None, scores: Some(scores) };
  for _ in 0..20 {
    p.review_application(
      &company,
      id,
      scored(Scores { aptitude: Some(0), technical: Some(0), communication: None }),
    )
    .await
    .unwrap();

    let (a, b) = tokio::join!(
      p.review_application(
        &company,
        id,
        scored(Scores { aptitude: Some(90), ..Scores::default() }),
      ),
      p.review_application(
        &company,
        id,
        scored(Scores { technical: Some(80), ..Scores::default() }),
      ),
    );
    a.unwrap();
    b.unwrap();

    let stored = s.get_application(id).await.unwrap().unwrap();
    assert_eq!(stored.scores.aptitude, Some(90));
    assert_eq!(stored.scores.technical, Some(80));
  }
}

#[tokio::test]
async fn stale_stage_change_never_precedes_history() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  let id = p
    .submit_application(&student, submission(job.job_id))
    .await
    .unwrap()
    .application_id;

  // Both changes are built from the same read, the earlier one lands last.
  let loaded = s.get_application(id).await.unwrap().unwrap();
  let now = Utc::now();
  let early = loaded.stage_change(Stage::Shortlisted, company.user_id, None, now);
  let late = loaded.stage_change(
    Stage::Interview,
    company.user_id,
    None,
    now + Duration::seconds(5),
  );

  let Guarded::Written(_) = s.append_stage_change(id, late.clone(), None).await.unwrap()
  else {
    panic!("application should exist");
  };
  let Guarded::Written(stored) = s.append_stage_change(id, early, None).await.unwrap()
  else {
    panic!("application should exist");
  };

  assert_eq!(stored.stage, Stage::Shortlisted);
  assert_eq!(stored.stage_history.len(), 3);
  assert!(
    stored
      .stage_history
      .windows(2)
      .all(|w| w[0].changed_at <= w[1].changed_at)
  );
  assert_eq!(stored.stage_history[2].changed_at, late.changed_at);
  assert_eq!(stored.updated_at, late.changed_at);
}

#[tokio::test]
async fn concurrent_withdrawals_append_once() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  let id = p
    .submit_application(&student, submission(job.job_id))
    .await
    .unwrap()
    .application_id;

  let (a, b) = tokio::join!(
    p.withdraw_application(&student, id, Withdrawal::default()),
    p.withdraw_application(&student, id, Withdrawal::default()),
  );
  let outcomes = [a, b];
  assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(
    outcomes
      .iter()
      .any(|r| matches!(r, Err(Error::AlreadyWithdrawn)))
  );

  let stored = s.get_application(id).await.unwrap().unwrap();
  assert_eq!(stored.stage_history.len(), 2);

  let again = stored.stage_change(Stage::Withdrawn, student.user_id, None, Utc::now());
  let outcome = s
    .append_stage_change(id, again, Some(Stage::Withdrawn))
    .await
    .unwrap();
  assert!(matches!(outcome, Guarded::Refused));
  let stored = s.get_application(id).await.unwrap().unwrap();
  assert_eq!(stored.stage_history.len(), 2);
}

#[tokio::test]
async fn writes_to_missing_rows_report_absence() {
  let s = store().await;
  let company = add_user(&s, Role::Company, None).await;

  let ghost = posting("Ghost Role").into_job(company.user_id, Utc::now());
  assert!(s.update_job(ghost).await.unwrap().is_none());

  let change = StageChange {
    stage:      Stage::Rejected,
    changed_by: company.user_id,
    changed_at: Utc::now(),
    reason:     None,
  };
  let outcome = s
    .append_stage_change(Uuid::new_v4(), change, None)
    .await
    .unwrap();
  assert!(matches!(outcome, Guarded::Missing));

  let reviewed = s
    .add_review(Uuid::new_v4(), None, Scores::default(), Utc::now())
    .await
    .unwrap();
  assert!(reviewed.is_none());
}

#[tokio::test]
async fn job_update_rejects_a_past_deadline() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();

  let err = p
    .update_job(&company, job.job_id, JobPatch {
      title: Some("Renamed Role".into()),
      deadline: Some(Utc::now() - Duration::hours(1)),
      ..JobPatch::default()
    })
    .await
    .unwrap_err();
  match err {
    Error::Validation(fields) => assert_eq!(fields[0].field, "deadline"),
    other => panic!("expected validation error, got {other:?}"),
  }

  let stored = s.get_job(job.job_id).await.unwrap().unwrap();
  assert_eq!(stored.title, job.title);
  assert_eq!(stored.deadline, job.deadline);
}

#[tokio::test]
async fn withdrawal_is_student_only_and_once() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let other = ready_student(&s, "CSE", 8.0, 2025).await;
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();
  let app = p.submit_application(&student, submission(job.job_id)).await.unwrap();

  let err = p
    .withdraw_application(&other, app.application_id, Withdrawal::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));

  let withdrawn = p
    .withdraw_application(&student, app.application_id, Withdrawal {
      reason: Some("Accepted another offer".into()),
    })
    .await
    .unwrap();
  assert_eq!(withdrawn.stage, Stage::Withdrawn);

  let err = p
    .withdraw_application(&student, app.application_id, Withdrawal::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AlreadyWithdrawn));

  let stored = s.get_application(app.application_id).await.unwrap().unwrap();
  let last = stored.stage_history.last().unwrap();
  assert_eq!(last.stage, Stage::Withdrawn);
  assert_eq!(last.reason.as_deref(), Some("Accepted another offer"));
  assert_eq!(stored.stage_history.len(), 2);
}

#[tokio::test]
async fn applicant_lists_carry_stage_counts() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let job = p.create_job(&company, posting("Backend Intern")).await.unwrap();

  let mut ids = Vec::new();
  for _ in 0..3 {
    let student = ready_student(&s, "CSE", 8.0, 2025).await;
    let app = p.submit_application(&student, submission(job.job_id)).await.unwrap();
    ids.push(app.application_id);
  }
  p.transition_stage(&company, ids[0], StageUpdate {
    stage:  Stage::Shortlisted,
    reason: None,
  })
  .await
  .unwrap();

  let listing = p.job_applications(&company, job.job_id, None, None).await.unwrap();
  assert_eq!(listing.page.pagination.total, 3);
  assert_eq!(listing.stage_stats[&Stage::Applied], 2);
  assert_eq!(listing.stage_stats[&Stage::Shortlisted], 1);
  assert!(listing.page.items.iter().all(|a| a.student.department.as_deref() == Some("CSE")));

  let shortlisted = p
    .job_applications(&company, job.job_id, Some(Stage::Shortlisted), None)
    .await
    .unwrap();
  assert_eq!(shortlisted.page.items.len(), 1);
  assert_eq!(shortlisted.page.items[0].application.application_id, ids[0]);
  assert_eq!(shortlisted.stage_stats.values().sum::<u64>(), 3);
}

#[tokio::test]
async fn student_sees_own_applications_with_job_summary() {
  let s = store().await;
  let p = portal(&s);
  let company = add_user(&s, Role::Company, None).await.actor();
  let student = ready_student(&s, "CSE", 8.0, 2025).await;
  let first = p.create_job(&company, posting("First Role")).await.unwrap();
  let second = p.create_job(&company, posting("Second Role")).await.unwrap();

  p.submit_application(&student, submission(first.job_id)).await.unwrap();
  p.submit_application(&student, submission(second.job_id)).await.unwrap();

  let mine = p.my_applications(&student, None, None).await.unwrap();
  assert_eq!(mine.pagination.total, 2);
  assert_eq!(mine.items[0].job.title, "Second Role");
  assert_eq!(mine.items[1].job.title, "First Role");

  let offered = p.my_applications(&student, Some(Stage::Offered), None).await.unwrap();
  assert!(offered.items.is_empty());
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_login_and_deactivate() {
  let s = store().await;
  let p = portal(&s);
  let admin = add_user(&s, Role::Admin, None).await.actor();

  let user = p
    .register(Registration {
      name:         "Priya Shah".into(),
      email:        "Priya@Campus.test".into(),
      password:     "hunter22".into(),
      role:         Role::Student,
      department:   Some("CSE".into()),
      company_name: None,
    })
    .await
    .unwrap();
  assert_eq!(user.email, "priya@campus.test");
  assert!(s.get_profile_for_user(user.user_id).await.unwrap().is_some());

  let logged_in = p
    .login(Credentials {
      email:    "PRIYA@campus.test".into(),
      password: "hunter22".into(),
    })
    .await
    .unwrap();
  assert_eq!(logged_in.user_id, user.user_id);

  let err = p
    .login(Credentials {
      email:    "priya@campus.test".into(),
      password: "wrong-password".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidCredentials));

  p.set_user_status(&admin, user.user_id, StatusChange { is_active: false })
    .await
    .unwrap();
  let err = p.authenticate(user.user_id).await.unwrap_err();
  assert!(matches!(err, Error::AccountDeactivated));

  let err = p
    .set_user_status(&admin, admin.user_id, StatusChange { is_active: false })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
  let s = store().await;
  let p = portal(&s);
  let existing = add_user(&s, Role::Company, None).await;

  let err = p
    .register(Registration {
      name:         "Copycat".into(),
      email:        existing.email.to_uppercase(),
      password:     "hunter22".into(),
      role:         Role::Company,
      department:   None,
      company_name: Some("Copy Inc".into()),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmailTaken));
}

#[tokio::test]
async fn profile_edits_derive_completeness() {
  let s = store().await;
  let p = portal(&s);
  let student = add_user(&s, Role::Student, Some("CSE")).await.actor();

  let view = p.my_profile(&student).await.unwrap();
  assert!(!view.profile.is_complete);
  assert_eq!(view.student.user_id, student.user_id);

  let view = p
    .update_my_profile(&student, ProfilePatch {
      program: Some("B.Tech".into()),
      cgpa: Some(8.1),
      skills: Some(vec!["Go".into()]),
      resume_url: Some("https://cv.example/r.pdf".into()),
      ..ProfilePatch::default()
    })
    .await
    .unwrap();
  assert!(view.profile.is_complete);

  let err = p
    .update_my_profile(&student, ProfilePatch { cgpa: Some(11.0), ..ProfilePatch::default() })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
  let unchanged = s.get_profile_for_user(student.user_id).await.unwrap().unwrap();
  assert_eq!(unchanged.cgpa, Some(8.1));
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_reports_aggregate_applications() {
  let s = store().await;
  let p = portal(&s);
  let admin = add_user(&s, Role::Admin, None).await.actor();
  let acme = add_user(&s, Role::Company, None).await.actor();
  let globex = add_user(&s, Role::Company, None).await.actor();

  let acme_job = p.create_job(&acme, posting("Acme Role")).await.unwrap();
  let mut input = posting("Globex Role");
  input.skills = vec!["Rust".into(), "Kubernetes".into()];
  let globex_job = p.create_job(&globex, input).await.unwrap();

  let cse_2025 = ready_student(&s, "CSE", 8.0, 2025).await;
  let cse_2026 = ready_student(&s, "CSE", 8.0, 2026).await;
  let ece_2025 = ready_student(&s, "ECE", 8.0, 2025).await;

  let a = p.submit_application(&cse_2025, submission(acme_job.job_id)).await.unwrap();
  p.submit_application(&cse_2026, submission(acme_job.job_id)).await.unwrap();
  p.submit_application(&ece_2025, submission(acme_job.job_id)).await.unwrap();
  p.submit_application(&ece_2025, submission(globex_job.job_id)).await.unwrap();
  p.transition_stage(&acme, a.application_id, StageUpdate {
    stage:  Stage::Offered,
    reason: None,
  })
  .await
  .unwrap();

  let users = p.user_stats(&admin).await.unwrap();
  assert_eq!(users.total, 6);
  assert_eq!(users.by_role[&Role::Student], 3);

  let jobs = p.job_stats(&admin).await.unwrap();
  assert_eq!(jobs.total, 2);
  assert_eq!(jobs.active, 2);
  assert_eq!(jobs.applications, 4);
  assert_eq!(jobs.placement_rate, 25);
  assert_eq!(jobs.skills_demand[0].skill, "Rust");
  assert_eq!(jobs.skills_demand[0].count, 2);
  assert_eq!(jobs.company_stats.len(), 2);

  let analytics = p
    .placement_analytics(&admin, Some(2025), Some("cse".into()))
    .await
    .unwrap();
  assert_eq!(analytics.placement_funnel.values().sum::<u64>(), 1);
  assert_eq!(analytics.placement_funnel[&Stage::Offered], 1);
  assert_eq!(analytics.department_stats.len(), 2);

  let companies = p.company_analytics(&admin).await.unwrap();
  assert_eq!(companies[0].company_id, acme.user_id);
  assert_eq!(companies[0].total_applications, 3);
  assert_eq!(companies[1].total_applications, 1);

  let err = p.job_stats(&acme).await.unwrap_err();
  assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn empty_funnel_has_zero_rate() {
  let s = store().await;
  let p = portal(&s);
  let admin = add_user(&s, Role::Admin, None).await.actor();

  let jobs = p.job_stats(&admin).await.unwrap();
  assert_eq!(jobs.applications, 0);
  assert_eq!(jobs.placement_rate, 0);
  assert!(s.funnel(&FunnelFilter::default()).await.unwrap().is_empty());
}
