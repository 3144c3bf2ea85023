//! [`SqliteStore`]: the SQLite implementation of [`PortalStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use placement_core::{
  application::{
    Applicant, Application, Funnel, ReviewerNote, Scores, Stage, StageChange,
    StudentApplication,
  },
  job::{CompanyJob, Job, JobQuery, JobStatus},
  page::PageRequest,
  profile::{ProfileQuery, ProfileWithStudent, StudentProfile},
  stats::{CompanyJobCount, FunnelFilter, GroupedStageCount, SkillDemand},
  store::{Guarded, Inserted, JobDeletion, Listing, PortalStore},
  user::{Role, User, UserQuery},
};
use rusqlite::{
  Connection, OptionalExtension as _, params, params_from_iter, types::Value,
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    APPLICATION_COLUMNS, APPLICATION_WIDTH, JOB_COLUMNS, JOB_SUMMARY_COLUMNS,
    PROFILE_COLUMNS, RawApplicant, RawApplication, RawCompanyJob, RawJob,
    RawJobSummary, RawNote, RawProfile, RawProfileWithStudent, RawStageChange,
    RawStudent, RawStudentApplication, RawUser, STUDENT_COLUMNS, USER_COLUMNS,
    decode_enum, decode_uuid, encode_dt, encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A placement portal store backed by a single SQLite file.
///
/// Cloning shares the underlying connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Query building ──────────────────────────────────────────────────────────

/// `WHERE` conditions joined with `AND`, plus their positional arguments in
/// placeholder order.
#[derive(Default)]
struct Filter {
  conds: Vec<String>,
  args:  Vec<Value>,
}

impl Filter {
  fn push(&mut self, cond: String, args: impl IntoIterator<Item = Value>) {
    self.conds.push(cond);
    self.args.extend(args);
  }

  fn eq(&mut self, column: &str, value: impl Into<Value>) {
    self.push(format!("{column} = ?"), [value.into()]);
  }

  fn eq_nocase(&mut self, column: &str, value: &str) {
    self.push(format!("{column} = ? COLLATE NOCASE"), [Value::Text(
      value.to_owned(),
    )]);
  }

  /// Case-insensitive substring match against any of `columns`.
  fn contains(&mut self, columns: &[&str], needle: &str) {
    let pattern = like_pattern(needle);
    let cond = columns
      .iter()
      .map(|c| format!("{c} LIKE ? ESCAPE '\\'"))
      .collect::<Vec<_>>()
      .join(" OR ");
    self.push(
      format!("({cond})"),
      columns.iter().map(|_| Value::Text(pattern.clone())),
    );
  }

  /// Rows whose JSON string array in `column` shares an element with
  /// `items`, ignoring case.
  fn any_of(&mut self, column: &str, items: &[String]) {
    let items: Vec<Value> = items
      .iter()
      .map(|s| s.trim().to_lowercase())
      .filter(|s| !s.is_empty())
      .map(Value::Text)
      .collect();
    if items.is_empty() {
      return;
    }
    let marks = vec!["?"; items.len()].join(", ");
    self.push(
      format!(
        "EXISTS (SELECT 1 FROM json_each({column}) \
         WHERE lower(json_each.value) IN ({marks}))"
      ),
      items,
    );
  }

  fn clause(&self) -> String {
    if self.conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.conds.join(" AND "))
    }
  }

  /// The filter arguments followed by `LIMIT` and `OFFSET`.
  fn paged_args(&self, page: PageRequest) -> Vec<Value> {
    let mut args = self.args.clone();
    args.push(Value::Integer(i64::from(page.limit)));
    args.push(Value::Integer(i64::from(page.offset())));
    args
  }
}

fn like_pattern(needle: &str) -> String {
  let escaped = needle
    .trim()
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("%{escaped}%")
}

fn present(s: &Option<String>) -> Option<&str> {
  s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn count(conn: &Connection, from: &str, filter: &Filter) -> rusqlite::Result<u64> {
  let sql = format!("SELECT COUNT(*) {from} {}", filter.clause());
  let n: i64 =
    conn.query_row(&sql, params_from_iter(filter.args.iter()), |r| r.get(0))?;
  Ok(n as u64)
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

/// An application row with its children, or `None` if it does not exist.
fn read_application(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<Option<RawApplication>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications a
         WHERE a.application_id = ?1"
      ),
      params![id],
      |r| RawApplication::read(r, 0),
    )
    .optional()?;
  let Some(mut raw) = raw else {
    return Ok(None);
  };
  load_children(conn, &mut raw)?;
  Ok(Some(raw))
}

/// Fill in an application's stage history and reviewer notes, oldest first.
fn load_children(
  conn: &Connection,
  app: &mut RawApplication,
) -> rusqlite::Result<()> {
  let id = app.application_id.clone();

  let mut stmt = conn.prepare_cached(
    "SELECT stage, changed_by, changed_at, reason FROM stage_history
     WHERE application_id = ?1 ORDER BY entry_id",
  )?;
  app.history = stmt
    .query_map(params![id], |r| {
      Ok(RawStageChange {
        stage:      r.get(0)?,
        changed_by: r.get(1)?,
        changed_at: r.get(2)?,
        reason:     r.get(3)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut stmt = conn.prepare_cached(
    "SELECT note, reviewer, created_at FROM reviewer_notes
     WHERE application_id = ?1 ORDER BY note_id",
  )?;
  app.notes = stmt
    .query_map(params![id], |r| {
      Ok(RawNote {
        note:       r.get(0)?,
        reviewer:   r.get(1)?,
        created_at: r.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(())
}

// ─── Encoded rows ────────────────────────────────────────────────────────────

struct UserRow {
  user_id:       String,
  name:          String,
  email:         String,
  password_hash: String,
  role:          String,
  department:    Option<String>,
  company_name:  Option<String>,
  is_active:     bool,
  created_at:    String,
}

impl UserRow {
  fn encode(u: &User) -> Self {
    Self {
      user_id:       encode_uuid(u.user_id),
      name:          u.name.clone(),
      email:         u.email.clone(),
      password_hash: u.password_hash.clone(),
      role:          u.role.to_string(),
      department:    u.department.clone(),
      company_name:  u.company_name.clone(),
      is_active:     u.is_active,
      created_at:    encode_dt(u.created_at),
    }
  }

  fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO users (
         user_id, name, email, password_hash, role,
         department, company_name, is_active, created_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      params![
        self.user_id,
        self.name,
        self.email,
        self.password_hash,
        self.role,
        self.department,
        self.company_name,
        self.is_active,
        self.created_at,
      ],
    )
  }
}

struct ProfileRow {
  profile_id:      String,
  user_id:         String,
  program:         String,
  graduation_year: i32,
  cgpa:            Option<f64>,
  skills:          String,
  projects:        String,
  resume_url:      Option<String>,
  linkedin_url:    Option<String>,
  github_url:      Option<String>,
  portfolio_url:   Option<String>,
  is_complete:     bool,
  created_at:      String,
  updated_at:      String,
}

impl ProfileRow {
  fn encode(p: &StudentProfile) -> Result<Self> {
    Ok(Self {
      profile_id:      encode_uuid(p.profile_id),
      user_id:         encode_uuid(p.user_id),
      program:         p.program.clone(),
      graduation_year: p.graduation_year,
      cgpa:            p.cgpa,
      skills:          encode_json(&p.skills)?,
      projects:        encode_json(&p.projects)?,
      resume_url:      p.resume_url.clone(),
      linkedin_url:    p.linkedin_url.clone(),
      github_url:      p.github_url.clone(),
      portfolio_url:   p.portfolio_url.clone(),
      is_complete:     p.is_complete,
      created_at:      encode_dt(p.created_at),
      updated_at:      encode_dt(p.updated_at),
    })
  }

  /// Insert, or overwrite the editable columns of the profile owned by the
  /// same user. The original id and creation time are kept.
  fn upsert(&self, conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO profiles (
         profile_id, user_id, program, graduation_year, cgpa, skills,
         projects, resume_url, linkedin_url, github_url, portfolio_url,
         is_complete, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
       ON CONFLICT (user_id) DO UPDATE SET
         program         = excluded.program,
         graduation_year = excluded.graduation_year,
         cgpa            = excluded.cgpa,
         skills          = excluded.skills,
         projects        = excluded.projects,
         resume_url      = excluded.resume_url,
         linkedin_url    = excluded.linkedin_url,
         github_url      = excluded.github_url,
         portfolio_url   = excluded.portfolio_url,
         is_complete     = excluded.is_complete,
         updated_at      = excluded.updated_at",
      params![
        self.profile_id,
        self.user_id,
        self.program,
        self.graduation_year,
        self.cgpa,
        self.skills,
        self.projects,
        self.resume_url,
        self.linkedin_url,
        self.github_url,
        self.portfolio_url,
        self.is_complete,
        self.created_at,
        self.updated_at,
      ],
    )
  }
}

struct JobRow {
  job_id:              String,
  company_id:          String,
  title:               String,
  description:         String,
  company:             String,
  skills:              String,
  eligibility:         String,
  location:            String,
  is_remote:           bool,
  job_type:            String,
  stipend:             Option<f64>,
  salary:              Option<f64>,
  deadline:            String,
  status:              String,
  max_applications:    Option<u32>,
  screening_questions: String,
  created_at:          String,
  updated_at:          String,
}

impl JobRow {
  fn encode(j: &Job) -> Result<Self> {
    Ok(Self {
      job_id:              encode_uuid(j.job_id),
      company_id:          encode_uuid(j.company_id),
      title:               j.title.clone(),
      description:         j.description.clone(),
      company:             j.company.clone(),
      skills:              encode_json(&j.skills)?,
      eligibility:         encode_json(&j.eligibility)?,
      location:            j.location.clone(),
      is_remote:           j.is_remote,
      job_type:            j.job_type.to_string(),
      stipend:             j.stipend,
      salary:              j.salary,
      deadline:            encode_dt(j.deadline),
      status:              j.status.to_string(),
      max_applications:    j.max_applications,
      screening_questions: encode_json(&j.screening_questions)?,
      created_at:          encode_dt(j.created_at),
      updated_at:          encode_dt(j.updated_at),
    })
  }

  fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO jobs (
         job_id, company_id, title, description, company, skills,
         eligibility, location, is_remote, job_type, stipend, salary,
         deadline, status, max_applications, screening_questions,
         created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                 ?15, ?16, ?17, ?18)",
      params![
        self.job_id,
        self.company_id,
        self.title,
        self.description,
        self.company,
        self.skills,
        self.eligibility,
        self.location,
        self.is_remote,
        self.job_type,
        self.stipend,
        self.salary,
        self.deadline,
        self.status,
        self.max_applications,
        self.screening_questions,
        self.created_at,
        self.updated_at,
      ],
    )
  }

  /// Overwrite the mutable columns. Ownership and creation time never
  /// change.
  fn update(&self, conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "UPDATE jobs SET
         title = ?2, description = ?3, company = ?4, skills = ?5,
         eligibility = ?6, location = ?7, is_remote = ?8, job_type = ?9,
         stipend = ?10, salary = ?11, deadline = ?12, status = ?13,
         max_applications = ?14, screening_questions = ?15, updated_at = ?16
       WHERE job_id = ?1",
      params![
        self.job_id,
        self.title,
        self.description,
        self.company,
        self.skills,
        self.eligibility,
        self.location,
        self.is_remote,
        self.job_type,
        self.stipend,
        self.salary,
        self.deadline,
        self.status,
        self.max_applications,
        self.screening_questions,
        self.updated_at,
      ],
    )
  }
}

struct HistoryRow {
  stage:      String,
  changed_by: String,
  changed_at: String,
  reason:     Option<String>,
}

impl HistoryRow {
  fn encode(c: &StageChange) -> Self {
    Self {
      stage:      c.stage.to_string(),
      changed_by: encode_uuid(c.changed_by),
      changed_at: encode_dt(c.changed_at),
      reason:     c.reason.clone(),
    }
  }

  fn insert(&self, conn: &Connection, application_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO stage_history (application_id, stage, changed_by, changed_at, reason)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      params![
        application_id,
        self.stage,
        self.changed_by,
        self.changed_at,
        self.reason,
      ],
    )
  }
}

struct NoteRow {
  note:       String,
  reviewer:   String,
  created_at: String,
}

impl NoteRow {
  fn encode(n: &ReviewerNote) -> Self {
    Self {
      note:       n.note.clone(),
      reviewer:   encode_uuid(n.reviewer),
      created_at: encode_dt(n.created_at),
    }
  }

  fn insert(&self, conn: &Connection, application_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO reviewer_notes (application_id, note, reviewer, created_at)
       VALUES (?1, ?2, ?3, ?4)",
      params![application_id, self.note, self.reviewer, self.created_at],
    )
  }
}

struct ApplicationRow {
  application_id:    String,
  job_id:            String,
  student_id:        String,
  cover_letter:      String,
  resume_url:        Option<String>,
  screening_answers: String,
  stage:             String,
  scores:            Scores,
  created_at:        String,
  updated_at:        String,
  history:           Vec<HistoryRow>,
  notes:             Vec<NoteRow>,
}

impl ApplicationRow {
  fn encode(a: &Application) -> Result<Self> {
    Ok(Self {
      application_id:    encode_uuid(a.application_id),
      job_id:            encode_uuid(a.job_id),
      student_id:        encode_uuid(a.student_id),
      cover_letter:      a.cover_letter.clone(),
      resume_url:        a.resume_url.clone(),
      screening_answers: encode_json(&a.screening_answers)?,
      stage:             a.stage.to_string(),
      scores:            a.scores,
      created_at:        encode_dt(a.created_at),
      updated_at:        encode_dt(a.updated_at),
      history:           a.stage_history.iter().map(HistoryRow::encode).collect(),
      notes:             a.reviewer_notes.iter().map(NoteRow::encode).collect(),
    })
  }

  fn insert(&self, conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO applications (
         application_id, job_id, student_id, cover_letter, resume_url,
         screening_answers, stage, aptitude, technical, communication,
         created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
      params![
        self.application_id,
        self.job_id,
        self.student_id,
        self.cover_letter,
        self.resume_url,
        self.screening_answers,
        self.stage,
        self.scores.aptitude,
        self.scores.technical,
        self.scores.communication,
        self.created_at,
        self.updated_at,
      ],
    )
  }
}

// ─── PortalStore impl ────────────────────────────────────────────────────────

impl PortalStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn register_user(
    &self,
    user: User,
    profile: Option<StudentProfile>,
  ) -> Result<Inserted<User>> {
    let user_row = UserRow::encode(&user);
    let profile_row = profile.as_ref().map(ProfileRow::encode).transpose()?;

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Err(e) = user_row.insert(&tx) {
          return if is_unique_violation(&e) { Ok(false) } else { Err(e.into()) };
        }
        if let Some(p) = profile_row {
          p.upsert(&tx)?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if created { Inserted::Created(user) } else { Inserted::Duplicate })
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = ?1"),
            params![id_str],
            |row| RawUser::read(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_email(&self, email: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1"),
            params![email],
            |row| RawUser::read(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(
    &self,
    query: &UserQuery,
    page: PageRequest,
  ) -> Result<Listing<User>> {
    let mut filter = Filter::default();
    if let Some(role) = query.role {
      filter.eq("u.role", role.to_string());
    }
    if let Some(department) = present(&query.department) {
      filter.eq_nocase("u.department", department);
    }
    if let Some(search) = present(&query.search) {
      filter.contains(&["u.name", "u.email"], search);
    }

    let (raws, total): (Vec<RawUser>, u64) = self
      .conn
      .call(move |conn| {
        let total = count(conn, "FROM users u", &filter)?;
        let sql = format!(
          "SELECT {USER_COLUMNS} FROM users u {}
           ORDER BY u.created_at DESC, u.user_id
           LIMIT ? OFFSET ?",
          filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(filter.paged_args(page)), |row| {
            RawUser::read(row, 0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let users = raws
      .into_iter()
      .map(RawUser::into_user)
      .collect::<Result<_>>()?;
    Ok((users, total))
  }

  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE users SET is_active = ?2 WHERE user_id = ?1",
          params![id_str, active],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = ?1"),
            params![id_str],
            |row| RawUser::read(row, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn save_profile(&self, profile: StudentProfile) -> Result<StudentProfile> {
    let row = ProfileRow::encode(&profile)?;

    let raw: RawProfile = self
      .conn
      .call(move |conn| {
        row.upsert(conn)?;
        Ok(conn.query_row(
          &format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.user_id = ?1"),
          params![row.user_id],
          |r| RawProfile::read(r, 0),
        )?)
      })
      .await?;

    raw.into_profile()
  }

  async fn get_profile(&self, profile_id: Uuid) -> Result<Option<StudentProfile>> {
    let id_str = encode_uuid(profile_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.profile_id = ?1"
            ),
            params![id_str],
            |r| RawProfile::read(r, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn get_profile_for_user(
    &self,
    user_id: Uuid,
  ) -> Result<Option<StudentProfile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles p WHERE p.user_id = ?1"),
            params![id_str],
            |r| RawProfile::read(r, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(
    &self,
    query: &ProfileQuery,
    page: PageRequest,
  ) -> Result<Listing<ProfileWithStudent>> {
    let mut filter = Filter::default();
    if let Some(department) = present(&query.department) {
      filter.eq_nocase("u.department", department);
    }
    if let Some(year) = query.graduation_year {
      filter.eq("p.graduation_year", year);
    }
    filter.any_of("p.skills", &query.skills);

    let (raws, total): (Vec<RawProfileWithStudent>, u64) = self
      .conn
      .call(move |conn| {
        let from = "FROM profiles p JOIN users u ON u.user_id = p.user_id";
        let total = count(conn, from, &filter)?;
        let sql = format!(
          "SELECT {PROFILE_COLUMNS}, {STUDENT_COLUMNS} {from} {}
           ORDER BY p.created_at DESC, p.profile_id
           LIMIT ? OFFSET ?",
          filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            params_from_iter(filter.paged_args(page)),
            RawProfileWithStudent::read,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let profiles = raws
      .into_iter()
      .map(RawProfileWithStudent::into_profile_with_student)
      .collect::<Result<_>>()?;
    Ok((profiles, total))
  }

  // ── Jobs ──────────────────────────────────────────────────────────────────

  async fn insert_job(&self, job: Job) -> Result<Job> {
    let row = JobRow::encode(&job)?;
    self
      .conn
      .call(move |conn| {
        row.insert(conn)?;
        Ok(())
      })
      .await?;
    Ok(job)
  }

  async fn get_job(&self, id: Uuid) -> Result<Option<Job>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {JOB_COLUMNS} FROM jobs j WHERE j.job_id = ?1"),
            params![id_str],
            |r| RawJob::read(r, 0),
          )
          .optional()?)
      })
      .await?;

    raw.map(RawJob::into_job).transpose()
  }

  async fn update_job(&self, job: Job) -> Result<Option<Job>> {
    let row = JobRow::encode(&job)?;
    let changed = self.conn.call(move |conn| Ok(row.update(conn)?)).await?;
    Ok((changed > 0).then_some(job))
  }

  async fn delete_job(&self, id: Uuid) -> Result<JobDeletion> {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let deleted = conn.execute(
          "DELETE FROM jobs WHERE job_id = ?1
             AND NOT EXISTS (SELECT 1 FROM applications WHERE job_id = ?1)",
          params![id_str],
        )?;
        if deleted > 0 {
          return Ok(JobDeletion::Deleted);
        }

        let exists = conn
          .query_row(
            "SELECT 1 FROM jobs WHERE job_id = ?1",
            params![id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(JobDeletion::Missing);
        }

        let n: i64 = conn.query_row(
          "SELECT COUNT(*) FROM applications WHERE job_id = ?1",
          params![id_str],
          |r| r.get(0),
        )?;
        Ok(JobDeletion::Referenced(n as u64))
      })
      .await?;

    Ok(outcome)
  }

  async fn list_open_jobs(
    &self,
    query: &JobQuery,
    now: DateTime<Utc>,
    page: PageRequest,
  ) -> Result<Listing<Job>> {
    let mut filter = Filter::default();
    filter.eq("j.status", JobStatus::Open.to_string());
    filter.push("j.deadline > ?".into(), [Value::Text(encode_dt(now))]);
    if let Some(search) = present(&query.search) {
      filter.contains(&["j.title", "j.company", "j.description"], search);
    }
    if let Some(location) = present(&query.location) {
      filter.contains(&["j.location"], location);
    }
    if let Some(job_type) = query.job_type {
      filter.eq("j.job_type", job_type.to_string());
    }
    filter.any_of("j.skills", &query.skills);

    let (raws, total): (Vec<RawJob>, u64) = self
      .conn
      .call(move |conn| {
        let total = count(conn, "FROM jobs j", &filter)?;
        let sql = format!(
          "SELECT {JOB_COLUMNS} FROM jobs j {}
           ORDER BY j.created_at DESC, j.job_id
           LIMIT ? OFFSET ?",
          filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(filter.paged_args(page)), |r| {
            RawJob::read(r, 0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let jobs = raws
      .into_iter()
      .map(RawJob::into_job)
      .collect::<Result<_>>()?;
    Ok((jobs, total))
  }

  async fn list_company_jobs(
    &self,
    company_id: Uuid,
    status: Option<JobStatus>,
    page: PageRequest,
  ) -> Result<Listing<CompanyJob>> {
    let mut filter = Filter::default();
    filter.eq("j.company_id", encode_uuid(company_id));
    if let Some(status) = status {
      filter.eq("j.status", status.to_string());
    }

    let (raws, total): (Vec<RawCompanyJob>, u64) = self
      .conn
      .call(move |conn| {
        let total = count(conn, "FROM jobs j", &filter)?;
        let sql = format!(
          "SELECT {JOB_COLUMNS},
             (SELECT COUNT(*) FROM applications a WHERE a.job_id = j.job_id)
           FROM jobs j {}
           ORDER BY j.created_at DESC, j.job_id
           LIMIT ? OFFSET ?",
          filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(filter.paged_args(page)), RawCompanyJob::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((rows, total))
      })
      .await?;

    let jobs = raws
      .into_iter()
      .map(RawCompanyJob::into_company_job)
      .collect::<Result<_>>()?;
    Ok((jobs, total))
  }

  // ── Applications ──────────────────────────────────────────────────────────

  async fn insert_application(
    &self,
    application: Application,
  ) -> Result<Inserted<Application>> {
    let row = ApplicationRow::encode(&application)?;

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Err(e) = row.insert(&tx) {
          return if is_unique_violation(&e) { Ok(false) } else { Err(e.into()) };
        }
        for entry in &row.history {
          entry.insert(&tx, &row.application_id)?;
        }
        for note in &row.notes {
          note.insert(&tx, &row.application_id)?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if created {
      Inserted::Created(application)
    } else {
      Inserted::Duplicate
    })
  }

  async fn application_exists(&self, job_id: Uuid, student_id: Uuid) -> Result<bool> {
    let job_str = encode_uuid(job_id);
    let student_str = encode_uuid(student_id);

    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM applications WHERE job_id = ?1 AND student_id = ?2",
            params![job_str, student_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some())
      })
      .await?;

    Ok(exists)
  }

  async fn get_application(&self, id: Uuid) -> Result<Option<Application>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| Ok(read_application(conn, &id_str)?))
      .await?;

    raw.map(RawApplication::into_application).transpose()
  }

  async fn append_stage_change(
    &self,
    id: Uuid,
    change: StageChange,
    unless: Option<Stage>,
  ) -> Result<Guarded<Application>> {
    let id_str = encode_uuid(id);
    let mut entry = HistoryRow::encode(&change);
    let unless = unless.map(|stage| stage.to_string());

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE applications SET stage = ?2
           WHERE application_id = ?1 AND (?3 IS NULL OR stage <> ?3)",
          params![id_str, entry.stage, unless],
        )?;
        if changed == 0 {
          let exists = tx
            .query_row(
              "SELECT 1 FROM applications WHERE application_id = ?1",
              params![id_str],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          return Ok(if exists { Guarded::Refused } else { Guarded::Missing });
        }

        // Timestamps are fixed-width, so text order is time order.
        let changed_at: String = tx.query_row(
          "SELECT max(?2, COALESCE(MAX(changed_at), ?2)) FROM stage_history
           WHERE application_id = ?1",
          params![id_str, entry.changed_at],
          |r| r.get(0),
        )?;
        entry.changed_at = changed_at;
        tx.execute(
          "UPDATE applications SET updated_at = ?2 WHERE application_id = ?1",
          params![id_str, entry.changed_at],
        )?;
        entry.insert(&tx, &id_str)?;

        let raw = read_application(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw.map_or(Guarded::Missing, Guarded::Written))
      })
      .await?;

    Ok(match outcome {
      Guarded::Written(raw) => Guarded::Written(raw.into_application()?),
      Guarded::Refused => Guarded::Refused,
      Guarded::Missing => Guarded::Missing,
    })
  }

  async fn add_review(
    &self,
    id: Uuid,
    note: Option<ReviewerNote>,
    scores: Scores,
    at: DateTime<Utc>,
  ) -> Result<Option<Application>> {
    let id_str = encode_uuid(id);
    let note_row = note.as_ref().map(NoteRow::encode);
    let at_str = encode_dt(at);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE applications
           SET aptitude      = COALESCE(?2, aptitude),
               technical     = COALESCE(?3, technical),
               communication = COALESCE(?4, communication),
               updated_at    = ?5
           WHERE application_id = ?1",
          params![
            id_str,
            scores.aptitude,
            scores.technical,
            scores.communication,
            at_str,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        if let Some(note) = note_row {
          note.insert(&tx, &id_str)?;
        }
        let raw = read_application(&tx, &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.map(RawApplication::into_application).transpose()
  }

  async fn list_student_applications(
    &self,
    student_id: Uuid,
    stage: Option<Stage>,
    page: PageRequest,
  ) -> Result<Listing<StudentApplication>> {
    let mut filter = Filter::default();
    filter.eq("a.student_id", encode_uuid(student_id));
    if let Some(stage) = stage {
      filter.eq("a.stage", stage.to_string());
    }

    let (raws, total): (Vec<RawStudentApplication>, u64) = self
      .conn
      .call(move |conn| {
        let from = "FROM applications a JOIN jobs j ON j.job_id = a.job_id";
        let total = count(conn, from, &filter)?;
        let sql = format!(
          "SELECT {APPLICATION_COLUMNS}, {JOB_SUMMARY_COLUMNS} {from} {}
           ORDER BY a.created_at DESC, a.application_id
           LIMIT ? OFFSET ?",
          filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
          .query_map(params_from_iter(filter.paged_args(page)), |r| {
            Ok(RawStudentApplication {
              application: RawApplication::read(r, 0)?,
              job:         RawJobSummary::read(r, APPLICATION_WIDTH)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for row in &mut rows {
          load_children(conn, &mut row.application)?;
        }
        Ok((rows, total))
      })
      .await?;

    let rows = raws
      .into_iter()
      .map(RawStudentApplication::into_student_application)
      .collect::<Result<_>>()?;
    Ok((rows, total))
  }

  async fn list_job_applications(
    &self,
    job_id: Uuid,
    stage: Option<Stage>,
    page: PageRequest,
  ) -> Result<Listing<Applicant>> {
    let mut filter = Filter::default();
    filter.eq("a.job_id", encode_uuid(job_id));
    if let Some(stage) = stage {
      filter.eq("a.stage", stage.to_string());
    }

    let (raws, total): (Vec<RawApplicant>, u64) = self
      .conn
      .call(move |conn| {
        let from = "FROM applications a JOIN users u ON u.user_id = a.student_id";
        let total = count(conn, from, &filter)?;
        let sql = format!(
          "SELECT {APPLICATION_COLUMNS}, {STUDENT_COLUMNS} {from} {}
           ORDER BY a.created_at DESC, a.application_id
           LIMIT ? OFFSET ?",
          filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
          .query_map(params_from_iter(filter.paged_args(page)), |r| {
            Ok(RawApplicant {
              application: RawApplication::read(r, 0)?,
              student:     RawStudent::read(r, APPLICATION_WIDTH)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for row in &mut rows {
          load_children(conn, &mut row.application)?;
        }
        Ok((rows, total))
      })
      .await?;

    let rows = raws
      .into_iter()
      .map(RawApplicant::into_applicant)
      .collect::<Result<_>>()?;
    Ok((rows, total))
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn count_active_users_by_role(&self) -> Result<Vec<(Role, u64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT role, COUNT(*) FROM users WHERE is_active = 1 GROUP BY role",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(role, n)| Ok((decode_enum("role", &role)?, n as u64)))
      .collect()
  }

  async fn count_jobs_by_status(&self) -> Result<Vec<(JobStatus, u64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(status, n)| Ok((decode_enum("job status", &status)?, n as u64)))
      .collect()
  }

  async fn funnel(&self, filter: &FunnelFilter) -> Result<Funnel> {
    let mut sql_filter = Filter::default();
    if let Some(batch) = filter.batch {
      sql_filter.eq("p.graduation_year", batch);
    }
    if let Some(department) = present(&filter.department) {
      sql_filter.eq_nocase("u.department", department);
    }
    if let Some(job_id) = filter.job_id {
      sql_filter.eq("a.job_id", encode_uuid(job_id));
    }

    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT a.stage, COUNT(*)
           FROM applications a
           JOIN users u         ON u.user_id = a.student_id
           LEFT JOIN profiles p ON p.user_id = a.student_id
           {}
           GROUP BY a.stage",
          sql_filter.clause()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(sql_filter.args.iter()), |r| {
            Ok((r.get(0)?, r.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(stage, n)| Ok((decode_enum("stage", &stage)?, n as u64)))
      .collect()
  }

  async fn skill_demand(&self, limit: u32) -> Result<Vec<SkillDemand>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT s.value, COUNT(*) AS n
           FROM jobs j, json_each(j.skills) s
           WHERE j.status = 'open'
           GROUP BY s.value
           ORDER BY n DESC, s.value
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(params![limit], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(skill, n)| SkillDemand { skill, count: n as u64 })
        .collect(),
    )
  }

  async fn top_companies_by_jobs(&self, limit: u32) -> Result<Vec<CompanyJobCount>> {
    let rows: Vec<(String, Option<String>, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT j.company_id, u.company_name, COUNT(*) AS n
           FROM jobs j
           LEFT JOIN users u ON u.user_id = j.company_id
           GROUP BY j.company_id
           ORDER BY n DESC, j.company_id
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(params![limit], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, company_name, n)| {
        Ok(CompanyJobCount {
          company_id: decode_uuid(&id)?,
          company_name,
          job_count: n as u64,
        })
      })
      .collect()
  }

  async fn department_funnels(
    &self,
  ) -> Result<Vec<GroupedStageCount<Option<String>>>> {
    let rows: Vec<(Option<String>, String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT u.department, a.stage, COUNT(*)
           FROM applications a
           JOIN users u ON u.user_id = a.student_id
           GROUP BY u.department, a.stage
           ORDER BY u.department, a.stage",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(department, stage, n)| {
        Ok((department, decode_enum("stage", &stage)?, n as u64))
      })
      .collect()
  }

  async fn company_funnels(
    &self,
  ) -> Result<Vec<GroupedStageCount<(Uuid, Option<String>)>>> {
    let rows: Vec<(String, Option<String>, String, i64)> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT j.company_id, u.company_name, a.stage, COUNT(*)
           FROM applications a
           JOIN jobs j       ON j.job_id  = a.job_id
           LEFT JOIN users u ON u.user_id = j.company_id
           GROUP BY j.company_id, a.stage
           ORDER BY j.company_id, a.stage",
        )?;
        let rows = stmt
          .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(id, name, stage, n)| {
        Ok(((decode_uuid(&id)?, name), decode_enum("stage", &stage)?, n as u64))
      })
      .collect()
  }
}
