//! SQL schema for the placement SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,   -- lowercased before insert
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL,          -- 'student' | 'company' | 'admin'
    department    TEXT,
    company_name  TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    profile_id      TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL UNIQUE REFERENCES users(user_id),
    program         TEXT NOT NULL,
    graduation_year INTEGER NOT NULL,
    cgpa            REAL,
    skills          TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    projects        TEXT NOT NULL DEFAULT '[]',   -- JSON array of Project
    resume_url      TEXT,
    linkedin_url    TEXT,
    github_url      TEXT,
    portfolio_url   TEXT,
    is_complete     INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    job_id              TEXT PRIMARY KEY,
    company_id          TEXT NOT NULL REFERENCES users(user_id),
    title               TEXT NOT NULL,
    description         TEXT NOT NULL,
    company             TEXT NOT NULL,
    skills              TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    eligibility         TEXT NOT NULL DEFAULT '{}',   -- JSON Eligibility
    location            TEXT NOT NULL,
    is_remote           INTEGER NOT NULL DEFAULT 0,
    job_type            TEXT NOT NULL,
    stipend             REAL,
    salary              REAL,
    deadline            TEXT NOT NULL,
    status              TEXT NOT NULL,                -- 'open' | 'closed' | 'draft'
    max_applications    INTEGER,
    screening_questions TEXT NOT NULL DEFAULT '[]',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

-- One application per (job, student). The foreign key also keeps a job
-- with applications from being deleted.
CREATE TABLE IF NOT EXISTS applications (
    application_id    TEXT PRIMARY KEY,
    job_id            TEXT NOT NULL REFERENCES jobs(job_id),
    student_id        TEXT NOT NULL REFERENCES users(user_id),
    cover_letter      TEXT NOT NULL,
    resume_url        TEXT,
    screening_answers TEXT NOT NULL DEFAULT '[]',
    stage             TEXT NOT NULL,
    aptitude          INTEGER,
    technical         INTEGER,
    communication     INTEGER,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    UNIQUE (job_id, student_id)
);

-- Append-only. No UPDATE or DELETE is ever issued against these tables.
CREATE TABLE IF NOT EXISTS stage_history (
    entry_id       INTEGER PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    stage          TEXT NOT NULL,
    changed_by     TEXT NOT NULL,
    changed_at     TEXT NOT NULL,
    reason         TEXT
);

CREATE TABLE IF NOT EXISTS reviewer_notes (
    note_id        INTEGER PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(application_id),
    note           TEXT NOT NULL,
    reviewer       TEXT NOT NULL,
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_role_idx           ON users(role);
CREATE INDEX IF NOT EXISTS jobs_status_deadline_idx ON jobs(status, deadline);
CREATE INDEX IF NOT EXISTS jobs_company_idx         ON jobs(company_id);
CREATE INDEX IF NOT EXISTS applications_student_idx ON applications(student_id);
CREATE INDEX IF NOT EXISTS applications_stage_idx   ON applications(stage);
CREATE INDEX IF NOT EXISTS stage_history_app_idx    ON stage_history(application_id);
CREATE INDEX IF NOT EXISTS reviewer_notes_app_idx   ON reviewer_notes(application_id);

PRAGMA user_version = 1;
";
