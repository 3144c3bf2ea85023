//! Accounts, roles, and the per-request acting identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  Error, Result,
  validate::{Violations, is_email, min_chars, non_blank},
};

// ─── Role ────────────────────────────────────────────────────────────────────

/// The permission set an account operates under.
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
pub enum Role {
  Student,
  Company,
  Admin,
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A registered account. Accounts are deactivated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:       Uuid,
  pub name:          String,
  /// Always stored lowercased; unique across all accounts.
  pub email:         String,
  /// argon2 PHC string. Never leaves the server.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub role:          Role,
  /// Students only.
  pub department:    Option<String>,
  /// Companies only.
  pub company_name:  Option<String>,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
}

impl User {
  pub fn actor(&self) -> Actor {
    Actor {
      user_id: self.user_id,
      role:    self.role,
    }
  }
}

/// The public face of a student attached to profile and application rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
  pub user_id:    Uuid,
  pub name:       String,
  pub email:      String,
  pub department: Option<String>,
}

impl From<&User> for StudentSummary {
  fn from(u: &User) -> Self {
    Self {
      user_id:    u.user_id,
      name:       u.name.clone(),
      email:      u.email.clone(),
      department: u.department.clone(),
    }
  }
}

// ─── Actor ───────────────────────────────────────────────────────────────────

/// The authenticated identity performing an operation.
///
/// Every service call receives one explicitly; nothing reads identity from
/// ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
  pub user_id: Uuid,
  pub role:    Role,
}

impl Actor {
  /// Fail with [`Error::Forbidden`] unless the actor holds `role`.
  pub fn require(&self, role: Role) -> Result<()> {
    if self.role == role {
      Ok(())
    } else {
      Err(Error::Forbidden(format!("this action requires the {role} role")))
    }
  }
}

// ─── Registration ────────────────────────────────────────────────────────────

/// Self-service sign-up payload. Admin accounts are created out of band.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
  pub name:         String,
  pub email:        String,
  pub password:     String,
  pub role:         Role,
  pub department:   Option<String>,
  pub company_name: Option<String>,
}

impl Registration {
  pub fn validate(&self) -> Result<()> {
    let mut v = Violations::new();
    v.check(
      min_chars(&self.name, 2),
      "name",
      "Name must be at least 2 characters",
    )
    .check(
      is_email(self.email.trim()),
      "email",
      "Please provide a valid email",
    )
    .check(
      self.password.chars().count() >= 6,
      "password",
      "Password must be at least 6 characters",
    )
    .check(self.role != Role::Admin, "role", "Invalid role");
    v.finish()
  }

  /// Build the account record. Role-specific fields that do not belong to
  /// the chosen role are dropped.
  pub fn into_user(self, password_hash: String, now: DateTime<Utc>) -> User {
    let department = match self.role {
      Role::Student => non_blank(self.department),
      _ => None,
    };
    let company_name = match self.role {
      Role::Company => non_blank(self.company_name),
      _ => None,
    };
    User {
      user_id: Uuid::new_v4(),
      name: self.name.trim().to_owned(),
      email: normalize_email(&self.email),
      password_hash,
      role: self.role,
      department,
      company_name,
      is_active: true,
      created_at: now,
    }
  }
}

/// Login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Filters for the admin user directory.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
  pub role:       Option<Role>,
  pub department: Option<String>,
  /// Case-insensitive match over name and email.
  pub search:     Option<String>,
}

/// Payload for an admin toggling an account.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
  pub is_active: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn registration(role: Role) -> Registration {
    Registration {
      name:         "Priya".into(),
      email:        " Priya@Uni.EDU ".into(),
      password:     "secret1".into(),
      role,
      department:   Some("Computer Science".into()),
      company_name: Some("Acme".into()),
    }
  }

  #[test]
  fn admin_cannot_self_register() {
    let err = registration(Role::Admin).validate().unwrap_err();
    assert!(matches!(err, Error::Validation(ref f) if f[0].field == "role"));
  }

  #[test]
  fn role_specific_fields_are_dropped() {
    let student = registration(Role::Student).into_user("h".into(), Utc::now());
    assert_eq!(student.email, "priya@uni.edu");
    assert_eq!(student.department.as_deref(), Some("Computer Science"));
    assert!(student.company_name.is_none());

    let company = registration(Role::Company).into_user("h".into(), Utc::now());
    assert!(company.department.is_none());
    assert_eq!(company.company_name.as_deref(), Some("Acme"));
  }

  #[test]
  fn require_checks_role() {
    let actor = Actor { user_id: Uuid::new_v4(), role: Role::Student };
    assert!(actor.require(Role::Student).is_ok());
    assert!(matches!(actor.require(Role::Admin), Err(Error::Forbidden(_))));
  }

  #[test]
  fn password_hash_is_never_serialised() {
    let user = registration(Role::Student).into_user("$argon2id$x".into(), Utc::now());
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("password_hash").is_none());
  }
}
