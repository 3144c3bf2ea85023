//! Field validation helpers shared by the request payload types.
//!
//! Validation runs before any store access and reports every failing field at
//! once, rather than stopping at the first.

use serde::Serialize;

use crate::{Error, Result};

/// One rejected field in a request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

/// Accumulates [`FieldError`]s for a single payload.
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
  pub fn new() -> Self { Self::default() }

  /// Record `message` against `field` unless `ok` holds.
  pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
    if !ok {
      self.0.push(FieldError {
        field:   field.to_owned(),
        message: message.to_owned(),
      });
    }
    self
  }

  /// `Ok(())` if nothing was recorded, otherwise [`Error::Validation`].
  pub fn finish(self) -> Result<()> {
    if self.0.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(self.0))
    }
  }
}

/// At least `n` characters once surrounding whitespace is trimmed.
pub fn min_chars(s: &str, n: usize) -> bool { s.trim().chars().count() >= n }

/// A deliberately loose address check: `local@domain.tld`, no whitespace.
pub fn is_email(s: &str) -> bool {
  if s.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain
      .split_once('.')
      .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
    && !domain.ends_with('.')
}

/// Inclusive range check that treats `None` as "not supplied".
pub fn within<T: PartialOrd>(value: Option<T>, min: T, max: T) -> bool {
  value.is_none_or(|v| v >= min && v <= max)
}

/// Trim, and drop the value entirely if nothing is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn email_shapes() {
    assert!(is_email("student@test.com"));
    assert!(is_email("a.b+c@uni.ac.in"));
    assert!(!is_email("student"));
    assert!(!is_email("@test.com"));
    assert!(!is_email("student@test"));
    assert!(!is_email("student@test."));
    assert!(!is_email("stu dent@test.com"));
    assert!(!is_email("a@b@c.com"));
  }

  #[test]
  fn min_chars_trims() {
    assert!(min_chars("  abc  ", 3));
    assert!(!min_chars("  ab  ", 3));
  }

  #[test]
  fn violations_collect_every_field() {
    let mut v = Violations::new();
    v.check(false, "title", "too short")
      .check(true, "location", "required")
      .check(false, "skills", "at least one skill is required");

    match v.finish() {
      Err(Error::Validation(fields)) => {
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, ["title", "skills"]);
      }
      other => panic!("expected validation error, got {other:?}"),
    }
  }

  #[test]
  fn within_ignores_missing_values() {
    assert!(within(None::<f64>, 0.0, 10.0));
    assert!(within(Some(10.0), 0.0, 10.0));
    assert!(!within(Some(10.5), 0.0, 10.0));
  }
}
