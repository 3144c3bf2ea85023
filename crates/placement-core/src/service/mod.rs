//! Domain operations over a [`PortalStore`].
//!
//! Every operation that acts on behalf of a user takes the acting
//! [`Actor`](crate::user::Actor) explicitly and checks role and ownership
//! before touching the store. Payload validation always runs first, so a
//! rejected request never causes a write.

mod accounts;
mod applications;
mod jobs;
mod profiles;
mod reports;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::store::PortalStore;

/// Page size for a student's own applications.
pub const STUDENT_APPLICATIONS_PAGE: u32 = 10;
/// Page size for a job's applicant list.
pub const JOB_APPLICATIONS_PAGE: u32 = 20;
/// Page size for a company's own postings.
pub const COMPANY_JOBS_PAGE: u32 = 10;

/// The portal's domain services, shared across request handlers.
///
/// Cloning is cheap; the store is reference-counted.
pub struct Portal<S> {
  store: Arc<S>,
}

impl<S> Clone for Portal<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: PortalStore> Portal<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  fn now(&self) -> DateTime<Utc> { Utc::now() }
}
