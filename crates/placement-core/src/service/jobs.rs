//! The job board and the posting lifecycle.

use tracing::info;
use uuid::Uuid;

use super::{COMPANY_JOBS_PAGE, Portal};
use crate::{
  Error, Result,
  eligibility::{EligibilityReport, evaluate},
  job::{CompanyJob, Job, JobPatch, JobQuery, JobStatus, NewJob},
  page::{Page, PageRequest},
  store::{JobDeletion, PortalStore},
  user::{Actor, Role},
};

impl<S: PortalStore> Portal<S> {
  /// Public: open postings still taking applications.
  pub async fn list_jobs(
    &self,
    query: JobQuery,
    page: PageRequest,
  ) -> Result<Page<Job>> {
    let (jobs, total) = self
      .store
      .list_open_jobs(&query, self.now(), page)
      .await
      .map_err(Error::store)?;
    Ok(page.into_page(jobs, total))
  }

  /// Public: any posting by id, whatever its status.
  pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
    self
      .store
      .get_job(job_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::JobNotFound(job_id))
  }

  pub async fn create_job(&self, actor: &Actor, input: NewJob) -> Result<Job> {
    actor.require(Role::Company)?;
    let now = self.now();
    input.validate(now)?;
    let job = self
      .store
      .insert_job(input.into_job(actor.user_id, now))
      .await
      .map_err(Error::store)?;
    info!(job_id = %job.job_id, company_id = %actor.user_id, "job created");
    Ok(job)
  }

  /// The calling company's postings with their application counts.
  pub async fn company_jobs(
    &self,
    actor: &Actor,
    status: Option<JobStatus>,
    page: Option<u32>,
  ) -> Result<Page<CompanyJob>> {
    actor.require(Role::Company)?;
    let page = PageRequest::fixed(page, COMPANY_JOBS_PAGE)?;
    let (jobs, total) = self
      .store
      .list_company_jobs(actor.user_id, status, page)
      .await
      .map_err(Error::store)?;
    Ok(page.into_page(jobs, total))
  }

  pub async fn update_job(
    &self,
    actor: &Actor,
    job_id: Uuid,
    patch: JobPatch,
  ) -> Result<Job> {
    actor.require(Role::Company)?;
    let now = self.now();
    patch.validate(now)?;
    let mut job = self.owned_job(actor, job_id).await?;
    job.apply(patch, now);
    let job = self
      .store
      .update_job(job)
      .await
      .map_err(Error::store)?
      .ok_or(Error::JobNotFound(job_id))?;
    info!(job_id = %job.job_id, status = %job.status, "job updated");
    Ok(job)
  }

  /// Delete a posting that has never received an application. Postings with
  /// applications must be closed instead.
  pub async fn delete_job(&self, actor: &Actor, job_id: Uuid) -> Result<()> {
    actor.require(Role::Company)?;
    self.owned_job(actor, job_id).await?;
    match self.store.delete_job(job_id).await.map_err(Error::store)? {
      JobDeletion::Deleted => {
        info!(%job_id, "job deleted");
        Ok(())
      }
      JobDeletion::Referenced(count) => Err(Error::JobHasApplications(count)),
      JobDeletion::Missing => Err(Error::JobNotFound(job_id)),
    }
  }

  /// Student: whether the caller could apply to `job_id` right now, as far
  /// as the eligibility predicate is concerned.
  pub async fn check_eligibility(
    &self,
    actor: &Actor,
    job_id: Uuid,
  ) -> Result<EligibilityReport> {
    actor.require(Role::Student)?;
    let job = self.get_job(job_id).await?;
    let profile = self
      .store
      .get_profile_for_user(actor.user_id)
      .await
      .map_err(Error::store)?;
    Ok(evaluate(&job.eligibility, profile.as_ref()).into())
  }

  /// Fetch a job owned by the acting company. Someone else's job is
  /// indistinguishable from a missing one.
  pub(super) async fn owned_job(&self, actor: &Actor, job_id: Uuid) -> Result<Job> {
    let job = self.get_job(job_id).await?;
    if job.company_id != actor.user_id {
      return Err(Error::JobNotFound(job_id));
    }
    Ok(job)
  }
}
