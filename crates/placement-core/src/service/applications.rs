//! Submitting applications and moving them through review.

use tracing::info;
use uuid::Uuid;

use super::{JOB_APPLICATIONS_PAGE, Portal, STUDENT_APPLICATIONS_PAGE};
use crate::{
  Error, Result,
  application::{
    Application, JobApplications, Review, ReviewerNote, Stage, StageUpdate,
    StudentApplication, Submission, Withdrawal,
  },
  eligibility::evaluate,
  page::{Page, PageRequest},
  stats::FunnelFilter,
  store::{Guarded, Inserted, PortalStore},
  user::{Actor, Role},
  validate::non_blank,
};

impl<S: PortalStore> Portal<S> {
  /// Student: apply to a job.
  ///
  /// Guards run in order: the job exists, is open, its deadline has not
  /// passed, the student has not already applied, and the student is
  /// eligible. The store's unique key still catches a concurrent duplicate
  /// that got past the existence check.
  pub async fn submit_application(
    &self,
    actor: &Actor,
    submission: Submission,
  ) -> Result<Application> {
    actor.require(Role::Student)?;
    submission.validate()?;

    let now = self.now();
    let job = self.get_job(submission.job_id).await?;
    job.accepts_applications(now)?;

    if self
      .store
      .application_exists(job.job_id, actor.user_id)
      .await
      .map_err(Error::store)?
    {
      return Err(Error::AlreadyApplied);
    }

    let profile = self
      .store
      .get_profile_for_user(actor.user_id)
      .await
      .map_err(Error::store)?;
    evaluate(&job.eligibility, profile.as_ref()).map_err(Error::NotEligible)?;

    let application = Application::submit(submission, actor.user_id, now);
    match self
      .store
      .insert_application(application)
      .await
      .map_err(Error::store)?
    {
      Inserted::Created(application) => {
        info!(
          application_id = %application.application_id,
          job_id = %application.job_id,
          student_id = %application.student_id,
          "application submitted"
        );
        Ok(application)
      }
      Inserted::Duplicate => Err(Error::AlreadyApplied),
    }
  }

  /// Student: their own applications, newest first.
  pub async fn my_applications(
    &self,
    actor: &Actor,
    stage: Option<Stage>,
    page: Option<u32>,
  ) -> Result<Page<StudentApplication>> {
    actor.require(Role::Student)?;
    let page = PageRequest::fixed(page, STUDENT_APPLICATIONS_PAGE)?;
    let (rows, total) = self
      .store
      .list_student_applications(actor.user_id, stage, page)
      .await
      .map_err(Error::store)?;
    Ok(page.into_page(rows, total))
  }

  /// Company: applicants to one of its jobs, with stage counts for the job.
  pub async fn job_applications(
    &self,
    actor: &Actor,
    job_id: Uuid,
    stage: Option<Stage>,
    page: Option<u32>,
  ) -> Result<JobApplications> {
    actor.require(Role::Company)?;
    let page = PageRequest::fixed(page, JOB_APPLICATIONS_PAGE)?;
    self.owned_job(actor, job_id).await?;

    let (rows, total) = self
      .store
      .list_job_applications(job_id, stage, page)
      .await
      .map_err(Error::store)?;
    let filter = FunnelFilter {
      job_id: Some(job_id),
      ..FunnelFilter::default()
    };
    let stage_stats = self.store.funnel(&filter).await.map_err(Error::store)?;

    Ok(JobApplications {
      page: page.into_page(rows, total),
      stage_stats,
    })
  }

  /// A single application, visible to its student, the company that owns
  /// the job, and admins.
  pub async fn get_application(
    &self,
    actor: &Actor,
    application_id: Uuid,
  ) -> Result<Application> {
    let application = self.load_application(application_id).await?;
    let allowed = match actor.role {
      Role::Admin => true,
      Role::Student => application.student_id == actor.user_id,
      Role::Company => {
        self.get_job(application.job_id).await?.company_id == actor.user_id
      }
    };
    if !allowed {
      return Err(Error::Forbidden(
        "you do not have access to this application".into(),
      ));
    }
    Ok(application)
  }

  /// Company: move an application to another stage.
  ///
  /// Any company-settable stage may follow any stage, including the current
  /// one; each call appends exactly one history entry.
  pub async fn transition_stage(
    &self,
    actor: &Actor,
    application_id: Uuid,
    update: StageUpdate,
  ) -> Result<Application> {
    actor.require(Role::Company)?;
    update.validate()?;
    let current = self.reviewable(actor, application_id).await?;

    let change = current.stage_change(
      update.stage,
      actor.user_id,
      update.reason,
      self.now(),
    );
    let application = match self
      .store
      .append_stage_change(application_id, change, None)
      .await
      .map_err(Error::store)?
    {
      Guarded::Written(application) => application,
      Guarded::Refused | Guarded::Missing => {
        return Err(Error::ApplicationNotFound(application_id));
      }
    };

    info!(
      %application_id,
      from = %current.stage,
      to = %application.stage,
      "application stage changed"
    );
    Ok(application)
  }

  /// Company: append a reviewer note and/or update scores.
  ///
  /// Only the scores present in the review are written; the store merges
  /// them so concurrent reviews of different scores both land.
  pub async fn review_application(
    &self,
    actor: &Actor,
    application_id: Uuid,
    review: Review,
  ) -> Result<Application> {
    actor.require(Role::Company)?;
    review.validate()?;
    self.reviewable(actor, application_id).await?;

    let now = self.now();
    let note = non_blank(review.note).map(|note| ReviewerNote {
      note,
      reviewer: actor.user_id,
      created_at: now,
    });

    self
      .store
      .add_review(application_id, note, review.scores.unwrap_or_default(), now)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ApplicationNotFound(application_id))
  }

  /// Student: withdraw one of their own applications.
  ///
  /// The store refuses the write if the application is already withdrawn,
  /// so two concurrent withdrawals append a single entry.
  pub async fn withdraw_application(
    &self,
    actor: &Actor,
    application_id: Uuid,
    withdrawal: Withdrawal,
  ) -> Result<Application> {
    actor.require(Role::Student)?;
    let current = self.load_application(application_id).await?;
    if current.student_id != actor.user_id {
      return Err(Error::Forbidden(
        "only the applicant can withdraw an application".into(),
      ));
    }
    if current.stage == Stage::Withdrawn {
      return Err(Error::AlreadyWithdrawn);
    }

    let change = current.stage_change(
      Stage::Withdrawn,
      actor.user_id,
      withdrawal.reason,
      self.now(),
    );
    match self
      .store
      .append_stage_change(application_id, change, Some(Stage::Withdrawn))
      .await
      .map_err(Error::store)?
    {
      Guarded::Written(application) => {
        info!(%application_id, "application withdrawn");
        Ok(application)
      }
      Guarded::Refused => Err(Error::AlreadyWithdrawn),
      Guarded::Missing => Err(Error::ApplicationNotFound(application_id)),
    }
  }

  async fn load_application(&self, application_id: Uuid) -> Result<Application> {
    self
      .store
      .get_application(application_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ApplicationNotFound(application_id))
  }

  /// Fetch an application whose job belongs to the acting company.
  async fn reviewable(
    &self,
    actor: &Actor,
    application_id: Uuid,
  ) -> Result<Application> {
    let application = self.load_application(application_id).await?;
    let job = self.get_job(application.job_id).await?;
    if job.company_id != actor.user_id {
      return Err(Error::Forbidden(
        "this application belongs to another company's job".into(),
      ));
    }
    Ok(application)
  }
}
