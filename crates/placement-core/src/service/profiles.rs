//! Student profile reads and edits.

use tracing::info;
use uuid::Uuid;

use super::Portal;
use crate::{
  Error, Result,
  page::{Page, PageRequest},
  profile::{ProfilePatch, ProfileQuery, ProfileWithStudent, StudentProfile},
  store::PortalStore,
  user::{Actor, Role, StudentSummary},
};

impl<S: PortalStore> Portal<S> {
  /// Student: their own profile.
  pub async fn my_profile(&self, actor: &Actor) -> Result<ProfileWithStudent> {
    actor.require(Role::Student)?;
    let profile = self
      .store
      .get_profile_for_user(actor.user_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ProfileNotFound)?;
    self.with_student(profile).await
  }

  /// Student: edit their own profile, creating it from the stub defaults if
  /// it does not exist yet.
  pub async fn update_my_profile(
    &self,
    actor: &Actor,
    patch: ProfilePatch,
  ) -> Result<ProfileWithStudent> {
    actor.require(Role::Student)?;
    patch.validate()?;

    let now = self.now();
    let mut profile = self
      .store
      .get_profile_for_user(actor.user_id)
      .await
      .map_err(Error::store)?
      .unwrap_or_else(|| StudentProfile::stub(actor.user_id, now));
    profile.apply(patch, now);

    let profile = self.store.save_profile(profile).await.map_err(Error::store)?;
    info!(
      user_id = %actor.user_id,
      is_complete = profile.is_complete,
      "profile updated"
    );
    self.with_student(profile).await
  }

  /// Admin: the profile directory.
  pub async fn list_profiles(
    &self,
    actor: &Actor,
    query: ProfileQuery,
    page: PageRequest,
  ) -> Result<Page<ProfileWithStudent>> {
    actor.require(Role::Admin)?;
    let (profiles, total) = self
      .store
      .list_profiles(&query, page)
      .await
      .map_err(Error::store)?;
    Ok(page.into_page(profiles, total))
  }

  /// Admin: one profile by its id.
  pub async fn get_profile(
    &self,
    actor: &Actor,
    profile_id: Uuid,
  ) -> Result<ProfileWithStudent> {
    actor.require(Role::Admin)?;
    let profile = self
      .store
      .get_profile(profile_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::ProfileNotFound)?;
    self.with_student(profile).await
  }

  async fn with_student(&self, profile: StudentProfile) -> Result<ProfileWithStudent> {
    let user = self
      .store
      .get_user(profile.user_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(profile.user_id))?;
    Ok(ProfileWithStudent {
      student: StudentSummary::from(&user),
      profile,
    })
  }
}
