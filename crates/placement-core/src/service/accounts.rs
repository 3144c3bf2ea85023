//! Registration, login, and admin account management.

use tracing::{info, warn};
use uuid::Uuid;

use super::Portal;
use crate::{
  Error, Result,
  credentials::{hash_password, verify_password},
  page::{Page, PageRequest},
  profile::StudentProfile,
  store::{Inserted, PortalStore},
  user::{
    Actor, Credentials, Registration, Role, StatusChange, User, UserQuery,
    normalize_email,
  },
  validate::{Violations, is_email, min_chars},
};

impl<S: PortalStore> Portal<S> {
  /// Create a student or company account. Students also get a stub profile.
  pub async fn register(&self, registration: Registration) -> Result<User> {
    registration.validate()?;
    let hash = hash_password(registration.password.clone()).await?;
    let now = self.now();
    let user = registration.into_user(hash, now);
    let profile = (user.role == Role::Student)
      .then(|| StudentProfile::stub(user.user_id, now));

    match self
      .store
      .register_user(user, profile)
      .await
      .map_err(Error::store)?
    {
      Inserted::Created(user) => {
        info!(user_id = %user.user_id, role = %user.role, "account registered");
        Ok(user)
      }
      Inserted::Duplicate => Err(Error::EmailTaken),
    }
  }

  /// Create an admin account. Admins cannot self-register; this is reached
  /// only from the server's command line.
  pub async fn create_admin(
    &self,
    name: String,
    email: String,
    password: String,
  ) -> Result<User> {
    let mut v = Violations::new();
    v.check(min_chars(&name, 2), "name", "Name must be at least 2 characters")
      .check(is_email(email.trim()), "email", "Please provide a valid email")
      .check(
        password.chars().count() >= 6,
        "password",
        "Password must be at least 6 characters",
      );
    v.finish()?;

    let hash = hash_password(password).await?;
    let user = User {
      user_id:       Uuid::new_v4(),
      name:          name.trim().to_owned(),
      email:         normalize_email(&email),
      password_hash: hash,
      role:          Role::Admin,
      department:    None,
      company_name:  None,
      is_active:     true,
      created_at:    self.now(),
    };

    match self
      .store
      .register_user(user, None)
      .await
      .map_err(Error::store)?
    {
      Inserted::Created(user) => {
        info!(user_id = %user.user_id, "admin account created");
        Ok(user)
      }
      Inserted::Duplicate => Err(Error::EmailTaken),
    }
  }

  /// Check credentials and return the account they belong to.
  pub async fn login(&self, credentials: Credentials) -> Result<User> {
    let email = normalize_email(&credentials.email);
    let mut v = Violations::new();
    v.check(is_email(&email), "email", "Please provide a valid email")
      .check(
        !credentials.password.is_empty(),
        "password",
        "Password is required",
      );
    v.finish()?;

    let Some(user) = self
      .store
      .find_user_by_email(email)
      .await
      .map_err(Error::store)?
    else {
      return Err(Error::InvalidCredentials);
    };

    if !user.is_active {
      warn!(user_id = %user.user_id, "login attempt on deactivated account");
      return Err(Error::AccountDeactivated);
    }

    if !verify_password(credentials.password, user.password_hash.clone()).await? {
      warn!(user_id = %user.user_id, "login failed: wrong password");
      return Err(Error::InvalidCredentials);
    }

    Ok(user)
  }

  /// Resolve a token subject to a live account. Unknown accounts are
  /// treated as unauthenticated; deactivated ones are refused outright.
  pub async fn authenticate(&self, user_id: Uuid) -> Result<User> {
    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::Unauthenticated)?;
    if !user.is_active {
      return Err(Error::AccountDeactivated);
    }
    Ok(user)
  }

  pub async fn me(&self, actor: &Actor) -> Result<User> {
    self
      .store
      .get_user(actor.user_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(actor.user_id))
  }

  /// Admin: the user directory.
  pub async fn list_users(
    &self,
    actor: &Actor,
    query: UserQuery,
    page: PageRequest,
  ) -> Result<Page<User>> {
    actor.require(Role::Admin)?;
    let (users, total) = self
      .store
      .list_users(&query, page)
      .await
      .map_err(Error::store)?;
    Ok(page.into_page(users, total))
  }

  /// Admin: activate or deactivate an account other than one's own.
  pub async fn set_user_status(
    &self,
    actor: &Actor,
    user_id: Uuid,
    change: StatusChange,
  ) -> Result<User> {
    actor.require(Role::Admin)?;
    if user_id == actor.user_id {
      return Err(Error::invalid("user_id", "Cannot modify your own status"));
    }
    let user = self
      .store
      .set_user_active(user_id, change.is_active)
      .await
      .map_err(Error::store)?
      .ok_or(Error::UserNotFound(user_id))?;
    info!(
      admin = %actor.user_id,
      user_id = %user.user_id,
      is_active = user.is_active,
      "account status changed"
    );
    Ok(user)
  }
}
