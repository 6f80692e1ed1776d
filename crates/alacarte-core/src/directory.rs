//! The user directory: sign-in, profile management, sharing candidates, and
//! administration of accounts.

use std::sync::Arc;

use crate::{
  Error, Result,
  identity::VerifiedIdentity,
  impact::{CascadeReport, DeleteImpact},
  store::{Store, StoreResultExt as _},
  user::{NewUser, ProfileUpdate, ShareableUsers, User, UserId, normalize_display_name},
};

pub struct UserDirectory<S> {
  store:               Arc<S>,
  initial_admin_email: Option<String>,
}

impl<S> Clone for UserDirectory<S> {
  fn clone(&self) -> Self {
    Self {
      store:               Arc::clone(&self.store),
      initial_admin_email: self.initial_admin_email.clone(),
    }
  }
}

/// Avatar used when the identity provider supplies no picture.
fn initials_avatar(full_name: &str) -> String {
  let name = full_name
    .split_whitespace()
    .map(urlencoding::encode)
    .collect::<Vec<_>>()
    .join("+");
  format!("https://ui-avatars.com/api/?name={name}&background=random")
}

impl<S: Store> UserDirectory<S> {
  pub fn new(store: Arc<S>, initial_admin_email: Option<String>) -> Self {
    Self { store, initial_admin_email }
  }

  pub fn is_admin(&self, user: &User) -> bool {
    user.has_admin_rights(self.initial_admin_email.as_deref())
  }

  pub async fn get(&self, id: UserId) -> Result<User> {
    self
      .store
      .get_user(id)
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(id))
  }

  /// Find the account for a verified identity, creating it on first sight.
  pub async fn sign_in(&self, identity: VerifiedIdentity) -> Result<User> {
    if let Some(existing) = self
      .store
      .find_user_by_google_id(identity.subject_id.clone())
      .await
      .into_core()?
    {
      let user = self
        .store
        .record_login(existing.id)
        .await
        .into_core()?
        .ok_or(Error::UserNotFound(existing.id))?;
      tracing::info!(user = %user.id, "user signed in");
      return Ok(user);
    }

    let avatar = if identity.avatar_url.is_empty() {
      initials_avatar(&identity.full_name)
    } else {
      identity.avatar_url
    };
    let user = self
      .store
      .create_user(NewUser {
        google_id: identity.subject_id,
        email:     identity.email,
        full_name: identity.full_name,
        avatar,
      })
      .await
      .into_core()?;
    tracing::info!(user = %user.id, "user registered");
    Ok(user)
  }

  async fn ensure_name_free(&self, name: &str, owner: UserId) -> Result<()> {
    let taken = self
      .store
      .display_name_taken(name.to_owned(), Some(owner))
      .await
      .into_core()?;
    if taken {
      return Err(Error::Conflict(format!("display name {name:?} is already taken")));
    }
    Ok(())
  }

  /// First-time profile setup; unlocks the rest of the API.
  pub async fn complete_profile(
    &self,
    id: UserId,
    display_name: &str,
    discoverable: Option<bool>,
  ) -> Result<User> {
    let name = normalize_display_name(display_name)?;
    self.ensure_name_free(&name, id).await?;
    let user = self
      .store
      .complete_profile(id, name, discoverable.unwrap_or(true))
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(id))?;
    tracing::info!(user = %id, "profile completed");
    Ok(user)
  }

  /// Whether `display_name` could be claimed by `requester`.
  pub async fn display_name_available(&self, requester: UserId, display_name: &str) -> Result<bool> {
    let name = display_name.trim();
    if name.is_empty() {
      return Err(Error::validation("display_name is required"));
    }
    let taken = self
      .store
      .display_name_taken(name.to_owned(), Some(requester))
      .await
      .into_core()?;
    Ok(!taken)
  }

  pub async fn update_profile(&self, id: UserId, mut update: ProfileUpdate) -> Result<User> {
    if update.is_empty() {
      return Err(Error::validation("no valid fields to update"));
    }
    if let Some(raw) = update.display_name.take() {
      let name = normalize_display_name(&raw)?;
      self.ensure_name_free(&name, id).await?;
      update.display_name = Some(name);
    }
    let user = self
      .store
      .update_profile(id, update)
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(id))?;
    tracing::info!(user = %id, "profile updated");
    Ok(user)
  }

  pub async fn shareable_users(&self, id: UserId) -> Result<ShareableUsers> {
    self.store.shareable_users(id).await.into_core()
  }

  // ── Deletion ──────────────────────────────────────────────────────────

  pub async fn delete_impact(&self, id: UserId) -> Result<DeleteImpact> {
    self
      .store
      .user_delete_impact(id)
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(id))
  }

  /// Remove the account and everything that references it.
  pub async fn delete(&self, id: UserId) -> Result<CascadeReport> {
    let report = self
      .store
      .delete_user_cascade(id)
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(id))?;
    tracing::info!(
      user = %id,
      ratings_deleted = report.ratings_deleted,
      viewer_links_deleted = report.viewer_links_deleted,
      "user deleted"
    );
    Ok(report)
  }

  // ── Administration ────────────────────────────────────────────────────

  pub async fn list(&self) -> Result<Vec<User>> { self.store.list_users().await.into_core() }

  pub async fn promote(&self, id: UserId) -> Result<User> {
    let user = self.get(id).await?;
    if user.is_admin {
      return Err(Error::validation("user is already an admin"));
    }
    let user = self
      .store
      .set_admin(id, true)
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(id))?;
    tracing::info!(user = %id, "user promoted to admin");
    Ok(user)
  }

  pub async fn demote(&self, id: UserId) -> Result<User> {
    let user = self.get(id).await?;
    if !user.is_admin {
      return Err(Error::validation("user is not an admin"));
    }
    if self
      .initial_admin_email
      .as_deref()
      .is_some_and(|email| email.eq_ignore_ascii_case(&user.email))
    {
      return Err(Error::Forbidden("the initial admin cannot be demoted"));
    }
    let user = self
      .store
      .set_admin(id, false)
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(id))?;
    tracing::info!(user = %id, "user demoted");
    Ok(user)
  }
}
