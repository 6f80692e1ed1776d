//! Users and the public projections of a user that other users may see.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Numeric user identifier assigned by the store.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

pub const DISPLAY_NAME_MIN: usize = 2;
pub const DISPLAY_NAME_MAX: usize = 50;

/// A registered account. `email` is only ever returned to the user themself
/// and to administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:                UserId,
  /// Subject id issued by the external identity provider.
  pub google_id:         String,
  pub email:             String,
  pub full_name:         String,
  pub avatar:            String,
  /// Unset until the profile is completed.
  pub display_name:      Option<String>,
  pub discoverable:      bool,
  pub profile_completed: bool,
  pub is_admin:          bool,
  pub last_login_at:     DateTime<Utc>,
  pub created_at:        DateTime<Utc>,
}

impl User {
  /// Admin rights come from the stored flag or from matching the bootstrap
  /// admin address.
  pub fn has_admin_rights(&self, initial_admin_email: Option<&str>) -> bool {
    self.is_admin
      || initial_admin_email.is_some_and(|email| email.eq_ignore_ascii_case(&self.email))
  }

  pub fn public(&self) -> PublicUser {
    PublicUser {
      id:           self.id,
      display_name: self.display_name.clone().unwrap_or_default(),
      avatar:       self.avatar.clone(),
    }
  }

  pub fn display_name_hint(&self) -> String { suggest_display_name(&self.full_name) }
}

/// What another user may learn about an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
  pub id:           UserId,
  pub display_name: String,
  pub avatar:       String,
}

/// Input to [`crate::store::Store::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub google_id: String,
  pub email:     String,
  pub full_name: String,
  pub avatar:    String,
}

/// The closed set of fields a user may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
  pub display_name: Option<String>,
  pub discoverable: Option<bool>,
}

impl ProfileUpdate {
  pub fn is_empty(&self) -> bool {
    self.display_name.is_none() && self.discoverable.is_none()
  }
}

/// Result of [`crate::directory::UserDirectory::shareable_users`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShareableUsers {
  /// Users who have shared a rating with the requester before.
  pub previous_connections: Vec<PublicUser>,
  pub discoverable:         Vec<PublicUser>,
}

/// Trim and length-check a requested display name.
pub fn normalize_display_name(raw: &str) -> Result<String> {
  let name = raw.trim();
  let len = name.chars().count();
  if !(DISPLAY_NAME_MIN..=DISPLAY_NAME_MAX).contains(&len) {
    return Err(Error::validation(format!(
      "display name must be between {DISPLAY_NAME_MIN} and {DISPLAY_NAME_MAX} characters"
    )));
  }
  Ok(name.to_owned())
}

/// "Ada Lovelace" becomes "Ada L.". Single-word names are returned as is.
pub fn suggest_display_name(full_name: &str) -> String {
  let mut parts = full_name.split_whitespace();
  let Some(first) = parts.next() else {
    return String::new();
  };
  match parts.last().and_then(|last| last.chars().next()) {
    Some(initial) => format!("{first} {}.", initial.to_uppercase()),
    None => first.to_owned(),
  }
}
