//! Results of destructive operations and of their dry-run previews.

use serde::{Deserialize, Serialize};

use crate::user::UserId;

/// One user touched by a cascading delete, with how many ratings tie them to
/// the deleted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedUser {
  pub id:            UserId,
  pub display_name:  String,
  pub ratings_count: u64,
}

/// What a cascading delete would remove, computed without mutating anything.
///
/// For an item, `affected_users` are the authors of its ratings. For a user,
/// they are the viewers of that user's ratings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteImpact {
  pub ratings_count:  u64,
  pub users_affected: u64,
  /// Viewer-set memberships that would disappear.
  pub sharings_count: u64,
  pub affected_users: Vec<AffectedUser>,
}

impl DeleteImpact {
  /// Human-readable notes for an administrator confirming the delete.
  pub fn warnings(&self) -> Vec<String> {
    let mut warnings = Vec::new();
    if self.ratings_count > 0 {
      warnings.push(format!("{} rating(s) will be deleted", self.ratings_count));
    }
    if self.sharings_count > 0 {
      warnings.push(format!(
        "{} sharing(s) with {} user(s) will be removed",
        self.sharings_count, self.users_affected
      ));
    }
    warnings
  }
}

/// What a cascading delete actually removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeReport {
  pub ratings_deleted:      u64,
  pub viewer_links_deleted: u64,
}

/// Result of a bulk sharing operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkOutcome {
  pub ratings_affected: u64,
}
