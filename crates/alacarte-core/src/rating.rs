//! Ratings and the visibility rule that governs who may see them.
//!
//! A rating is visible to its author and to every user on its viewer list,
//! and to nobody else. The author is never on their own viewer list, so an
//! empty list means the rating is private.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  item::{ItemRef, ItemType},
  user::UserId,
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RatingId(pub i64);

impl fmt::Display for RatingId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Visibility ──────────────────────────────────────────────────────────────

/// The visibility predicate shared by every read path.
pub fn is_visible<I>(author: UserId, viewers: I, requester: UserId) -> bool
where
  I: IntoIterator<Item = UserId>,
{
  requester == author || viewers.into_iter().any(|v| v == requester)
}

/// Derived sharing state; it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
  Private,
  Shared,
}

// ─── Rating ──────────────────────────────────────────────────────────────────

/// A stored rating row. `author_id` never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  pub id:         RatingId,
  pub author_id:  UserId,
  #[serde(flatten)]
  pub item:       ItemRef,
  pub grade:      f32,
  pub note:       String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Author projection attached to a rating. Never carries an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
  pub id:           UserId,
  pub display_name: String,
  pub avatar:       String,
  pub discoverable: bool,
}

/// Viewer projection attached to a rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerSummary {
  pub id:           UserId,
  pub display_name: String,
  pub avatar:       String,
}

/// A rating as returned to clients: the row plus author and viewer summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingView {
  #[serde(flatten)]
  pub rating:  Rating,
  pub author:  AuthorSummary,
  pub viewers: Vec<ViewerSummary>,
}

impl RatingView {
  pub fn is_visible_to(&self, requester: UserId) -> bool {
    is_visible(
      self.rating.author_id,
      self.viewers.iter().map(|v| v.id),
      requester,
    )
  }

  pub fn privacy(&self) -> Privacy {
    if self.viewers.is_empty() { Privacy::Private } else { Privacy::Shared }
  }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::Store::insert_rating`]. The author comes from the
/// authenticated requester, never from the request body.
#[derive(Debug, Clone)]
pub struct NewRating {
  pub author_id: UserId,
  pub item:      ItemRef,
  pub grade:     f32,
  pub note:      String,
}

/// Changes applied by [`crate::store::Store::update_rating`]. `None` leaves
/// the stored value unchanged.
#[derive(Debug, Clone, Default)]
pub struct RatingChanges {
  pub grade: Option<f32>,
  pub note:  Option<String>,
  pub item:  Option<ItemRef>,
}

/// Parameters for [`crate::store::Store::list_ratings`]. All set filters must
/// hold; results are newest first.
#[derive(Debug, Clone, Default)]
pub struct RatingQuery {
  pub id:         Option<RatingId>,
  pub author:     Option<UserId>,
  /// Keep only ratings this user may see (authored by or shared with them).
  pub visible_to: Option<UserId>,
  pub item_type:  Option<ItemType>,
  pub item:       Option<ItemRef>,
}

/// Aggregate over every rating of one item, regardless of visibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommunityStats {
  pub total_ratings:  u64,
  /// Mean grade; `0.0` when there are no ratings.
  pub average_rating: f64,
}
