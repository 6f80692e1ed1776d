//! The rating engine: every rating read and write goes through here.
//!
//! Ownership is re-checked against the stored row on each mutation; there is
//! no cached notion of who owns what. Read paths only return ratings the
//! requester may see.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  impact::BulkOutcome,
  item::{ItemRef, ItemType},
  rating::{CommunityStats, NewRating, Rating, RatingChanges, RatingId, RatingQuery, RatingView},
  store::{Store, StoreResultExt as _},
  user::{PublicUser, UserId},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Body of a rating creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct RatingInput {
  pub item_type: Option<String>,
  pub item_id:   Option<i64>,
  pub grade:     Option<f32>,
  #[serde(default)]
  pub note:      Option<String>,
}

/// Body of a rating edit request. The item reference changes only when both
/// halves are given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RatingEdit {
  pub grade:     Option<f32>,
  pub note:      Option<String>,
  pub item_type: Option<String>,
  pub item_id:   Option<i64>,
}

/// Who to remove from a viewer set. `user_ids` wins over the single
/// `user_id` when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HideTargets {
  pub user_id:  Option<UserId>,
  pub user_ids: Option<Vec<UserId>>,
}

impl HideTargets {
  pub fn resolve(self) -> Result<Vec<UserId>> {
    match (self.user_ids, self.user_id) {
      (Some(batch), _) if !batch.is_empty() => Ok(batch),
      (_, Some(single)) => Ok(vec![single]),
      _ => Err(Error::validation("must specify user_id or user_ids")),
    }
  }
}

/// Result of [`RatingEngine::bulk_remove_viewer`].
#[derive(Debug, Clone, Serialize)]
pub struct Unshared {
  pub ratings_affected: u64,
  pub removed_user:     PublicUser,
}

fn check_grade(grade: Option<f32>) -> Result<f32> {
  match grade {
    Some(g) if g.is_finite() => Ok(g),
    Some(_) => Err(Error::validation("grade must be a finite number")),
    None => Err(Error::validation("grade is required")),
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct RatingEngine<S> {
  store: Arc<S>,
}

impl<S> Clone for RatingEngine<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: Store> RatingEngine<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  async fn require_item(&self, item: ItemRef) -> Result<()> {
    let exists = self.store.item_exists(item).await.into_core()?;
    if exists { Ok(()) } else { Err(Error::ItemNotFound(item)) }
  }

  /// Load a rating and check that `requester` wrote it.
  async fn owned(&self, requester: UserId, id: RatingId) -> Result<Rating> {
    let rating = self
      .store
      .get_rating(id)
      .await
      .into_core()?
      .ok_or(Error::RatingNotFound(id))?;
    if rating.author_id != requester {
      return Err(Error::NotRatingAuthor(id));
    }
    Ok(rating)
  }

  async fn view(&self, id: RatingId) -> Result<RatingView> {
    let query = RatingQuery { id: Some(id), ..Default::default() };
    self
      .store
      .list_ratings(query)
      .await
      .into_core()?
      .into_iter()
      .next()
      .ok_or(Error::RatingNotFound(id))
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Create a private rating authored by `requester`.
  pub async fn create(&self, requester: UserId, input: RatingInput) -> Result<RatingView> {
    let (Some(item_type), Some(item_id)) = (input.item_type, input.item_id) else {
      return Err(Error::validation("item_type and item_id are required"));
    };
    let grade = check_grade(input.grade)?;
    let item = ItemRef::new(ItemType::parse(&item_type)?, item_id);
    self.require_item(item).await?;

    let rating = self
      .store
      .insert_rating(NewRating {
        author_id: requester,
        item,
        grade,
        note: input.note.unwrap_or_default(),
      })
      .await
      .into_core()?;
    tracing::info!(rating = %rating.id, author = %requester, item = %item, "rating created");
    self.view(rating.id).await
  }

  /// Change grade, note, and optionally the rated item. The author and the
  /// viewer set are untouched.
  pub async fn edit(
    &self,
    requester: UserId,
    id: RatingId,
    edit: RatingEdit,
  ) -> Result<RatingView> {
    let current = self.owned(requester, id).await?;
    let grade = check_grade(edit.grade)?;

    let item = match (edit.item_type, edit.item_id) {
      (Some(tag), Some(item_id)) => Some(ItemRef::new(ItemType::parse(&tag)?, item_id)),
      (None, None) => None,
      _ => return Err(Error::validation("item_type and item_id must be given together")),
    };
    if let Some(item) = item
      && item != current.item
    {
      self.require_item(item).await?;
    }

    let changes = RatingChanges { grade: Some(grade), note: edit.note, item };
    self
      .store
      .update_rating(id, changes)
      .await
      .into_core()?
      .ok_or(Error::RatingNotFound(id))?;
    tracing::info!(rating = %id, "rating edited");
    self.view(id).await
  }

  /// Delete a rating together with its viewer links.
  pub async fn remove(&self, requester: UserId, id: RatingId) -> Result<()> {
    self.owned(requester, id).await?;
    let deleted = self.store.delete_rating(id).await.into_core()?;
    if !deleted {
      return Err(Error::RatingNotFound(id));
    }
    tracing::info!(rating = %id, "rating removed");
    Ok(())
  }

  /// Add users to the viewer set. The author is never added; unknown ids and
  /// existing viewers are skipped.
  pub async fn share(
    &self,
    requester: UserId,
    id: RatingId,
    targets: Vec<UserId>,
  ) -> Result<RatingView> {
    let rating = self.owned(requester, id).await?;
    let mut targets: Vec<UserId> =
      targets.into_iter().filter(|t| *t != rating.author_id).collect();
    targets.sort_unstable();
    targets.dedup();

    if !targets.is_empty() {
      let count = targets.len();
      self.store.add_viewers(id, targets).await.into_core()?;
      tracing::info!(rating = %id, targets = count, "rating shared");
    }
    self.view(id).await
  }

  /// Remove users from the viewer set. Users not in it are ignored.
  pub async fn hide(
    &self,
    requester: UserId,
    id: RatingId,
    targets: HideTargets,
  ) -> Result<RatingView> {
    self.owned(requester, id).await?;
    let targets = targets.resolve()?;
    let count = targets.len();
    self.store.remove_viewers(id, targets).await.into_core()?;
    tracing::info!(rating = %id, targets = count, "rating hidden");
    self.view(id).await
  }

  /// Empty the viewer set of every rating `requester` authored.
  pub async fn bulk_make_private(&self, requester: UserId) -> Result<BulkOutcome> {
    let ratings_affected = self
      .store
      .clear_viewers_by_author(requester)
      .await
      .into_core()?;
    tracing::info!(author = %requester, ratings_affected, "ratings made private");
    Ok(BulkOutcome { ratings_affected })
  }

  /// Remove `target` from every viewer set of `requester`'s ratings.
  pub async fn bulk_remove_viewer(&self, requester: UserId, target: UserId) -> Result<Unshared> {
    let removed = self
      .store
      .get_user(target)
      .await
      .into_core()?
      .ok_or(Error::UserNotFound(target))?;
    let ratings_affected = self
      .store
      .remove_viewer_by_author(requester, target)
      .await
      .into_core()?;
    tracing::info!(author = %requester, viewer = %target, ratings_affected, "viewer removed from ratings");
    Ok(Unshared { ratings_affected, removed_user: removed.public() })
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Ratings written by `user`. Only `user` may ask.
  pub async fn list_by_author(
    &self,
    requester: UserId,
    user: UserId,
    item_type: Option<ItemType>,
  ) -> Result<Vec<RatingView>> {
    if requester != user {
      return Err(Error::Forbidden("ratings can only be listed by their owner"));
    }
    let query = RatingQuery { author: Some(user), item_type, ..Default::default() };
    self.store.list_ratings(query).await.into_core()
  }

  /// Ratings `user` can see: their own plus those shared with them. Only
  /// `user` may ask.
  pub async fn list_by_viewer(
    &self,
    requester: UserId,
    user: UserId,
    item_type: Option<ItemType>,
  ) -> Result<Vec<RatingView>> {
    if requester != user {
      return Err(Error::Forbidden("visible ratings can only be listed by their viewer"));
    }
    let query = RatingQuery { visible_to: Some(user), item_type, ..Default::default() };
    self.store.list_ratings(query).await.into_core()
  }

  /// Ratings of one item that `requester` may see.
  pub async fn list_by_item(&self, requester: UserId, item: ItemRef) -> Result<Vec<RatingView>> {
    let query = RatingQuery {
      visible_to: Some(requester),
      item: Some(item),
      ..Default::default()
    };
    self.store.list_ratings(query).await.into_core()
  }

  /// Aggregate over all ratings of `item`. Individual ratings are not exposed.
  pub async fn community_stats(&self, item: ItemRef) -> Result<CommunityStats> {
    self.store.community_stats(item).await.into_core()
  }
}
