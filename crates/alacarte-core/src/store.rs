//! The `Store` trait: everything the services need from persistence.
//!
//! Implemented by storage backends (e.g. `alacarte-store-sqlite`). Services in
//! this crate depend on the trait, never on a concrete backend.
//!
//! Every multi-row mutation (rating creation, viewer-set changes, bulk
//! operations, cascading deletes) must be atomic in the implementation.

use std::future::Future;

use crate::{
  impact::{CascadeReport, DeleteImpact},
  item::{Item, ItemRef, ItemType, ItemValue},
  rating::{CommunityStats, NewRating, Rating, RatingChanges, RatingId, RatingQuery, RatingView},
  user::{NewUser, ProfileUpdate, ShareableUsers, User, UserId},
};

/// Abstraction over an alacarte storage backend.
///
/// Backend errors must convert into [`crate::Error`]; uniqueness violations
/// should surface as [`crate::Error::Conflict`].
pub trait Store: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static + Into<crate::Error>;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user with no display name and `discoverable = true`.
  fn create_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look a user up by the identity provider's subject id.
  fn find_user_by_google_id(
    &self,
    google_id: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Stamp `last_login_at` with the current time.
  fn record_login(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// All users, newest first.
  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Whether `display_name` belongs to any user other than `except`.
  fn display_name_taken(
    &self,
    display_name: String,
    except: Option<UserId>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Set the display name and discoverability and mark the profile complete.
  fn complete_profile(
    &self,
    id: UserId,
    display_name: String,
    discoverable: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Apply the given profile fields; absent fields are left unchanged.
  fn update_profile(
    &self,
    id: UserId,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn set_admin(
    &self,
    id: UserId,
    is_admin: bool,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Candidate share targets for `id`, both lists sorted by display name.
  fn shareable_users(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<ShareableUsers, Self::Error>> + Send + '_;

  /// Dry run of [`Store::delete_user_cascade`]. `None` if the user is absent.
  fn user_delete_impact(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<DeleteImpact>, Self::Error>> + Send + '_;

  /// Atomically remove the user, their ratings and those ratings' viewer
  /// links, their own viewer memberships, and sharing bookkeeping.
  /// `None` if the user is absent.
  fn delete_user_cascade(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<CascadeReport>, Self::Error>> + Send + '_;

  // ── Items ─────────────────────────────────────────────────────────────

  fn insert_item(
    &self,
    value: ItemValue,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  fn get_item(
    &self,
    item: ItemRef,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// All items of one type, ordered by name.
  fn list_items(
    &self,
    item_type: ItemType,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;

  fn item_exists(
    &self,
    item: ItemRef,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Replace an item's attributes. The value's type must match `item`.
  fn update_item(
    &self,
    item: ItemRef,
    value: ItemValue,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  fn set_item_image(
    &self,
    item: ItemRef,
    image_url: Option<String>,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// Dry run of [`Store::delete_item_cascade`]. `None` if the item is absent.
  fn item_delete_impact(
    &self,
    item: ItemRef,
  ) -> impl Future<Output = Result<Option<DeleteImpact>, Self::Error>> + Send + '_;

  /// Atomically remove the item, its ratings and their viewer links.
  fn delete_item_cascade(
    &self,
    item: ItemRef,
  ) -> impl Future<Output = Result<Option<CascadeReport>, Self::Error>> + Send + '_;

  // ── Ratings ───────────────────────────────────────────────────────────

  /// Persist a new rating with an empty viewer set.
  fn insert_rating(
    &self,
    rating: NewRating,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  fn get_rating(
    &self,
    id: RatingId,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + '_;

  /// Ratings matching `query`, with author and viewer summaries, newest first.
  fn list_ratings(
    &self,
    query: RatingQuery,
  ) -> impl Future<Output = Result<Vec<RatingView>, Self::Error>> + Send + '_;

  fn update_rating(
    &self,
    id: RatingId,
    changes: RatingChanges,
  ) -> impl Future<Output = Result<Option<Rating>, Self::Error>> + Send + '_;

  /// Delete a rating and its viewer links. Returns `false` if absent.
  fn delete_rating(
    &self,
    id: RatingId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Add users to a rating's viewer set. Ids that name no user, that are
  /// already viewers, or that name the author are skipped. Records the
  /// author-to-viewer sharing relationship for each added viewer.
  fn add_viewers(
    &self,
    id: RatingId,
    viewers: Vec<UserId>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove users from a rating's viewer set; absent ids are ignored.
  fn remove_viewers(
    &self,
    id: RatingId,
    viewers: Vec<UserId>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Empty the viewer set of every rating authored by `author`. Returns the
  /// number of ratings the author owns.
  fn clear_viewers_by_author(
    &self,
    author: UserId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Remove `viewer` from every rating authored by `author`. Returns how many
  /// ratings actually listed them.
  fn remove_viewer_by_author(
    &self,
    author: UserId,
    viewer: UserId,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Count and mean grade over every rating of `item`, ignoring visibility.
  fn community_stats(
    &self,
    item: ItemRef,
  ) -> impl Future<Output = Result<CommunityStats, Self::Error>> + Send + '_;
}

/// Lift a backend result into the core error type.
pub trait StoreResultExt<T> {
  fn into_core(self) -> crate::Result<T>;
}

impl<T, E: Into<crate::Error>> StoreResultExt<T> for Result<T, E> {
  fn into_core(self) -> crate::Result<T> { self.map_err(Into::into) }
}
