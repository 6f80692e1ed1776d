//! Integration tests for `SqliteStore` and the services built on it, against
//! an in-memory database.

use std::sync::Arc;

use alacarte_core::{
  Error, ErrorKind,
  catalog::Catalog,
  directory::UserDirectory,
  engine::{HideTargets, RatingEdit, RatingEngine, RatingInput},
  identity::VerifiedIdentity,
  item::{ItemRef, ItemType},
  rating::{Privacy, RatingId, RatingView},
  store::Store,
  user::{ProfileUpdate, User, UserId},
};
use serde_json::json;

use crate::SqliteStore;

async fn store() -> Arc<SqliteStore> {
  Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn identity(handle: &str) -> VerifiedIdentity {
  VerifiedIdentity {
    subject_id: format!("google-{handle}"),
    email:      format!("{handle}@example.org"),
    full_name:  format!("{handle} Tester"),
    avatar_url: String::new(),
  }
}

/// Register a user and complete their profile with `handle` as display name.
async fn user(s: &Arc<SqliteStore>, handle: &str) -> User {
  let dir = UserDirectory::new(Arc::clone(s), None);
  let user = dir.sign_in(identity(handle)).await.unwrap();
  dir.complete_profile(user.id, handle, Some(true)).await.unwrap()
}

async fn cheese(s: &Arc<SqliteStore>, name: &str) -> ItemRef {
  Catalog::new(Arc::clone(s))
    .create(ItemType::Cheese, json!({ "name": name, "type": "soft" }))
    .await
    .unwrap()
    .item_ref()
}

fn input(item: ItemRef, grade: f32) -> RatingInput {
  RatingInput {
    item_type: Some(item.item_type.as_str().to_owned()),
    item_id:   Some(item.item_id.0),
    grade:     Some(grade),
    note:      Some("creamy".into()),
  }
}

fn viewer_ids(view: &RatingView) -> Vec<UserId> { view.viewers.iter().map(|v| v.id).collect() }

// ─── Rating creation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn new_rating_is_private() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let brie = cheese(&s, "Brie").await;

  let view = engine.create(alice.id, input(brie, 4.0)).await.unwrap();
  assert_eq!(view.rating.author_id, alice.id);
  assert_eq!(view.author.display_name, "alice");
  assert!(view.viewers.is_empty());
  assert_eq!(view.privacy(), Privacy::Private);

  assert!(engine.list_by_item(bob.id, brie).await.unwrap().is_empty());
  assert_eq!(engine.list_by_item(alice.id, brie).await.unwrap().len(), 1);
}

#[tokio::test]
async fn create_requires_existing_item_and_grade() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;

  let missing = ItemRef::new(ItemType::Gin, 99);
  let err = engine.create(alice.id, input(missing, 3.0)).await.unwrap_err();
  assert!(matches!(err, Error::ItemNotFound(r) if r == missing));

  let brie = cheese(&s, "Brie").await;
  let mut no_grade = input(brie, 0.0);
  no_grade.grade = None;
  let err = engine.create(alice.id, no_grade).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let mut bad_type = input(brie, 2.0);
  bad_type.item_type = Some("beer".into());
  let err = engine.create(alice.id, bad_type).await.unwrap_err();
  assert!(matches!(err, Error::UnknownItemType(_)));

  let mut no_item_id = input(brie, 2.0);
  no_item_id.item_id = None;
  let err = engine.create(alice.id, no_item_id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let mut no_item_type = input(brie, 2.0);
  no_item_type.item_type = None;
  let err = engine.create(alice.id, no_item_type).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

// ─── Sharing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn share_adds_viewers_and_ignores_author_duplicates_and_unknowns() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let brie = cheese(&s, "Brie").await;
  let rating = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;

  let view = engine
    .share(alice.id, rating, vec![bob.id, alice.id, bob.id, UserId(4242)])
    .await
    .unwrap();
  assert_eq!(viewer_ids(&view), vec![bob.id]);
  assert_eq!(view.privacy(), Privacy::Shared);

  // Sharing again is a no-op; adding carol extends the set.
  let view = engine.share(alice.id, rating, vec![bob.id, carol.id]).await.unwrap();
  assert_eq!(viewer_ids(&view), vec![bob.id, carol.id]);

  let shared = engine.list_by_viewer(bob.id, bob.id, None).await.unwrap();
  assert_eq!(shared.len(), 1);
  assert!(shared[0].is_visible_to(bob.id));
  // Viewer summaries never leak email addresses.
  let wire = serde_json::to_string(&shared[0]).unwrap();
  assert!(!wire.contains("@example.org"));
}

#[tokio::test]
async fn store_refuses_author_as_viewer() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let brie = cheese(&s, "Brie").await;
  let rating = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;

  // Bypass the engine's filtering.
  s.add_viewers(rating, vec![alice.id]).await.unwrap();
  let view = engine.share(alice.id, rating, vec![]).await.unwrap();
  assert!(view.viewers.is_empty());
}

#[tokio::test]
async fn only_author_may_mutate() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let brie = cheese(&s, "Brie").await;
  let rating = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.share(alice.id, rating, vec![bob.id]).await.unwrap();

  let err = engine.share(bob.id, rating, vec![bob.id]).await.unwrap_err();
  assert!(matches!(err, Error::NotRatingAuthor(id) if id == rating));

  let targets = HideTargets { user_id: Some(bob.id), user_ids: None };
  let err = engine.hide(bob.id, rating, targets).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let edit = RatingEdit { grade: Some(1.0), ..Default::default() };
  let err = engine.edit(bob.id, rating, edit).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let err = engine.remove(bob.id, rating).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let err = engine.remove(alice.id, RatingId(777)).await.unwrap_err();
  assert!(matches!(err, Error::RatingNotFound(_)));
}

#[tokio::test]
async fn hide_prefers_batch_and_ignores_non_viewers() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let dave = user(&s, "dave").await;
  let brie = cheese(&s, "Brie").await;
  let rating = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.share(alice.id, rating, vec![bob.id, carol.id]).await.unwrap();

  let targets = HideTargets { user_id: Some(bob.id), user_ids: Some(vec![carol.id, dave.id]) };
  let view = engine.hide(alice.id, rating, targets).await.unwrap();
  assert_eq!(viewer_ids(&view), vec![bob.id]);

  let err = engine.hide(alice.id, rating, HideTargets::default()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn hide_checks_rating_and_owner_before_targets() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let brie = cheese(&s, "Brie").await;
  let rating = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;

  let err = engine.hide(alice.id, RatingId(777), HideTargets::default()).await.unwrap_err();
  assert!(matches!(err, Error::RatingNotFound(_)));

  let err = engine.hide(bob.id, rating, HideTargets::default()).await.unwrap_err();
  assert!(matches!(err, Error::NotRatingAuthor(_)));
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn viewer_listing_includes_own_ratings() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let brie = cheese(&s, "Brie").await;

  let shared = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  let own = engine.create(bob.id, input(brie, 2.0)).await.unwrap().rating.id;
  engine.create(carol.id, input(brie, 5.0)).await.unwrap();
  engine.share(alice.id, shared, vec![bob.id]).await.unwrap();

  let mut ids: Vec<RatingId> = engine
    .list_by_viewer(bob.id, bob.id, None)
    .await
    .unwrap()
    .iter()
    .map(|v| v.rating.id)
    .collect();
  ids.sort();
  assert_eq!(ids, vec![shared, own]);

  let wine_only = engine.list_by_viewer(bob.id, bob.id, Some(ItemType::Wine)).await.unwrap();
  assert!(wine_only.is_empty());
}

#[tokio::test]
async fn lists_are_owner_only() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;

  let err = engine.list_by_author(bob.id, alice.id, None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
  let err = engine.list_by_viewer(alice.id, bob.id, None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
async fn list_by_author_filters_by_type() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let brie = cheese(&s, "Brie").await;
  let gin = Catalog::new(Arc::clone(&s))
    .create(
      ItemType::Gin,
      json!({ "name": "Monkey 47", "producer": "Black Forest", "profile": "herbal" }),
    )
    .await
    .unwrap()
    .item_ref();
  engine.create(alice.id, input(brie, 4.0)).await.unwrap();
  engine.create(alice.id, input(gin, 5.0)).await.unwrap();

  let all = engine.list_by_author(alice.id, alice.id, None).await.unwrap();
  assert_eq!(all.len(), 2);
  // Newest first.
  assert_eq!(all[0].rating.item, gin);

  let gins = engine
    .list_by_author(alice.id, alice.id, Some(ItemType::Gin))
    .await
    .unwrap();
  assert_eq!(gins.len(), 1);
  assert_eq!(gins[0].rating.item, gin);
}

#[tokio::test]
async fn list_by_item_shows_own_and_shared_only() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let brie = cheese(&s, "Brie").await;

  let shared = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.share(alice.id, shared, vec![bob.id]).await.unwrap();
  engine.create(carol.id, input(brie, 2.0)).await.unwrap();
  let own = engine.create(bob.id, input(brie, 3.0)).await.unwrap().rating.id;

  let visible = engine.list_by_item(bob.id, brie).await.unwrap();
  let mut ids: Vec<RatingId> = visible.iter().map(|v| v.rating.id).collect();
  ids.sort();
  assert_eq!(ids, vec![shared, own]);
  assert!(visible.iter().all(|v| v.is_visible_to(bob.id)));
}

#[tokio::test]
async fn community_stats_ignore_visibility() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let brie = cheese(&s, "Brie").await;
  let comte = cheese(&s, "Comté").await;

  for (author, grade) in [(&alice, 5.0), (&bob, 3.0), (&carol, 4.0)] {
    engine.create(author.id, input(brie, grade)).await.unwrap();
  }

  let stats = engine.community_stats(brie).await.unwrap();
  assert_eq!(stats.total_ratings, 3);
  assert!((stats.average_rating - 4.0).abs() < 1e-9);

  let empty = engine.community_stats(comte).await.unwrap();
  assert_eq!(empty.total_ratings, 0);
  assert_eq!(empty.average_rating, 0.0);
}

// ─── Edit / remove ───────────────────────────────────────────────────────────

#[tokio::test]
async fn edit_keeps_viewers_and_checks_new_item() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let brie = cheese(&s, "Brie").await;
  let comte = cheese(&s, "Comté").await;
  let rating = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.share(alice.id, rating, vec![bob.id]).await.unwrap();

  let edit = RatingEdit { grade: Some(2.5), ..Default::default() };
  let view = engine.edit(alice.id, rating, edit).await.unwrap();
  assert_eq!(view.rating.grade, 2.5);
  assert_eq!(view.rating.note, "creamy");
  assert_eq!(view.rating.item, brie);
  assert_eq!(viewer_ids(&view), vec![bob.id]);

  let edit = RatingEdit {
    grade: Some(3.0),
    note: Some(String::new()),
    item_type: Some("cheese".into()),
    item_id: Some(comte.item_id.0),
  };
  let view = engine.edit(alice.id, rating, edit).await.unwrap();
  assert_eq!(view.rating.item, comte);
  assert_eq!(view.rating.note, "");

  let edit = RatingEdit {
    grade: Some(3.0),
    item_type: Some("cheese".into()),
    item_id: Some(999),
    ..Default::default()
  };
  let err = engine.edit(alice.id, rating, edit).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);

  let edit = RatingEdit { grade: Some(3.0), item_id: Some(1), ..Default::default() };
  let err = engine.edit(alice.id, rating, edit).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn remove_drops_viewer_links() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let brie = cheese(&s, "Brie").await;
  let rating = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.share(alice.id, rating, vec![bob.id]).await.unwrap();

  engine.remove(alice.id, rating).await.unwrap();
  assert!(s.get_rating(rating).await.unwrap().is_none());
  assert!(engine.list_by_viewer(bob.id, bob.id, None).await.unwrap().is_empty());
}

// ─── Bulk operations ─────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_make_private_counts_owned_ratings() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let brie = cheese(&s, "Brie").await;
  let comte = cheese(&s, "Comté").await;

  let a = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.create(alice.id, input(comte, 3.0)).await.unwrap();
  let foreign = engine.create(bob.id, input(brie, 1.0)).await.unwrap().rating.id;
  engine.share(alice.id, a, vec![bob.id]).await.unwrap();
  engine.share(bob.id, foreign, vec![alice.id]).await.unwrap();

  let outcome = engine.bulk_make_private(alice.id).await.unwrap();
  assert_eq!(outcome.ratings_affected, 2);
  let own = engine.list_by_author(alice.id, alice.id, None).await.unwrap();
  assert!(own.iter().all(|v| v.privacy() == Privacy::Private));

  // Other authors' sharing is untouched.
  let visible = engine.list_by_viewer(alice.id, alice.id, None).await.unwrap();
  assert_eq!(visible.len(), 3);
  assert!(visible.iter().any(|v| v.rating.id == foreign));

  // Re-running is harmless.
  assert_eq!(engine.bulk_make_private(alice.id).await.unwrap().ratings_affected, 2);
}

#[tokio::test]
async fn bulk_remove_viewer_counts_only_listed_ratings() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let brie = cheese(&s, "Brie").await;
  let comte = cheese(&s, "Comté").await;

  let a = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  let b = engine.create(alice.id, input(comte, 3.0)).await.unwrap().rating.id;
  engine.share(alice.id, a, vec![bob.id, carol.id]).await.unwrap();
  engine.share(alice.id, b, vec![carol.id]).await.unwrap();

  let unshared = engine.bulk_remove_viewer(alice.id, bob.id).await.unwrap();
  assert_eq!(unshared.ratings_affected, 1);
  assert_eq!(unshared.removed_user.display_name, "bob");
  assert!(engine.list_by_viewer(bob.id, bob.id, None).await.unwrap().is_empty());
  assert_eq!(engine.list_by_viewer(carol.id, carol.id, None).await.unwrap().len(), 2);

  let err = engine.bulk_remove_viewer(alice.id, UserId(9999)).await.unwrap_err();
  assert!(matches!(err, Error::UserNotFound(_)));
}

#[tokio::test]
async fn bulk_remove_viewer_leaves_other_authors_shares() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;

  let mut alices = Vec::new();
  for name in ["Brie", "Comté", "Morbier", "Munster", "Cantal"] {
    let item = cheese(&s, name).await;
    alices.push(engine.create(alice.id, input(item, 3.0)).await.unwrap().rating.id);
  }
  engine.share(alice.id, alices[0], vec![bob.id]).await.unwrap();
  engine.share(alice.id, alices[1], vec![bob.id, carol.id]).await.unwrap();
  engine.share(alice.id, alices[2], vec![carol.id]).await.unwrap();

  let salers = cheese(&s, "Salers").await;
  let carols = engine.create(carol.id, input(salers, 4.5)).await.unwrap().rating.id;
  engine.share(carol.id, carols, vec![bob.id]).await.unwrap();

  let unshared = engine.bulk_remove_viewer(alice.id, bob.id).await.unwrap();
  assert_eq!(unshared.ratings_affected, 2);

  let own = engine.list_by_author(alice.id, alice.id, None).await.unwrap();
  assert_eq!(own.len(), 5);
  assert!(own.iter().all(|v| !v.is_visible_to(bob.id)));
  let comte = own.iter().find(|v| v.rating.id == alices[1]).unwrap();
  assert_eq!(viewer_ids(comte), vec![carol.id]);
  let morbier = own.iter().find(|v| v.rating.id == alices[2]).unwrap();
  assert_eq!(viewer_ids(morbier), vec![carol.id]);

  let for_bob = engine.list_by_viewer(bob.id, bob.id, None).await.unwrap();
  assert_eq!(for_bob.len(), 1);
  assert_eq!(for_bob[0].rating.id, carols);
  assert_eq!(viewer_ids(&for_bob[0]), vec![bob.id]);
}

// ─── Cascading deletes ───────────────────────────────────────────────────────

#[tokio::test]
async fn user_delete_impact_matches_cascade() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let dir = UserDirectory::new(Arc::clone(&s), None);
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let brie = cheese(&s, "Brie").await;
  let comte = cheese(&s, "Comté").await;

  let a = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  let b = engine.create(alice.id, input(comte, 3.0)).await.unwrap().rating.id;
  engine.share(alice.id, a, vec![bob.id, carol.id]).await.unwrap();
  engine.share(alice.id, b, vec![bob.id]).await.unwrap();
  let bobs = engine.create(bob.id, input(brie, 2.0)).await.unwrap().rating.id;
  engine.share(bob.id, bobs, vec![alice.id]).await.unwrap();

  let impact = dir.delete_impact(alice.id).await.unwrap();
  assert_eq!(impact.ratings_count, 2);
  assert_eq!(impact.sharings_count, 3);
  assert_eq!(impact.users_affected, 2);
  assert_eq!(impact.affected_users[0].id, bob.id);
  assert_eq!(impact.affected_users[0].ratings_count, 2);
  assert_eq!(impact.affected_users[1].ratings_count, 1);

  // The preview mutates nothing.
  assert_eq!(engine.list_by_viewer(bob.id, bob.id, None).await.unwrap().len(), 3);

  let report = dir.delete(alice.id).await.unwrap();
  assert_eq!(report.ratings_deleted, 2);
  assert_eq!(report.viewer_links_deleted, 4);

  assert!(s.get_user(alice.id).await.unwrap().is_none());
  assert!(s.get_rating(a).await.unwrap().is_none());
  let remaining = engine.list_by_viewer(bob.id, bob.id, None).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].rating.id, bobs);
  let survivor = engine.list_by_author(bob.id, bob.id, None).await.unwrap();
  assert_eq!(survivor.len(), 1);
  assert!(survivor[0].viewers.is_empty());

  let err = dir.delete(alice.id).await.unwrap_err();
  assert!(matches!(err, Error::UserNotFound(_)));
}

#[tokio::test]
async fn item_delete_cascades_to_ratings() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let catalog = Catalog::new(Arc::clone(&s));
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let brie = cheese(&s, "Brie").await;
  let comte = cheese(&s, "Comté").await;

  let a = engine.create(alice.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.share(alice.id, a, vec![bob.id]).await.unwrap();
  engine.create(bob.id, input(brie, 2.0)).await.unwrap();
  engine.create(bob.id, input(comte, 5.0)).await.unwrap();

  let impact = catalog.delete_impact(brie).await.unwrap();
  assert_eq!(impact.ratings_count, 2);
  assert_eq!(impact.users_affected, 2);
  assert_eq!(impact.sharings_count, 1);
  assert!(!impact.warnings().is_empty());

  let report = catalog.delete(brie).await.unwrap();
  assert_eq!(report.ratings_deleted, 2);
  assert_eq!(report.viewer_links_deleted, 1);

  assert!(!catalog.exists(brie).await.unwrap());
  assert_eq!(engine.community_stats(brie).await.unwrap().total_ratings, 0);
  assert_eq!(engine.list_by_author(bob.id, bob.id, None).await.unwrap().len(), 1);

  let err = catalog.delete_impact(brie).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn natural_key_conflicts() {
  let s = store().await;
  let catalog = Catalog::new(Arc::clone(&s));
  let rouge = json!({ "name": "Cuvée", "country": "France", "color": "Rouge" });
  catalog.create(ItemType::Wine, rouge.clone()).await.unwrap();

  let err = catalog.create(ItemType::Wine, rouge).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let blanc = catalog
    .create(ItemType::Wine, json!({ "name": "Cuvée", "country": "France", "color": "Blanc" }))
    .await
    .unwrap();

  let err = catalog
    .update(
      blanc.item_ref(),
      json!({ "name": "Cuvée", "country": "Italie", "color": "Rouge" }),
    )
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);

  let listed = catalog.list(ItemType::Wine).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert!(catalog.list(ItemType::Coffee).await.unwrap().is_empty());
}

#[tokio::test]
async fn item_update_and_image_reference() {
  let s = store().await;
  let catalog = Catalog::new(Arc::clone(&s));
  let brie = cheese(&s, "Brie").await;

  let updated = catalog
    .update(brie, json!({ "name": "Brie de Meaux", "type": "soft", "origin": "France" }))
    .await
    .unwrap();
  assert_eq!(updated.value.name(), "Brie de Meaux");

  let with_image = catalog
    .set_image(brie, Some("images/brie.webp".into()))
    .await
    .unwrap();
  assert_eq!(with_image.image_url.as_deref(), Some("images/brie.webp"));
  let cleared = catalog.set_image(brie, Some("  ".into())).await.unwrap();
  assert!(cleared.image_url.is_none());

  let err = catalog.get(ItemRef::new(ItemType::Cheese, 404)).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sign_in_creates_once_then_reuses() {
  let s = store().await;
  let dir = UserDirectory::new(Arc::clone(&s), None);

  let first = dir.sign_in(identity("erin")).await.unwrap();
  assert!(!first.profile_completed);
  assert!(first.discoverable);
  assert!(first.display_name.is_none());
  assert!(first.avatar.contains("ui-avatars.com"));

  let again = dir.sign_in(identity("erin")).await.unwrap();
  assert_eq!(again.id, first.id);
  assert!(again.last_login_at >= first.last_login_at);
  assert_eq!(s.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn display_names_are_unique() {
  let s = store().await;
  let dir = UserDirectory::new(Arc::clone(&s), None);
  let alice = user(&s, "alice").await;
  let newcomer = dir.sign_in(identity("zed")).await.unwrap();

  assert!(!dir.display_name_available(newcomer.id, "alice").await.unwrap());
  assert!(dir.display_name_available(alice.id, "alice").await.unwrap());

  let err = dir.complete_profile(newcomer.id, "alice", None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
  let err = dir.complete_profile(newcomer.id, "z", None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = dir
    .update_profile(alice.id, ProfileUpdate::default())
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let updated = dir
    .update_profile(alice.id, ProfileUpdate { display_name: None, discoverable: Some(false) })
    .await
    .unwrap();
  assert!(!updated.discoverable);
  assert_eq!(updated.display_name.as_deref(), Some("alice"));
}

#[tokio::test]
async fn shareable_users_split_previous_connections() {
  let s = store().await;
  let engine = RatingEngine::new(Arc::clone(&s));
  let dir = UserDirectory::new(Arc::clone(&s), None);
  let alice = user(&s, "alice").await;
  let bob = user(&s, "bob").await;
  let carol = user(&s, "carol").await;
  let hidden = user(&s, "hidden").await;
  dir
    .update_profile(hidden.id, ProfileUpdate { display_name: None, discoverable: Some(false) })
    .await
    .unwrap();
  dir.sign_in(identity("incomplete")).await.unwrap();

  let brie = cheese(&s, "Brie").await;
  let rating = engine.create(bob.id, input(brie, 4.0)).await.unwrap().rating.id;
  engine.share(bob.id, rating, vec![alice.id]).await.unwrap();

  let shareable = dir.shareable_users(alice.id).await.unwrap();
  let previous: Vec<UserId> = shareable.previous_connections.iter().map(|u| u.id).collect();
  let discoverable: Vec<UserId> = shareable.discoverable.iter().map(|u| u.id).collect();
  assert_eq!(previous, vec![bob.id]);
  assert_eq!(discoverable, vec![carol.id]);

  // The connection outlives the share itself.
  engine.bulk_make_private(bob.id).await.unwrap();
  let shareable = dir.shareable_users(alice.id).await.unwrap();
  assert_eq!(shareable.previous_connections.len(), 1);
}

#[tokio::test]
async fn promote_and_demote_rules() {
  let s = store().await;
  let alice = user(&s, "alice").await;
  let root = user(&s, "root").await;
  let dir = UserDirectory::new(Arc::clone(&s), Some("root@example.org".into()));

  assert!(dir.is_admin(&root));
  assert!(!dir.is_admin(&alice));

  let err = dir.demote(alice.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let promoted = dir.promote(alice.id).await.unwrap();
  assert!(promoted.is_admin);
  let err = dir.promote(alice.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert!(!dir.demote(alice.id).await.unwrap().is_admin);

  dir.promote(root.id).await.unwrap();
  let err = dir.demote(root.id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Forbidden);

  let err = dir.promote(UserId(31337)).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}
