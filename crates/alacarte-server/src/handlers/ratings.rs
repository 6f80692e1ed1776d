//! Rating endpoints. Every mutation is checked against the stored author;
//! every listing only returns ratings the requester may see.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/api/ratings/new` | Body: `{"item_type","item_id","grade","note"?}`; 201, 400 if a field is missing |
//! | `GET`    | `/api/ratings/author/{user_id}` | Own ratings only; optional `?type=` |
//! | `GET`    | `/api/ratings/viewer/{user_id}` | Own plus shared-with-self; self only; optional `?type=` |
//! | `GET`    | `/api/ratings/item/{item_type}/{id}` | Visible ratings of one item |
//! | `PUT`    | `/api/ratings/{id}` | Body: `{"grade","note"?,"item_type"?,"item_id"?}` |
//! | `DELETE` | `/api/ratings/{id}` | 204 |
//! | `PUT`    | `/api/ratings/{id}/share` | Body: `{"user_ids":[..]}` |
//! | `PUT`    | `/api/ratings/{id}/hide` | Body: `{"user_id"}` or `{"user_ids":[..]}` |
//! | `PUT`    | `/api/ratings/bulk/private` | Clears every viewer set of the requester |
//! | `PUT`    | `/api/ratings/bulk/unshare/{user_id}` | Removes one viewer everywhere |

use alacarte_core::{
  engine::{HideTargets, RatingEdit, RatingInput},
  impact::BulkOutcome,
  item::ItemType,
  rating::{RatingId, RatingView},
  store::Store,
  user::UserId,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::item_ref;
use crate::{AppState, auth::Member, error::Error};

#[derive(Debug, Deserialize)]
pub struct TypeFilter {
  #[serde(rename = "type")]
  pub item_type: Option<String>,
}

impl TypeFilter {
  fn resolve(self) -> Result<Option<ItemType>, Error> {
    Ok(self.item_type.as_deref().map(ItemType::parse).transpose()?)
  }
}

// ─── Create / edit / delete ───────────────────────────────────────────────────

/// `POST /api/ratings/new`
pub async fn create<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Json(input): Json<RatingInput>,
) -> Result<impl IntoResponse, Error> {
  let view = state.ratings().create(user.id, input).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `PUT /api/ratings/{id}`
pub async fn edit<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(id): Path<RatingId>,
  Json(edit): Json<RatingEdit>,
) -> Result<Json<RatingView>, Error> {
  Ok(Json(state.ratings().edit(user.id, id, edit).await?))
}

/// `DELETE /api/ratings/{id}`
pub async fn remove<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(id): Path<RatingId>,
) -> Result<StatusCode, Error> {
  state.ratings().remove(user.id, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Sharing ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ShareBody {
  #[serde(default)]
  pub user_ids: Vec<UserId>,
}

/// `PUT /api/ratings/{id}/share`
pub async fn share<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(id): Path<RatingId>,
  Json(body): Json<ShareBody>,
) -> Result<Json<RatingView>, Error> {
  Ok(Json(state.ratings().share(user.id, id, body.user_ids).await?))
}

/// `PUT /api/ratings/{id}/hide`
pub async fn hide<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(id): Path<RatingId>,
  Json(targets): Json<HideTargets>,
) -> Result<Json<RatingView>, Error> {
  Ok(Json(state.ratings().hide(user.id, id, targets).await?))
}

/// `PUT /api/ratings/bulk/private`
pub async fn bulk_private<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
) -> Result<Json<BulkOutcome>, Error> {
  Ok(Json(state.ratings().bulk_make_private(user.id).await?))
}

#[derive(Debug, Serialize)]
pub struct UnshareResponse {
  pub ratings_affected: u64,
  pub removed_user_id:  UserId,
  pub display_name:     String,
}

/// `PUT /api/ratings/bulk/unshare/{user_id}`
pub async fn bulk_unshare<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(target): Path<UserId>,
) -> Result<Json<UnshareResponse>, Error> {
  let outcome = state.ratings().bulk_remove_viewer(user.id, target).await?;
  Ok(Json(UnshareResponse {
    ratings_affected: outcome.ratings_affected,
    removed_user_id:  outcome.removed_user.id,
    display_name:     outcome.removed_user.display_name,
  }))
}

// ─── Listings ─────────────────────────────────────────────────────────────────

/// `GET /api/ratings/author/{user_id}[?type=<item_type>]`
pub async fn by_author<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(author): Path<UserId>,
  Query(filter): Query<TypeFilter>,
) -> Result<Json<Vec<RatingView>>, Error> {
  let item_type = filter.resolve()?;
  Ok(Json(state.ratings().list_by_author(user.id, author, item_type).await?))
}

/// `GET /api/ratings/viewer/{user_id}[?type=<item_type>]`
pub async fn by_viewer<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(viewer): Path<UserId>,
  Query(filter): Query<TypeFilter>,
) -> Result<Json<Vec<RatingView>>, Error> {
  let item_type = filter.resolve()?;
  Ok(Json(state.ratings().list_by_viewer(user.id, viewer, item_type).await?))
}

/// `GET /api/ratings/item/{item_type}/{id}`
pub async fn by_item<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path((item_type, id)): Path<(String, i64)>,
) -> Result<Json<Vec<RatingView>>, Error> {
  let item = item_ref(&item_type, id)?;
  Ok(Json(state.ratings().list_by_item(user.id, item).await?))
}
