//! Administration endpoints. All of them require [`Admin`].
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/admin/users` | Newest first, includes email |
//! | `GET`    | `/admin/users/{id}` | |
//! | `GET`    | `/admin/users/{id}/delete-impact` | Dry run of the user cascade |
//! | `DELETE` | `/admin/users/{id}` | |
//! | `PATCH`  | `/admin/users/{id}/promote` | 400 if already admin |
//! | `PATCH`  | `/admin/users/{id}/demote` | 403 for the initial admin |
//! | `GET`    | `/admin/items/{item_type}/{id}/delete-impact` | Dry run of the item cascade |
//! | `DELETE` | `/admin/items/{item_type}/{id}` | |
//! | `PUT`    | `/admin/items/{item_type}/{id}/image` | Body: `{"image_url":"..."}`; null clears |

use alacarte_core::{
  impact::{CascadeReport, DeleteImpact},
  item::Item,
  store::Store,
  user::{User, UserId},
};
use axum::{
  Json,
  extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use super::item_ref;
use crate::{AppState, auth::Admin, error::Error};

/// Preview returned before a destructive admin action.
#[derive(Debug, Serialize)]
pub struct ImpactResponse {
  pub can_delete: bool,
  pub warnings:   Vec<String>,
  pub impact:     DeleteImpact,
}

impl From<DeleteImpact> for ImpactResponse {
  fn from(impact: DeleteImpact) -> Self {
    Self { can_delete: true, warnings: impact.warnings(), impact }
  }
}

// ─── Users ────────────────────────────────────────────────────────────────────

/// `GET /admin/users`
pub async fn list_users<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
) -> Result<Json<Vec<User>>, Error> {
  Ok(Json(state.users().list().await?))
}

/// `GET /admin/users/{id}`
pub async fn user_details<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<UserId>,
) -> Result<Json<User>, Error> {
  Ok(Json(state.users().get(id).await?))
}

/// `GET /admin/users/{id}/delete-impact`
pub async fn user_delete_impact<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<UserId>,
) -> Result<Json<ImpactResponse>, Error> {
  Ok(Json(state.users().delete_impact(id).await?.into()))
}

/// `DELETE /admin/users/{id}`
pub async fn delete_user<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path(id): Path<UserId>,
) -> Result<Json<CascadeReport>, Error> {
  let report = state.users().delete(id).await?;
  tracing::info!(admin = %admin.id, user = %id, "user deleted by admin");
  Ok(Json(report))
}

/// `PATCH /admin/users/{id}/promote`
pub async fn promote<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<UserId>,
) -> Result<Json<User>, Error> {
  Ok(Json(state.users().promote(id).await?))
}

/// `PATCH /admin/users/{id}/demote`
pub async fn demote<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path(id): Path<UserId>,
) -> Result<Json<User>, Error> {
  Ok(Json(state.users().demote(id).await?))
}

// ─── Items ────────────────────────────────────────────────────────────────────

/// `GET /admin/items/{item_type}/{id}/delete-impact`
pub async fn item_delete_impact<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path((item_type, id)): Path<(String, i64)>,
) -> Result<Json<ImpactResponse>, Error> {
  let item = item_ref(&item_type, id)?;
  Ok(Json(state.catalog().delete_impact(item).await?.into()))
}

/// `DELETE /admin/items/{item_type}/{id}`
pub async fn delete_item<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Admin(admin): Admin,
  Path((item_type, id)): Path<(String, i64)>,
) -> Result<Json<CascadeReport>, Error> {
  let item = item_ref(&item_type, id)?;
  let report = state.catalog().delete(item).await?;
  tracing::info!(admin = %admin.id, item = %item, "item deleted by admin");
  Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ImageBody {
  pub image_url: Option<String>,
}

/// `PUT /admin/items/{item_type}/{id}/image`
pub async fn set_item_image<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _admin: Admin,
  Path((item_type, id)): Path<(String, i64)>,
  Json(body): Json<ImageBody>,
) -> Result<Json<Item>, Error> {
  let item = item_ref(&item_type, id)?;
  Ok(Json(state.catalog().set_image(item, body.image_url).await?))
}
