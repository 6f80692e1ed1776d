//! Catalog endpoints. Attribute bodies are validated against the item type
//! named in the path.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/items/{item_type}/new` | 201; 409 on a duplicate natural key |
//! | `GET`  | `/api/items/{item_type}/all` | |
//! | `GET`  | `/api/items/{item_type}/{id}` | 404 if not found |
//! | `PUT`  | `/api/items/{item_type}/{id}` | Full replacement of attributes |

use alacarte_core::{
  item::{Item, ItemType},
  store::Store,
};
use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::Value;

use super::item_ref;
use crate::{AppState, auth::Member, error::Error};

/// `POST /api/items/{item_type}/new`
pub async fn create<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Path(item_type): Path<String>,
  Json(attrs): Json<Value>,
) -> Result<impl IntoResponse, Error> {
  let item_type = ItemType::parse(&item_type)?;
  let item = state.catalog().create(item_type, attrs).await?;
  tracing::debug!(user = %user.id, item = %item.item_ref(), "item added by member");
  Ok((StatusCode::CREATED, Json(item)))
}

/// `GET /api/items/{item_type}/all`
pub async fn list<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _member: Member,
  Path(item_type): Path<String>,
) -> Result<Json<Vec<Item>>, Error> {
  let item_type = ItemType::parse(&item_type)?;
  Ok(Json(state.catalog().list(item_type).await?))
}

/// `GET /api/items/{item_type}/{id}`
pub async fn get_one<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _member: Member,
  Path((item_type, id)): Path<(String, i64)>,
) -> Result<Json<Item>, Error> {
  Ok(Json(state.catalog().get(item_ref(&item_type, id)?).await?))
}

/// `PUT /api/items/{item_type}/{id}`
pub async fn update<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _member: Member,
  Path((item_type, id)): Path<(String, i64)>,
  Json(attrs): Json<Value>,
) -> Result<Json<Item>, Error> {
  Ok(Json(state.catalog().update(item_ref(&item_type, id)?, attrs).await?))
}
