//! `GET /api/stats/community/{item_type}/{id}`: aggregate over every rating
//! of an item, regardless of who may see the individual ratings.

use alacarte_core::{item::ItemRef, store::Store};
use axum::{
  Json,
  extract::{Path, State},
};
use serde::Serialize;

use super::item_ref;
use crate::{AppState, auth::Member, error::Error};

#[derive(Debug, Serialize)]
pub struct CommunityResponse {
  #[serde(flatten)]
  pub item:           ItemRef,
  pub total_ratings:  u64,
  pub average_rating: f64,
}

pub async fn community<S: Store + 'static>(
  State(state): State<AppState<S>>,
  _member: Member,
  Path((item_type, id)): Path<(String, i64)>,
) -> Result<Json<CommunityResponse>, Error> {
  let item = item_ref(&item_type, id)?;
  let stats = state.ratings().community_stats(item).await?;
  Ok(Json(CommunityResponse {
    item,
    total_ratings: stats.total_ratings,
    average_rating: stats.average_rating,
  }))
}
