//! The requester's own account.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/api/user/me` | |
//! | `PATCH`  | `/api/user/me` | Body: `{"display_name"?, "discoverable"?}` |
//! | `DELETE` | `/api/user/me` | Cascades to ratings and viewer links |
//! | `GET`    | `/api/users/shareable` | Candidates for sharing |

use alacarte_core::{
  impact::CascadeReport,
  store::Store,
  user::{ProfileUpdate, ShareableUsers, User},
};
use axum::{Json, extract::State};

use crate::{AppState, auth::Member, error::Error};

/// `GET /api/user/me`
pub async fn me(Member(user): Member) -> Json<User> { Json(user) }

/// `PATCH /api/user/me`
pub async fn update_me<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
  Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, Error> {
  Ok(Json(state.users().update_profile(user.id, update).await?))
}

/// `DELETE /api/user/me`
pub async fn delete_me<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
) -> Result<Json<CascadeReport>, Error> {
  Ok(Json(state.users().delete(user.id).await?))
}

/// `GET /api/users/shareable`
pub async fn shareable<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
) -> Result<Json<ShareableUsers>, Error> {
  Ok(Json(state.users().shareable_users(user.id).await?))
}
