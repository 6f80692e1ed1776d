//! Sign-in and first-time profile setup.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | Liveness probe |
//! | `POST` | `/auth/google` | Body: `{"id_token":"..."}` |
//! | `POST` | `/profile/complete` | Token only; body: `{"display_name":"...","discoverable":true}` |
//! | `GET`  | `/profile/check-display-name` | Token only; `?display_name=...` |
//! | `GET`  | `/api/auth/check-admin` | |

use alacarte_core::{store::Store, user::User};
use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
  AppState,
  auth::{Member, SignedIn},
  error::Error,
};

/// `GET /health`
pub async fn health() -> &'static str { "ok" }

// ─── Google sign-in ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SignInBody {
  pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
  pub token:             String,
  pub user:              User,
  /// Suggested display name for the profile setup form.
  pub display_name_hint: String,
}

/// `POST /auth/google`
pub async fn google_sign_in<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Json(body): Json<SignInBody>,
) -> Result<Json<SignInResponse>, Error> {
  let identity = state.identity.verify(body.id_token.trim()).await?;
  let user = state.users().sign_in(identity).await?;
  let token = state.tokens.issue(user.id)?;
  Ok(Json(SignInResponse {
    token,
    display_name_hint: user.display_name_hint(),
    user,
  }))
}

// ─── Profile setup ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
  pub display_name: String,
  #[serde(default)]
  pub discoverable: Option<bool>,
}

/// `POST /profile/complete`
pub async fn complete_profile<S: Store + 'static>(
  State(state): State<AppState<S>>,
  SignedIn(user): SignedIn,
  Json(body): Json<CompleteBody>,
) -> Result<Json<User>, Error> {
  let user = state
    .users()
    .complete_profile(user.id, &body.display_name, body.discoverable)
    .await?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct CheckNameParams {
  #[serde(default)]
  pub display_name: String,
}

/// `GET /profile/check-display-name?display_name=...`
pub async fn check_display_name<S: Store + 'static>(
  State(state): State<AppState<S>>,
  SignedIn(user): SignedIn,
  Query(params): Query<CheckNameParams>,
) -> Result<Json<Value>, Error> {
  let available = state
    .users()
    .display_name_available(user.id, &params.display_name)
    .await?;
  Ok(Json(json!({ "available": available })))
}

/// `GET /api/auth/check-admin`
pub async fn check_admin<S: Store + 'static>(
  State(state): State<AppState<S>>,
  Member(user): Member,
) -> Json<Value> {
  Json(json!({ "is_admin": state.users().is_admin(&user) }))
}
