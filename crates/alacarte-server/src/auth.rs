//! Bearer-token extractors.
//!
//! Three levels of access, each implying the one before:
//!
//! | Extractor  | Requires |
//! |------------|----------|
//! | [`SignedIn`] | a valid session token for an existing user |
//! | [`Member`]   | the above, plus a completed profile |
//! | [`Admin`]    | the above, plus admin rights |

use alacarte_core::{
  store::{Store, StoreResultExt as _},
  user::User,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};

use crate::{AppState, error::Error};

/// A user holding a valid token, whether or not their profile is complete.
pub struct SignedIn(pub User);

/// A user with a completed profile.
pub struct Member(pub User);

/// A member with admin rights.
pub struct Admin(pub User);

fn bearer(headers: &HeaderMap) -> Result<&str, Error> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(Error::Unauthorized)
}

/// Resolve the request's token to a stored user.
pub async fn authenticate<S: Store>(headers: &HeaderMap, state: &AppState<S>) -> Result<User, Error> {
  let token = bearer(headers)?;
  let id = state.tokens.verify(token).map_err(|e| {
    tracing::debug!(error = %e, "rejected session token");
    Error::Unauthorized
  })?;
  state
    .store
    .get_user(id)
    .await
    .into_core()?
    .ok_or(Error::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for SignedIn
where
  S: Store + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(SignedIn(authenticate(&parts.headers, state).await?))
  }
}

impl<S> FromRequestParts<AppState<S>> for Member
where
  S: Store + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let user = authenticate(&parts.headers, state).await?;
    if !user.profile_completed {
      return Err(Error::ProfileIncomplete);
    }
    Ok(Member(user))
  }
}

impl<S> FromRequestParts<AppState<S>> for Admin
where
  S: Store + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let Member(user) = Member::from_request_parts(parts, state).await?;
    if !state.users().is_admin(&user) {
      return Err(Error::AdminRequired);
    }
    Ok(Admin(user))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tests::{make_state, signed_up};
  use axum::http::Request;

  async fn extract<T>(req: Request<axum::body::Body>, state: &AppState<alacarte_store_sqlite::SqliteStore>) -> Result<T, Error>
  where
    T: FromRequestParts<AppState<alacarte_store_sqlite::SqliteStore>, Rejection = Error>,
  {
    let (mut parts, _) = req.into_parts();
    T::from_request_parts(&mut parts, state).await
  }

  fn with_token(token: &str) -> Request<axum::body::Body> {
    Request::builder()
      .header(header::AUTHORIZATION, format!("Bearer {token}"))
      .body(axum::body::Body::empty())
      .unwrap()
  }

  #[tokio::test]
  async fn missing_header() {
    let state = make_state().await;
    let req = Request::builder().body(axum::body::Body::empty()).unwrap();
    assert!(matches!(extract::<SignedIn>(req, &state).await, Err(Error::Unauthorized)));
  }

  #[tokio::test]
  async fn wrong_scheme() {
    let state = make_state().await;
    let req = Request::builder()
      .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
      .body(axum::body::Body::empty())
      .unwrap();
    assert!(matches!(extract::<SignedIn>(req, &state).await, Err(Error::Unauthorized)));
  }

  #[tokio::test]
  async fn token_for_deleted_user() {
    let state = make_state().await;
    let token = state.tokens.issue(alacarte_core::user::UserId(404)).unwrap();
    assert!(matches!(extract::<SignedIn>(with_token(&token), &state).await, Err(Error::Unauthorized)));
  }

  #[tokio::test]
  async fn incomplete_profile_is_signed_in_but_not_member() {
    let state = make_state().await;
    let user = state.users().sign_in(crate::tests::identity("nova")).await.unwrap();
    let token = state.tokens.issue(user.id).unwrap();

    assert!(extract::<SignedIn>(with_token(&token), &state).await.is_ok());
    assert!(matches!(
      extract::<Member>(with_token(&token), &state).await,
      Err(Error::ProfileIncomplete)
    ));
  }

  #[tokio::test]
  async fn admin_requires_rights() {
    let state = make_state().await;
    let (_, token) = signed_up(&state, "alice").await;
    assert!(extract::<Member>(with_token(&token), &state).await.is_ok());
    assert!(matches!(extract::<Admin>(with_token(&token), &state).await, Err(Error::AdminRequired)));

    // The configured bootstrap address is an admin without the flag.
    let (_, root) = signed_up(&state, "root").await;
    assert!(extract::<Admin>(with_token(&root), &state).await.is_ok());
  }
}
