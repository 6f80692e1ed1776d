//! Error type and axum `IntoResponse` implementation.

use alacarte_core::{ErrorKind, identity::IdentityError};
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  #[error("profile setup required")]
  ProfileIncomplete,

  #[error("admin access required")]
  AdminRequired,

  #[error("sign-in failed: {0}")]
  Identity(#[from] IdentityError),

  #[error("token error: {0}")]
  Token(#[from] crate::token::TokenError),

  #[error(transparent)]
  Core(#[from] alacarte_core::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      Error::Identity(e @ IdentityError::Rejected(_)) => {
        tracing::warn!(error = %e, "identity verification failed");
        (StatusCode::UNAUTHORIZED, "invalid identity token".to_owned())
      }
      Error::Identity(e @ IdentityError::Unavailable(_)) => {
        tracing::error!(error = %e, "identity provider unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "identity provider unavailable".to_owned())
      }
      Error::ProfileIncomplete | Error::AdminRequired => (StatusCode::FORBIDDEN, self.to_string()),
      Error::Core(e) => match e.kind() {
        ErrorKind::Validation => (StatusCode::BAD_REQUEST, e.to_string()),
        ErrorKind::Forbidden => (StatusCode::FORBIDDEN, e.to_string()),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
        ErrorKind::Conflict => (StatusCode::CONFLICT, e.to_string()),
        ErrorKind::Internal => internal(e),
      },
      Error::Token(e) => internal(e),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

/// Log the cause and hide it from the client.
fn internal(err: &dyn std::error::Error) -> (StatusCode, String) {
  tracing::error!(error = %err, "request failed");
  (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
}
