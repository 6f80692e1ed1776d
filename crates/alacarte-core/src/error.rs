//! Error types for `alacarte-core`.

use thiserror::Error;

use crate::{
  item::{ItemRef, ItemType},
  rating::RatingId,
  user::UserId,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("{0} not found")]
  ItemNotFound(ItemRef),

  #[error("rating not found: {0}")]
  RatingNotFound(RatingId),

  #[error("only the author of rating {0} may change it")]
  NotRatingAuthor(RatingId),

  #[error("forbidden: {0}")]
  Forbidden(&'static str),

  #[error("unknown item type: {0:?}")]
  UnknownItemType(String),

  #[error("expected {expected} attributes, got {actual}")]
  ItemTypeMismatch { expected: ItemType, actual: ItemType },

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Conflict(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification used by transports to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  Forbidden,
  NotFound,
  Conflict,
  Internal,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::UserNotFound(_) | Self::ItemNotFound(_) | Self::RatingNotFound(_) => {
        ErrorKind::NotFound
      }
      Self::NotRatingAuthor(_) | Self::Forbidden(_) => ErrorKind::Forbidden,
      Self::UnknownItemType(_)
      | Self::ItemTypeMismatch { .. }
      | Self::Validation(_) => ErrorKind::Validation,
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::Serialization(_) | Self::Store(_) => ErrorKind::Internal,
    }
  }

  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
