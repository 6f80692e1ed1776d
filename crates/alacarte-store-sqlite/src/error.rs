//! Error type for `alacarte-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] alacarte_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A uniqueness constraint rejected the write.
  #[error("{0}")]
  Conflict(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for alacarte_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Conflict(msg) => Self::Conflict(msg),
      other => Self::Store(Box::new(other)),
    }
  }
}

/// Turn a unique/primary-key violation into [`Error::Conflict`] with `msg`;
/// pass every other database error through.
pub(crate) fn conflict_on_unique(err: tokio_rusqlite::Error, msg: &str) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _)) = &err
    && (failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
      || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
  {
    return Error::Conflict(msg.to_owned());
  }
  Error::Database(err)
}
