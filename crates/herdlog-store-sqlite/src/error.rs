//! Error type for `herdlog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] herdlog_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An answer referenced a question id missing from `questions`.
  #[error("question {0} is not registered")]
  UnknownQuestion(i64),

  /// Attempted to tombstone an answer that was not found.
  #[error("answer not found: {0}")]
  AnswerNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
