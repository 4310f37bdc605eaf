//! Error types for `herdlog-core`.
//!
//! A lookup that finds nothing is not an error; it surfaces as `None` or an
//! empty value. The variants here are caller-contract violations and
//! infrastructure failures.

use std::time::Duration;

use thiserror::Error;

use crate::tag::Tag;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unregistered tag id: {0}")]
  UnregisteredTag(i64),

  #[error("tag registry is missing tags: {0:?}")]
  MissingTags(Vec<Tag>),

  #[error("invalid animal identity: {0}")]
  InvalidIdentity(String),

  #[error("invalid date: {0:?}")]
  InvalidDate(String),

  #[error("operation exceeded its deadline of {0:?}")]
  DeadlineExceeded(Duration),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error. Used at every store call site in the engine.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// True when the failure was the caller's fault rather than the store's.
  pub fn is_contract_violation(&self) -> bool {
    matches!(
      self,
      Self::UnregisteredTag(_) | Self::InvalidIdentity(_) | Self::InvalidDate(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
