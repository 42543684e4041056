//! Error types for `casebook-core`.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum Error {
  /// An update targeted a crime that has no stored row.
  #[error("crime not found: {0}")]
  NotFound(Uuid),

  /// The backing store failed. Shared so that a single background write
  /// failure can be reported to every waiter.
  #[error("storage failure: {0}")]
  Storage(#[source] Arc<dyn std::error::Error + Send + Sync>),

  #[error("session for crime {0} has not finished loading")]
  SessionNotReady(Uuid),

  #[error("writer for crime {0} has stopped")]
  WriterStopped(Uuid),
}

impl Error {
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Arc::new(err))
  }

  pub fn is_storage(&self) -> bool { matches!(self, Self::Storage(_)) }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
