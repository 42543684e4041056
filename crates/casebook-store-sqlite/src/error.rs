//! Error type for `casebook-store-sqlite`.

use std::path::PathBuf;

use casebook_core::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("failed to create directory {path}: {source}")]
  CreateDir {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A migration step failed; the whole migration was rolled back.
  #[error("migration to schema version {version} failed: {source}")]
  Migration {
    version: u32,
    #[source]
    source:  rusqlite::Error,
  },

  #[error("schema version {found} is newer than the supported version {supported}")]
  UnsupportedVersion { found: u32, supported: u32 },

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("timestamp out of range: {0} ms")]
  DateOutOfRange(i64),

  /// An update targeted an id with no stored row.
  #[error("crime not found: {0}")]
  CrimeNotFound(Uuid),
}

impl StoreError for Error {
  fn missing_crime(&self) -> Option<Uuid> {
    match self {
      Self::CrimeNotFound(id) => Some(*id),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
