//! The `CrimeStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `casebook-store-sqlite`).
//! Higher layers reach it only through
//! [`Repository`](crate::repository::Repository).

use std::future::Future;

use uuid::Uuid;

use crate::crime::Crime;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Backend error types expose whether a failure was a missing row so the
/// repository can report [`Error::NotFound`](crate::Error::NotFound) without
/// knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The id of the crime that was expected but absent, if that is what
  /// this error means.
  fn missing_crime(&self) -> Option<Uuid>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable, key-indexed storage for crime records.
///
/// Implementations must serialise writes: two concurrent `insert_crime` /
/// `update_crime` calls never interleave at the storage level.
///
/// All methods return `Send` futures so the store can be driven from spawned
/// tokio tasks.
pub trait CrimeStore: Send + Sync + 'static {
  type Error: StoreError;

  /// Retrieve a crime by id. Returns `None` if no row matches.
  fn get_crime(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Crime>, Self::Error>> + Send + '_;

  /// Insert `crime`, replacing every column of any existing row with the
  /// same id.
  fn insert_crime(
    &self,
    crime: Crime,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite every column of the row whose id is `crime.id`.
  ///
  /// Fails with an error whose [`StoreError::missing_crime`] is `Some` when
  /// no such row exists; nothing is written in that case.
  fn update_crime(
    &self,
    crime: Crime,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
