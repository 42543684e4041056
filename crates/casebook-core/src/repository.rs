//! The repository facade: the one shared access point to a [`CrimeStore`].
//!
//! There is no process-global instance. Whoever owns session lifetimes
//! constructs a [`Repository`] (or a [`RepositoryCell`] for lazy, at-most-once
//! construction) and hands clones to the sessions it starts.

use std::{future::Future, sync::Arc};

use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
  Error, Result,
  crime::Crime,
  store::{CrimeStore, StoreError},
};

// ─── Repository ──────────────────────────────────────────────────────────────

/// A shared handle to a crime store.
///
/// Cloning is cheap: the store is reference-counted. Every operation is a
/// pass-through; backend errors are mapped into [`Error::NotFound`] or
/// [`Error::Storage`].
pub struct Repository<S> {
  store: Arc<S>,
}

impl<S> Clone for Repository<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: CrimeStore> Repository<S> {
  pub fn new(store: S) -> Self { Self { store: Arc::new(store) } }

  pub fn from_arc(store: Arc<S>) -> Self { Self { store } }

  /// The underlying backend.
  pub fn store(&self) -> &S { &self.store }

  pub async fn get(&self, id: Uuid) -> Result<Option<Crime>> {
    self.store.get_crime(id).await.map_err(classify)
  }

  pub async fn insert(&self, crime: Crime) -> Result<()> {
    self.store.insert_crime(crime).await.map_err(classify)
  }

  pub async fn update(&self, crime: Crime) -> Result<()> {
    self.store.update_crime(crime).await.map_err(classify)
  }
}

fn classify<E: StoreError>(err: E) -> Error {
  match err.missing_crime() {
    Some(id) => Error::NotFound(id),
    None => Error::storage(err),
  }
}

// ─── Lazy construction ───────────────────────────────────────────────────────

/// An explicitly owned slot that opens its repository on first use.
///
/// Concurrent first callers of [`get_or_open`](Self::get_or_open) race on a
/// single initialisation: the opener runs at most once on success and every
/// caller receives a handle to the same store.
pub struct RepositoryCell<S> {
  cell: OnceCell<Repository<S>>,
}

impl<S> Default for RepositoryCell<S> {
  fn default() -> Self { Self::new() }
}

impl<S> RepositoryCell<S> {
  pub const fn new() -> Self { Self { cell: OnceCell::const_new() } }

  /// The repository, if it has been opened.
  pub fn get(&self) -> Option<Repository<S>> { self.cell.get().cloned() }
}

impl<S: CrimeStore> RepositoryCell<S> {
  /// Return the repository, opening the store with `open` if this is the
  /// first call. A failed open leaves the cell empty so a later call may
  /// retry.
  pub async fn get_or_open<F, Fut, E>(&self, open: F) -> Result<Repository<S>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S, E>>,
  {
    let repo = self
      .cell
      .get_or_try_init(|| async move {
        let store = open().await?;
        tracing::debug!("repository opened");
        Ok::<_, E>(Repository::new(store))
      })
      .await?;
    Ok(repo.clone())
  }
}
