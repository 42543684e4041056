//! An in-memory [`CrimeStore`] that records every call, for unit tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use thiserror::Error;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use uuid::Uuid;

use crate::{
  crime::Crime,
  store::{CrimeStore, StoreError},
};

#[derive(Debug, Error)]
pub enum MemoryStoreError {
  #[error("no crime with id {0}")]
  Missing(Uuid),
  #[error("store unavailable")]
  Unavailable,
}

impl StoreError for MemoryStoreError {
  fn missing_crime(&self) -> Option<Uuid> {
    match self {
      Self::Missing(id) => Some(*id),
      Self::Unavailable => None,
    }
  }
}

#[derive(Default)]
pub struct MemoryStore {
  rows:        Mutex<HashMap<Uuid, Crime>>,
  gets:        AtomicUsize,
  inserts:     AtomicUsize,
  updates:     AtomicUsize,
  /// Every record passed to a successful `update_crime`, in apply order.
  updated:     Mutex<Vec<Crime>>,
  fail_writes: AtomicBool,
  gate:        Arc<RwLock<()>>,
}

impl MemoryStore {
  pub fn with(crimes: impl IntoIterator<Item = Crime>) -> Self {
    let store = Self::default();
    {
      let mut rows = store.rows.lock().unwrap();
      for crime in crimes {
        rows.insert(crime.id, crime);
      }
    }
    store
  }

  pub fn row(&self, id: Uuid) -> Option<Crime> {
    self.rows.lock().unwrap().get(&id).cloned()
  }

  pub fn gets(&self) -> usize { self.gets.load(Ordering::SeqCst) }

  pub fn inserts(&self) -> usize { self.inserts.load(Ordering::SeqCst) }

  pub fn updates(&self) -> usize { self.updates.load(Ordering::SeqCst) }

  pub fn updated(&self) -> Vec<Crime> { self.updated.lock().unwrap().clone() }

  pub fn fail_writes(&self, fail: bool) {
    self.fail_writes.store(fail, Ordering::SeqCst);
  }

  /// Block every write until the returned guard is dropped.
  pub async fn hold_writes(&self) -> OwnedRwLockWriteGuard<()> {
    Arc::clone(&self.gate).write_owned().await
  }

  async fn admit_write(&self) -> Result<(), MemoryStoreError> {
    drop(self.gate.read().await);
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(MemoryStoreError::Unavailable);
    }
    Ok(())
  }
}

impl CrimeStore for MemoryStore {
  type Error = MemoryStoreError;

  async fn get_crime(&self, id: Uuid) -> Result<Option<Crime>, MemoryStoreError> {
    self.gets.fetch_add(1, Ordering::SeqCst);
    Ok(self.row(id))
  }

  async fn insert_crime(&self, crime: Crime) -> Result<(), MemoryStoreError> {
    self.admit_write().await?;
    self.inserts.fetch_add(1, Ordering::SeqCst);
    self.rows.lock().unwrap().insert(crime.id, crime);
    Ok(())
  }

  async fn update_crime(&self, crime: Crime) -> Result<(), MemoryStoreError> {
    self.admit_write().await?;
    let mut rows = self.rows.lock().unwrap();
    let Some(row) = rows.get_mut(&crime.id) else {
      return Err(MemoryStoreError::Missing(crime.id));
    };
    *row = crime.clone();
    drop(rows);
    self.updates.fetch_add(1, Ordering::SeqCst);
    self.updated.lock().unwrap().push(crime);
    Ok(())
  }
}
