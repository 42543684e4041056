//! [`SqliteStore`]: the SQLite implementation of [`CrimeStore`].

use std::path::{Path, PathBuf};

use casebook_core::{crime::Crime, store::CrimeStore};
use rusqlite::OptionalExtension as _;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{CRIME_COLUMNS, CrimeParams, RawCrime, encode_uuid},
  schema::{self, PRAGMAS},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A crime store backed by a single SQLite file.
///
/// Every statement runs on the one connection thread owned by
/// [`tokio_rusqlite::Connection`], so writes are applied one at a time in the
/// order they reach it. Cloning is cheap: clones share that connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and migrate it to the current
  /// schema. The store is not returned unless migration succeeds.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    create_parent_dir(&path).await?;

    debug!("opening crime store at {}", path.display());
    let conn = tokio_rusqlite::Connection::open(&path).await?;
    let store = Self { conn };
    let version = store.init_schema().await?;
    info!(version, "crime store ready at {}", path.display());
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<u32> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        Ok(schema::migrate(conn))
      })
      .await?
  }

  /// The schema version recorded in the database.
  pub async fn schema_version(&self) -> Result<u32> {
    self
      .conn
      .call(|conn| Ok(schema::user_version(conn)))
      .await?
  }
}

async fn create_parent_dir(path: &Path) -> Result<()> {
  let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
    return Ok(());
  };
  tokio::fs::create_dir_all(parent)
    .await
    .map_err(|source| Error::CreateDir { path: PathBuf::from(parent), source })
}

// ─── CrimeStore impl ─────────────────────────────────────────────────────────

impl CrimeStore for SqliteStore {
  type Error = Error;

  async fn get_crime(&self, id: Uuid) -> Result<Option<Crime>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCrime> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CRIME_COLUMNS} FROM crime WHERE id = ?1"),
              rusqlite::params![id_str],
              RawCrime::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCrime::into_crime).transpose()
  }

  async fn insert_crime(&self, crime: Crime) -> Result<()> {
    let id = crime.id;
    let p = CrimeParams::from(crime);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT OR REPLACE INTO crime ({CRIME_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"
          ),
          rusqlite::params![p.id, p.title, p.date, p.is_solved, p.suspect],
        )?;
        Ok(())
      })
      .await?;

    debug!(%id, "crime inserted");
    Ok(())
  }

  async fn update_crime(&self, crime: Crime) -> Result<()> {
    let id = crime.id;
    let p = CrimeParams::from(crime);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE crime
             SET title = ?2, date = ?3, isSolved = ?4, suspect = ?5
           WHERE id = ?1",
          rusqlite::params![p.id, p.title, p.date, p.is_solved, p.suspect],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::CrimeNotFound(id));
    }
    debug!(%id, "crime updated");
    Ok(())
  }
}
