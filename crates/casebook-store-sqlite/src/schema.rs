//! SQL schema and migrations for the Casebook SQLite store.
//!
//! The schema version lives in `PRAGMA user_version`. Each migration step is
//! applied exactly once, in ascending order, and all pending steps share one
//! transaction with the version bump: a failure leaves the database exactly as
//! it was.

use rusqlite::Connection;
use tracing::info;

use crate::{Error, Result};

/// Schema version this build reads and writes.
pub const CURRENT_VERSION: u32 = 2;

/// Connection-level settings applied on every open, outside any transaction.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous  = NORMAL;
";

pub struct Migration {
  pub version:     u32,
  pub description: &'static str,
  pub sql:         &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
  Migration {
    version:     1,
    description: "create crime table",
    sql:         "
      CREATE TABLE crime (
          id       TEXT    PRIMARY KEY NOT NULL,  -- hyphenated UUID
          title    TEXT    NOT NULL,
          date     INTEGER NOT NULL,              -- epoch milliseconds, UTC
          isSolved INTEGER NOT NULL               -- 0 | 1
      );
    ",
  },
  Migration {
    version:     2,
    description: "add suspect column",
    sql:         "ALTER TABLE crime ADD COLUMN suspect TEXT NOT NULL DEFAULT '';",
  },
];

pub fn user_version(conn: &Connection) -> Result<u32> {
  Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the schema up to [`CURRENT_VERSION`]. Returns the resulting version.
pub fn migrate(conn: &mut Connection) -> Result<u32> {
  migrate_to(conn, CURRENT_VERSION)
}

/// Bring the schema up to `target`, which must not exceed
/// [`CURRENT_VERSION`].
pub fn migrate_to(conn: &mut Connection, target: u32) -> Result<u32> {
  let found = user_version(conn)?;
  if found > CURRENT_VERSION {
    return Err(Error::UnsupportedVersion { found, supported: CURRENT_VERSION });
  }
  if found >= target {
    return Ok(found);
  }

  let tx = conn
    .transaction()
    .map_err(|source| Error::Migration { version: found + 1, source })?;

  for step in MIGRATIONS
    .iter()
    .filter(|m| m.version > found && m.version <= target)
  {
    tx.execute_batch(step.sql)
      .map_err(|source| Error::Migration { version: step.version, source })?;
    info!(version = step.version, "applied migration: {}", step.description);
  }

  tx.pragma_update(None, "user_version", target)
    .map_err(|source| Error::Migration { version: target, source })?;
  tx.commit()
    .map_err(|source| Error::Migration { version: target, source })?;

  Ok(target)
}
