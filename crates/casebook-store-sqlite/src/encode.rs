//! Encoding and decoding helpers between [`Crime`] and the values stored in
//! the `crime` table.
//!
//! UUIDs are stored as hyphenated lowercase strings, dates as epoch
//! milliseconds (UTC), and the solved flag as 0/1.

use casebook_core::crime::Crime;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_date(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

pub fn decode_date(millis: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_millis(millis).ok_or(Error::DateOutOfRange(millis))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// The column list every query selects, in [`RawCrime::from_row`] order.
pub const CRIME_COLUMNS: &str = "id, title, date, isSolved, suspect";

/// Raw values read directly from a `crime` row.
pub struct RawCrime {
  pub id:        String,
  pub title:     String,
  pub date:      i64,
  pub is_solved: bool,
  pub suspect:   String,
}

impl RawCrime {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(0)?,
      title:     row.get(1)?,
      date:      row.get(2)?,
      is_solved: row.get(3)?,
      suspect:   row.get(4)?,
    })
  }

  pub fn into_crime(self) -> Result<Crime> {
    Ok(Crime {
      id:        decode_uuid(&self.id)?,
      title:     self.title,
      date:      decode_date(self.date)?,
      is_solved: self.is_solved,
      suspect:   self.suspect,
    })
  }
}

/// Column values for an insert or update, owned so they can cross into the
/// connection thread.
pub struct CrimeParams {
  pub id:        String,
  pub title:     String,
  pub date:      i64,
  pub is_solved: bool,
  pub suspect:   String,
}

impl From<Crime> for CrimeParams {
  fn from(crime: Crime) -> Self {
    Self {
      id:        encode_uuid(crime.id),
      title:     crime.title,
      date:      encode_date(crime.date),
      is_solved: crime.is_solved,
      suspect:   crime.suspect,
    }
  }
}
