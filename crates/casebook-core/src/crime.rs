//! The crime record: the single entity held by the register.

use chrono::{DateTime, SubsecRound as _, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single crime entry.
///
/// `id` is assigned once and never changes; every other field is editable
/// through an [`EditSession`](crate::session::EditSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crime {
  pub id:        Uuid,
  pub title:     String,
  /// Stored with millisecond resolution.
  pub date:      DateTime<Utc>,
  pub is_solved: bool,
  /// Display name of the suspect; empty when none has been chosen.
  #[serde(default)]
  pub suspect:   String,
}

impl Crime {
  /// A blank crime with a fresh id, dated now.
  pub fn new() -> Self { Self::with_id(Uuid::new_v4()) }

  /// A blank crime with a caller-supplied id, dated now.
  pub fn with_id(id: Uuid) -> Self {
    Self {
      id,
      title: String::new(),
      date: now_millis(),
      is_solved: false,
      suspect: String::new(),
    }
  }

  pub fn has_suspect(&self) -> bool { !self.suspect.trim().is_empty() }
}

impl Default for Crime {
  fn default() -> Self { Self::new() }
}

/// The current time truncated to the precision the store persists.
pub fn now_millis() -> DateTime<Utc> { Utc::now().trunc_subsecs(3) }
