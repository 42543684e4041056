//! The edit session: one crime record held in memory and kept in step with
//! the store while a presentation layer edits it.
//!
//! A session starts in [`SessionState::Loading`]. [`EditSession::load`]
//! resolves the record (adopting the stored row, or inserting the fresh draft
//! when there is none) and moves to [`SessionState::Ready`]. Field setters
//! then change the in-memory record and, depending on the [`WritePolicy`],
//! hand a full snapshot to the session's writer.
//!
//! Each ready session owns a single writer task. Snapshots carry the
//! session revision that produced them; the writer coalesces queued snapshots
//! to the newest one and never applies a revision older than the last it
//! wrote, so the store always ends on the most recently issued mutation.

use chrono::{DateTime, SubsecRound as _, Utc};
use serde::{Deserialize, Serialize};
use tokio::{
  sync::{mpsc, watch},
  task::JoinHandle,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  contact::Contact,
  crime::Crime,
  form::Controls,
  repository::Repository,
  store::CrimeStore,
};

// ─── Policy & state ──────────────────────────────────────────────────────────

/// When field mutations reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
  /// Every mutation is queued for writing as soon as it happens.
  #[default]
  WriteThrough,
  /// Mutations stay in memory until [`EditSession::save`].
  Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  /// The record's id is known but its content is not yet resolved.
  Loading,
  /// The in-memory record is available for display and editing.
  Ready,
}

// ─── Writer ──────────────────────────────────────────────────────────────────

struct Snapshot {
  ticket:   u64,
  revision: u64,
  crime:    Crime,
}

/// What the writer has done so far; published after every snapshot it
/// takes off the queue.
#[derive(Clone, Default)]
struct Progress {
  /// Newest ticket the writer has finished with.
  processed: u64,
  /// Newest revision known to be in the store.
  applied:   u64,
  /// Why the most recent write attempt failed, if it did.
  failure:   Option<Error>,
}

struct Writer {
  tx:          mpsc::UnboundedSender<Snapshot>,
  progress:    watch::Receiver<Progress>,
  task:        JoinHandle<()>,
  next_ticket: u64,
}

impl Writer {
  fn spawn<S: CrimeStore>(repo: Repository<S>, id: Uuid) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let (progress_tx, progress) = watch::channel(Progress::default());
    let task = tokio::spawn(run_writer(repo, id, rx, progress_tx));
    Self { tx, progress, task, next_ticket: 0 }
  }

  fn applied(&self) -> u64 { self.progress.borrow().applied }
}

async fn run_writer<S: CrimeStore>(
  repo: Repository<S>,
  id: Uuid,
  mut rx: mpsc::UnboundedReceiver<Snapshot>,
  progress: watch::Sender<Progress>,
) {
  let mut applied = 0;

  while let Some(mut snapshot) = rx.recv().await {
    // Only the newest queued snapshot matters; each carries the full record.
    while let Ok(newer) = rx.try_recv() {
      snapshot = newer;
    }

    let mut failure = None;
    if snapshot.revision > applied {
      let revision = snapshot.revision;
      match repo.update(snapshot.crime).await {
        Ok(()) => {
          applied = revision;
          debug!(%id, revision, "crime written");
        }
        Err(err) => {
          warn!(%id, revision, error = %err, "crime write failed");
          failure = Some(err);
        }
      }
    }

    progress.send_replace(Progress {
      processed: snapshot.ticket,
      applied,
      failure,
    });
  }

  debug!(%id, "writer stopped");
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// Mediates between one in-memory [`Crime`] and the store behind a
/// [`Repository`].
pub struct EditSession<S: CrimeStore> {
  repo:     Repository<S>,
  policy:   WritePolicy,
  state:    SessionState,
  /// The draft while loading, the live record once ready.
  crime:    Crime,
  contact:  Option<Contact>,
  /// Count of mutations issued so far.
  revision: u64,
  writer:   Option<Writer>,
}

impl<S: CrimeStore> EditSession<S> {
  /// Start a session for `id`, or for a brand-new crime dated now when `id`
  /// is `None`. Nothing touches the store until [`load`](Self::load).
  pub fn new(repo: Repository<S>, id: Option<Uuid>, policy: WritePolicy) -> Self {
    let crime = id.map_or_else(Crime::new, Crime::with_id);
    Self {
      repo,
      policy,
      state: SessionState::Loading,
      crime,
      contact: None,
      revision: 0,
      writer: None,
    }
  }

  /// [`new`](Self::new) followed by [`load`](Self::load).
  pub async fn open(
    repo: Repository<S>,
    id: Option<Uuid>,
    policy: WritePolicy,
  ) -> Result<Self> {
    let mut session = Self::new(repo, id, policy);
    session.load().await?;
    Ok(session)
  }

  /// Resolve the record and become ready.
  ///
  /// A stored row replaces the draft; otherwise the draft is inserted.
  /// Returns the record the presentation layer should render. Once ready,
  /// further calls return the live record without touching the store.
  pub async fn load(&mut self) -> Result<&Crime> {
    if self.state == SessionState::Ready {
      return Ok(&self.crime);
    }

    let id = self.crime.id;
    match self.repo.get(id).await? {
      Some(stored) => {
        debug!(%id, "editing existing crime");
        self.crime = stored;
      }
      None => {
        self.repo.insert(self.crime.clone()).await?;
        debug!(%id, "created crime");
      }
    }

    self.writer = Some(Writer::spawn(self.repo.clone(), id));
    self.state = SessionState::Ready;
    Ok(&self.crime)
  }

  // ── Accessors ─────────────────────────────────────────────────────────────

  pub fn id(&self) -> Uuid { self.crime.id }

  pub fn state(&self) -> SessionState { self.state }

  pub fn policy(&self) -> WritePolicy { self.policy }

  /// The live record, once the session is ready.
  pub fn crime(&self) -> Option<&Crime> {
    (self.state == SessionState::Ready).then_some(&self.crime)
  }

  pub fn contact(&self) -> Option<&Contact> { self.contact.as_ref() }

  /// Number of mutations issued so far.
  pub fn revision(&self) -> u64 { self.revision }

  /// Whether the store may still lag behind the in-memory record.
  pub fn is_dirty(&self) -> bool {
    let applied = self.writer.as_ref().map_or(0, Writer::applied);
    self.revision > applied
  }

  pub fn controls(&self) -> Controls {
    Controls::for_crime(&self.crime, self.contact.as_ref())
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
    let title = title.into();
    self.mutate(|crime| replace(&mut crime.title, title))?;
    Ok(())
  }

  pub fn set_solved(&mut self, is_solved: bool) -> Result<()> {
    self.mutate(|crime| replace(&mut crime.is_solved, is_solved))?;
    Ok(())
  }

  /// Set the discovery date, truncated to the millisecond precision the
  /// store keeps.
  pub fn set_date(&mut self, date: DateTime<Utc>) -> Result<()> {
    let date = date.trunc_subsecs(3);
    self.mutate(|crime| replace(&mut crime.date, date))?;
    Ok(())
  }

  /// Set the suspect by name alone. A different name forgets any previously
  /// picked contact; the same name keeps it.
  pub fn set_suspect(&mut self, suspect: impl Into<String>) -> Result<()> {
    let suspect = suspect.into();
    if self.mutate(|crime| replace(&mut crime.suspect, suspect))? {
      self.contact = None;
    }
    Ok(())
  }

  /// Adopt a contact picked from an external provider as the suspect.
  pub fn assign_suspect(&mut self, contact: Contact) -> Result<()> {
    let name = contact.display_name.clone();
    self.mutate(|crime| replace(&mut crime.suspect, name))?;
    self.contact = Some(contact);
    Ok(())
  }

  /// Apply a field change; returns whether the record actually changed.
  fn mutate(&mut self, apply: impl FnOnce(&mut Crime) -> bool) -> Result<bool> {
    self.ensure_ready()?;
    if !apply(&mut self.crime) {
      return Ok(false);
    }
    self.revision += 1;
    if self.policy == WritePolicy::WriteThrough {
      self.enqueue()?;
    }
    Ok(true)
  }

  // ── Persistence ───────────────────────────────────────────────────────────

  /// Persist any pending changes and wait until the store holds the current
  /// revision. A failed background write is reported here.
  pub async fn flush(&mut self) -> Result<()> {
    self.ensure_ready()?;
    if !self.is_dirty() {
      return Ok(());
    }

    let id = self.crime.id;
    let target = self.revision;
    let ticket = self.enqueue()?;

    let writer = self.writer.as_mut().ok_or(Error::SessionNotReady(id))?;
    let progress = writer
      .progress
      .wait_for(|p| p.processed >= ticket)
      .await
      .map_err(|_| Error::WriterStopped(id))?
      .clone();

    if progress.applied >= target {
      Ok(())
    } else {
      Err(progress.failure.unwrap_or(Error::WriterStopped(id)))
    }
  }

  /// Explicit save checkpoint; the only way changes reach the store under
  /// [`WritePolicy::Deferred`].
  pub async fn save(&mut self) -> Result<()> { self.flush().await }

  /// Flush, stop the writer, and hand back the final record.
  pub async fn close(mut self) -> Result<Crime> {
    if self.state == SessionState::Loading {
      return Ok(self.crime);
    }

    self.flush().await?;
    if let Some(writer) = self.writer.take() {
      drop(writer.tx);
      writer.task.await.map_err(|_| Error::WriterStopped(self.crime.id))?;
    }
    Ok(self.crime)
  }

  fn enqueue(&mut self) -> Result<u64> {
    let id = self.crime.id;
    let writer = self.writer.as_mut().ok_or(Error::SessionNotReady(id))?;
    writer.next_ticket += 1;
    let ticket = writer.next_ticket;
    writer
      .tx
      .send(Snapshot {
        ticket,
        revision: self.revision,
        crime: self.crime.clone(),
      })
      .map_err(|_| Error::WriterStopped(id))?;
    Ok(ticket)
  }

  fn ensure_ready(&self) -> Result<()> {
    match self.state {
      SessionState::Ready => Ok(()),
      SessionState::Loading => Err(Error::SessionNotReady(self.crime.id)),
    }
  }
}

fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
  if *slot == value {
    return false;
  }
  *slot = value;
  true
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone as _, Utc};

  use super::*;
  use crate::testing::MemoryStore;

  fn repo_with(crimes: impl IntoIterator<Item = Crime>) -> Repository<MemoryStore> {
    Repository::new(MemoryStore::with(crimes))
  }

  fn stored(title: &str) -> Crime {
    let mut crime = Crime::new();
    crime.title = title.into();
    crime
  }

  // ─── Session start ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn unknown_id_inserts_exactly_once() {
    let repo = repo_with([]);
    let id = Uuid::new_v4();

    let session = EditSession::open(repo.clone(), Some(id), WritePolicy::default())
      .await
      .unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.id(), id);
    assert_eq!(repo.store().inserts(), 1);
    assert_eq!(repo.store().updates(), 0);
    assert_eq!(repo.store().row(id).as_ref(), session.crime());
  }

  #[tokio::test]
  async fn no_id_creates_fresh_crime() {
    let repo = repo_with([]);
    let before = Utc::now();

    let session = EditSession::open(repo.clone(), None, WritePolicy::default())
      .await
      .unwrap();

    let crime = session.crime().unwrap();
    assert!(crime.title.is_empty());
    assert!(crime.date >= before - chrono::Duration::milliseconds(1));
    assert_eq!(repo.store().inserts(), 1);
    assert_eq!(repo.store().row(crime.id).as_ref(), Some(crime));
  }

  #[tokio::test]
  async fn existing_id_adopts_stored_record() {
    let existing = stored("Theft");
    let repo = repo_with([existing.clone()]);

    let session = EditSession::open(repo.clone(), Some(existing.id), WritePolicy::default())
      .await
      .unwrap();

    assert_eq!(session.crime(), Some(&existing));
    assert_eq!(repo.store().inserts(), 0);
    assert_eq!(repo.store().gets(), 1);
  }

  #[tokio::test]
  async fn load_is_idempotent_once_ready() {
    let repo = repo_with([]);
    let mut session = EditSession::new(repo.clone(), None, WritePolicy::default());
    assert_eq!(session.state(), SessionState::Loading);
    assert!(session.crime().is_none());

    session.load().await.unwrap();
    session.load().await.unwrap();

    assert_eq!(repo.store().gets(), 1);
    assert_eq!(repo.store().inserts(), 1);
  }

  #[tokio::test]
  async fn mutation_while_loading_is_rejected() {
    let repo = repo_with([]);
    let mut session = EditSession::new(repo.clone(), None, WritePolicy::default());

    let err = session.set_title("Theft").unwrap_err();
    assert!(matches!(err, Error::SessionNotReady(id) if id == session.id()));
    assert_eq!(repo.store().inserts(), 0);
  }

  #[tokio::test]
  async fn failed_insert_keeps_session_loading() {
    let store = MemoryStore::default();
    store.fail_writes(true);
    let repo = Repository::new(store);

    let mut session = EditSession::new(repo.clone(), None, WritePolicy::default());
    let err = session.load().await.unwrap_err();

    assert!(err.is_storage());
    assert_eq!(session.state(), SessionState::Loading);
  }

  // ─── Write-through ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn each_flushed_mutation_is_written() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::WriteThrough)
      .await
      .unwrap();

    session.set_title("Theft").unwrap();
    session.flush().await.unwrap();
    session.set_solved(true).unwrap();
    session.flush().await.unwrap();

    assert_eq!(repo.store().updates(), 2);
    assert!(!session.is_dirty());
    assert_eq!(repo.store().row(session.id()).as_ref(), session.crime());
  }

  #[tokio::test]
  async fn keystroke_updates_converge_on_last_value() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::WriteThrough)
      .await
      .unwrap();

    let mut title = String::new();
    for ch in "Stolen bicycle".chars() {
      title.push(ch);
      session.set_title(title.clone()).unwrap();
    }
    session.set_solved(true).unwrap();
    session.set_suspect("Mallory").unwrap();
    session.flush().await.unwrap();

    let row = repo.store().row(session.id()).unwrap();
    assert_eq!(Some(&row), session.crime());
    assert_eq!(row.title, "Stolen bicycle");
    assert!(row.is_solved);
    assert_eq!(row.suspect, "Mallory");

    // Writes never go backwards in revision order.
    let titles: Vec<usize> = repo
      .store()
      .updated()
      .iter()
      .map(|c| c.title.len())
      .collect();
    assert!(titles.windows(2).all(|w| w[0] <= w[1]));
  }

  #[tokio::test]
  async fn unchanged_value_is_not_a_mutation() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::WriteThrough)
      .await
      .unwrap();

    session.set_title("").unwrap();
    session.set_solved(false).unwrap();
    session.flush().await.unwrap();

    assert_eq!(session.revision(), 0);
    assert_eq!(repo.store().updates(), 0);
  }

  #[tokio::test]
  async fn set_date_keeps_millisecond_precision() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::WriteThrough)
      .await
      .unwrap();

    let date = Utc.timestamp_opt(1_709_294_400, 123_456_789).unwrap();
    session.set_date(date).unwrap();
    session.flush().await.unwrap();

    let crime = session.crime().unwrap();
    assert_eq!(crime.date.timestamp_millis(), 1_709_294_400_123);
    assert_eq!(crime.date.timestamp_subsec_nanos(), 123_000_000);
    assert_eq!(repo.store().row(session.id()).as_ref(), Some(crime));

    // The same instant at a finer precision is not a change.
    session.set_date(date).unwrap();
    assert_eq!(session.revision(), 1);
  }

  #[tokio::test]
  async fn stalled_writer_coalesces_queued_snapshots() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::WriteThrough)
      .await
      .unwrap();

    let hold = repo.store().hold_writes().await;
    for title in ["T", "Th", "The", "Thef", "Theft"] {
      session.set_title(title).unwrap();
      tokio::task::yield_now().await;
    }
    drop(hold);
    session.flush().await.unwrap();

    let updated = repo.store().updated();
    assert!(updated.len() <= 2, "expected coalesced writes, got {}", updated.len());
    assert_eq!(updated.last().map(|c| c.title.as_str()), Some("Theft"));
  }

  #[tokio::test]
  async fn write_failure_surfaces_from_flush_and_retries() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::WriteThrough)
      .await
      .unwrap();

    repo.store().fail_writes(true);
    session.set_title("Theft").unwrap();
    let err = session.flush().await.unwrap_err();
    assert!(err.is_storage());
    assert!(session.is_dirty());

    repo.store().fail_writes(false);
    session.flush().await.unwrap();
    assert_eq!(repo.store().row(session.id()).unwrap().title, "Theft");
  }

  // ─── Deferred ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn deferred_writes_only_on_save() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::Deferred)
      .await
      .unwrap();

    session.set_title("Theft").unwrap();
    session.set_solved(true).unwrap();
    tokio::task::yield_now().await;

    assert!(session.is_dirty());
    assert_eq!(repo.store().updates(), 0);
    assert_eq!(repo.store().row(session.id()).unwrap().title, "");

    session.save().await.unwrap();

    assert_eq!(repo.store().updates(), 1);
    assert_eq!(repo.store().row(session.id()).as_ref(), session.crime());
  }

  // ─── Suspects ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn assigned_contact_enables_calling() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::default())
      .await
      .unwrap();

    session
      .assign_suspect(Contact::new("Mallory").with_phone("555-0100"))
      .unwrap();
    assert!(session.controls().call_enabled);
    assert_eq!(session.controls().suspect_label, "Mallory");

    session.set_suspect("Eve").unwrap();
    assert!(session.contact().is_none());
    assert!(!session.controls().call_enabled);

    session.flush().await.unwrap();
    assert_eq!(repo.store().row(session.id()).unwrap().suspect, "Eve");
  }

  #[tokio::test]
  async fn retyping_same_suspect_keeps_contact() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::default())
      .await
      .unwrap();

    let contact = Contact::new("Mallory").with_phone("555-0100");
    session.assign_suspect(contact.clone()).unwrap();
    let revision = session.revision();

    session.set_suspect("Mallory").unwrap();
    assert_eq!(session.revision(), revision);
    assert_eq!(session.contact(), Some(&contact));
    assert!(session.controls().call_enabled);
  }

  // ─── Full scenario ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn edits_survive_into_a_fresh_session() {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let x = Uuid::new_v4();
    let original = Crime {
      id:        x,
      title:     String::new(),
      date:      t0,
      is_solved: false,
      suspect:   String::new(),
    };
    let repo = repo_with([]);
    repo.insert(original).await.unwrap();

    let mut session = EditSession::open(repo.clone(), Some(x), WritePolicy::WriteThrough)
      .await
      .unwrap();
    session.set_title("Theft").unwrap();
    session.set_solved(true).unwrap();
    session.close().await.unwrap();

    let reopened = EditSession::open(repo.clone(), Some(x), WritePolicy::WriteThrough)
      .await
      .unwrap();

    let expected = Crime {
      id:        x,
      title:     "Theft".into(),
      date:      t0,
      is_solved: true,
      suspect:   String::new(),
    };
    assert_eq!(reopened.crime(), Some(&expected));
    assert_eq!(repo.get(x).await.unwrap(), Some(expected));
    assert_eq!(repo.store().inserts(), 1);
  }

  #[tokio::test]
  async fn close_returns_final_record() {
    let repo = repo_with([]);
    let mut session = EditSession::open(repo.clone(), None, WritePolicy::Deferred)
      .await
      .unwrap();
    session.set_title("Arson").unwrap();

    let crime = session.close().await.unwrap();
    assert_eq!(crime.title, "Arson");
    assert_eq!(repo.store().row(crime.id), Some(crime));
  }
}
