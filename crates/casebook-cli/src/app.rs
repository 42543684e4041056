//! Command handlers: each one drives an edit session against the store and
//! renders the result as text.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use casebook_core::{
  contact::Contact,
  crime::Crime,
  form::Controls,
  report::{REPORT_SUBJECT, crime_report, display_date},
  repository::Repository,
  session::{EditSession, WritePolicy},
};
use casebook_store_sqlite::SqliteStore;
use uuid::Uuid;

/// Field changes requested on the command line.
#[derive(Debug, Default)]
pub struct Edits {
  pub title:   Option<String>,
  pub solved:  Option<bool>,
  pub suspect: Option<String>,
  pub phone:   Option<String>,
}

pub struct App {
  repo:   Repository<SqliteStore>,
  policy: WritePolicy,
}

impl App {
  pub async fn open(store_path: &Path, policy: WritePolicy) -> Result<Self> {
    let store = SqliteStore::open(store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?;
    Ok(Self::with_repository(Repository::new(store), policy))
  }

  pub fn with_repository(repo: Repository<SqliteStore>, policy: WritePolicy) -> Self {
    Self { repo, policy }
  }

  // ── Commands ──────────────────────────────────────────────────────────────

  /// Start a session with no id, apply `edits`, and report the new id.
  pub async fn create(&self, edits: Edits) -> Result<String> {
    let mut session = EditSession::open(self.repo.clone(), None, self.policy).await?;
    apply(&mut session, edits)?;
    let crime = session.close().await?;
    Ok(crime.id.to_string())
  }

  pub async fn edit(&self, id: Uuid, edits: Edits, policy: WritePolicy) -> Result<String> {
    let mut session = EditSession::open(self.repo.clone(), Some(id), policy).await?;
    apply(&mut session, edits)?;
    session.save().await.context("failed to save crime")?;

    let mut out = render(session.crime().ok_or_else(|| anyhow!("session not ready"))?);
    let controls = session.controls();
    out.push_str(&render_controls(&controls));
    if controls.call_enabled
      && let Some(uri) = session.contact().and_then(Contact::dial_uri)
    {
      out.push_str(&format!("dial:     {uri}\n"));
    }

    session.close().await?;
    Ok(out.trim_end().to_owned())
  }

  pub async fn show(&self, id: Uuid, json: bool) -> Result<String> {
    let crime = self.fetch(id).await?;
    if json {
      return serde_json::to_string_pretty(&crime).context("failed to encode crime");
    }
    Ok(render(&crime).trim_end().to_owned())
  }

  pub async fn report(&self, id: Uuid) -> Result<String> {
    let crime = self.fetch(id).await?;
    Ok(format!("Subject: {REPORT_SUBJECT}\n\n{}", crime_report(&crime)))
  }

  async fn fetch(&self, id: Uuid) -> Result<Crime> {
    match self.repo.get(id).await? {
      Some(crime) => Ok(crime),
      None => bail!("no crime with id {id}"),
    }
  }
}

fn apply(session: &mut EditSession<SqliteStore>, edits: Edits) -> Result<()> {
  if let Some(title) = edits.title {
    session.set_title(title)?;
  }
  if let Some(solved) = edits.solved {
    session.set_solved(solved)?;
  }

  match (edits.suspect, edits.phone) {
    (Some(name), Some(phone)) => session.assign_suspect(Contact::new(name).with_phone(phone))?,
    (Some(name), None) => session.set_suspect(name)?,
    (None, Some(phone)) => {
      let current = session.crime().map(|c| c.suspect.clone()).unwrap_or_default();
      if current.trim().is_empty() {
        bail!("--phone needs a suspect; pass --suspect as well");
      }
      session.assign_suspect(Contact::new(current).with_phone(phone))?;
    }
    (None, None) => {}
  }
  Ok(())
}

// ─── Rendering ────────────────────────────────────────────────────────────────

fn render(crime: &Crime) -> String {
  let suspect = if crime.has_suspect() { crime.suspect.as_str() } else { "-" };
  format!(
    "id:       {}\ntitle:    {}\ndate:     {}\nsolved:   {}\nsuspect:  {}\n",
    crime.id,
    crime.title,
    display_date(crime),
    if crime.is_solved { "yes" } else { "no" },
    suspect,
  )
}

fn render_controls(controls: &Controls) -> String {
  let flag = |on: bool| if on { "on" } else { "off" };
  format!(
    "controls: date={} report={} call={} suspect=\"{}\"\n",
    flag(controls.date_enabled),
    flag(controls.report_enabled),
    flag(controls.call_enabled),
    controls.suspect_label,
  )
}
