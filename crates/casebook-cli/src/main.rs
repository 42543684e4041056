//! `casebook`: command-line editor for the Casebook crime register.
//!
//! # Usage
//!
//! ```text
//! casebook new --title "Stolen bicycle"
//! casebook edit <ID> --solved true --suspect "Mallory" --phone "+1 555 0100"
//! casebook show <ID> --json
//! casebook report <ID>
//! ```
//!
//! Settings come from `casebook.toml` (or `--config`), then `CASEBOOK_*`
//! environment variables, then flags.

mod app;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use app::{App, Edits};
use casebook_core::session::WritePolicy;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "casebook", version, about = "Record and edit crimes")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "casebook.toml")]
  config: PathBuf,

  /// Database file; overrides `store_path` from the configuration.
  #[arg(long, value_name = "PATH")]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Record a new crime and print its id.
  New {
    #[arg(long)]
    title:   Option<String>,
    #[arg(long)]
    solved:  bool,
    #[arg(long)]
    suspect: Option<String>,
  },
  /// Print a stored crime.
  Show {
    id:   Uuid,
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
  },
  /// Edit a crime, creating it first if the id is unknown.
  Edit {
    id:       Uuid,
    #[arg(long)]
    title:    Option<String>,
    #[arg(long)]
    solved:   Option<bool>,
    #[arg(long)]
    suspect:  Option<String>,
    /// Phone number of the suspect, as the contact provider returned it.
    #[arg(long)]
    phone:    Option<String>,
    /// Keep edits in memory until the explicit save at the end.
    #[arg(long)]
    deferred: bool,
  },
  /// Print the shareable report for a crime.
  Report { id: Uuid },
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Settings read from the config file and `CASEBOOK_*` variables.
#[derive(Debug, Deserialize)]
struct Settings {
  #[serde(default = "default_store_path")]
  store_path:   PathBuf,
  #[serde(default)]
  write_policy: WritePolicy,
}

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/casebook/crimes.db") }

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("CASEBOOK"))
    .build()
    .context("failed to read config file")?;

  settings
    .try_deserialize()
    .context("failed to deserialise settings")
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli.config)?;

  let store_path = expand_tilde(cli.store.as_deref().unwrap_or(&settings.store_path));
  let app = App::open(&store_path, settings.write_policy).await?;

  let output = match cli.command {
    Command::New { title, solved, suspect } => {
      app
        .create(Edits { title, solved: solved.then_some(true), suspect, phone: None })
        .await?
    }
    Command::Show { id, json } => app.show(id, json).await?,
    Command::Edit { id, title, solved, suspect, phone, deferred } => {
      let policy = if deferred { WritePolicy::Deferred } else { settings.write_policy };
      app
        .edit(id, Edits { title, solved, suspect, phone }, policy)
        .await?
    }
    Command::Report { id } => app.report(id).await?,
  };

  println!("{output}");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
