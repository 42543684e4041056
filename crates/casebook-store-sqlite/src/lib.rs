//! SQLite backend for the Casebook crime register.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! connection thread without blocking the async runtime. That thread is also
//! what serialises writes.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::CURRENT_VERSION;
pub use store::SqliteStore;
