//! Core types and trait definitions for the Casebook crime register.
//!
//! This crate is deliberately free of database and CLI dependencies. Storage
//! backends implement [`store::CrimeStore`]; presentation layers drive
//! [`session::EditSession`] through a [`repository::Repository`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod contact;
pub mod crime;
pub mod error;
pub mod form;
pub mod report;
pub mod repository;
pub mod session;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
