//! # chirp-store
//!
//! SQLite storage for Chirp posts.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection`, runs schema migrations on open and provides typed
//! helpers for reading and writing [`Post`] rows.  Post content is stored
//! as given: validation happens before the write, never on read.

pub mod database;
pub mod migrations;
pub mod models;
pub mod posts;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
