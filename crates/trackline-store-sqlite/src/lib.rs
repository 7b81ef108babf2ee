//! SQLite backend for the Trackline track store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Also hosts the durable notification
//! outbox, making [`SqliteStore`] both the [`trackline_core::store::TrackStore`]
//! and the [`trackline_core::notify::Notifier`] collaborator.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
