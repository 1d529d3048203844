//! SQLite backend for the querydesk store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. [`SqliteStore`] holds the query
//! records; [`SqliteCatalog`] reads the source forms, either from the same
//! database or from a separate, read-only file.

mod catalog;
mod encode;
mod schema;
mod store;

pub mod error;

pub use catalog::SqliteCatalog;
pub use error::{Error, Result};
pub use store::SqliteStore;
