//! Core types and engines for the querydesk data-query store.
//!
//! This crate is free of HTTP and database dependencies. It owns
//! the query record model, the batch upsert engine, and the current-value
//! reconciliation logic; storage backends plug in through the traits in
//! [`store`].

pub mod classify;
pub mod compare;
pub mod error;
pub mod fields;
pub mod ident;
pub mod import;
pub mod query;
pub mod resolve;
pub mod select;
pub mod store;
pub mod table;

pub use error::{Error, Result};
