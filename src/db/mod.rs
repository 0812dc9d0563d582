//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and their JSON shape
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the `Store` handle used by services and guards

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{AccountKind, Application, Identity, Session, Token, UsageRecord};
pub use sqlite::Store;
