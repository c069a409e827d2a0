//! # reshuffle common library
//!
//! Shared code for the reshuffle crates:
//! - Error and result types
//! - Configuration loading (CLI > ENV > TOML > compiled defaults)
//! - Track and playlist data model
//! - SQLite-backed TTL cache
//! - Timestamp helpers

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use cache::TtlCache;
pub use error::{Error, Result};
pub use models::{IgnoreSet, Item};
