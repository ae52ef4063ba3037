//! Infrastructure layer for prpsmith.
//!
//! Contains implementations of the ports defined in `prpsmith-core`: the
//! SQLite credential store with AES-256-GCM encryption at rest, the HTTP
//! provider adapters and their constructor table, and the `config.toml`
//! loader.

pub mod config;
pub mod crypto;
pub mod llm;
pub mod sqlite;
