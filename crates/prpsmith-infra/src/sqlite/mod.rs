//! SQLite storage layer.
//!
//! The credential store, backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod credential;
pub mod pool;
