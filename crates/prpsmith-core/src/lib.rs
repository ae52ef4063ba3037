//! Business logic and port definitions for prpsmith.
//!
//! This crate owns the provider registry, the client factory and its cache,
//! the agent contract every provider adapter is driven through, and the
//! form-filling / PRP-generation layer with its fallback content. It depends
//! only on `prpsmith-types` -- never on `prpsmith-infra` or any HTTP/database
//! crate.

pub mod generation;
pub mod llm;
pub mod repository;
pub mod service;
