//! Shared domain types for prpsmith.
//!
//! This crate contains the types used across every layer: provider
//! identifiers and configuration, LLM request/response shapes, stored
//! credentials, PRP inputs and outputs, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror, schemars.

pub mod config;
pub mod credential;
pub mod error;
pub mod llm;
pub mod prp;
pub mod provider;
