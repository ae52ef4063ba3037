//! Cryptographic operations for prpsmith.
//!
//! - `vault`: AES-256-GCM encryption for API keys at rest

pub mod vault;
