//! LLM provider abstractions for prpsmith.
//!
//! - `LlmProvider`: RPITIT trait for the native call primitive of each adapter
//! - `BoxLlmProvider`: object-safe wrapper for dynamic dispatch
//! - `LlmClient` / `Agent`: the uniform create-agent / generate-response contract
//! - `ProviderRegistry`: per-provider configuration with key precedence
//! - `ClientFactory`: construction, caching and availability reporting

pub mod agent;
pub mod box_provider;
pub mod client;
pub mod factory;
pub mod mock;
pub mod provider;
pub mod registry;
