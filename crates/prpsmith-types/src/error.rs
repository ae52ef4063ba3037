use thiserror::Error;

use crate::llm::LlmError;
use crate::provider::ProviderId;

/// Errors surfaced by the client factory and the clients it builds.
///
/// `UnknownProvider` and `MissingCredential` are configuration problems the
/// user can fix; `ProviderConstruction` and `Generation` are provider
/// failures the agent layer may replace with fallback content.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unknown provider '{name}'; valid providers: {valid}")]
    UnknownProvider { name: String, valid: String },

    #[error("provider '{provider}' has no API key configured")]
    MissingCredential { provider: ProviderId },

    #[error("failed to construct provider '{provider}': {source}")]
    ProviderConstruction {
        provider: ProviderId,
        #[source]
        source: LlmError,
    },

    #[error("generation failed for provider '{provider}': {source}")]
    Generation {
        provider: ProviderId,
        #[source]
        source: LlmError,
    },
}

impl ClientError {
    /// True for errors the user fixes by changing configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ClientError::UnknownProvider { .. } | ClientError::MissingCredential { .. }
        )
    }

    /// True for errors a caller may answer with fallback content.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            ClientError::ProviderConstruction { .. } | ClientError::Generation { .. }
        )
    }
}

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("encryption error: {0}")]
    Crypto(String),
}
