//! Credential store trait definition.

use std::collections::BTreeMap;

use prpsmith_types::credential::{CredentialRecord, StoredCredential};
use prpsmith_types::error::RepositoryError;

/// Durable, encrypted persistence of provider API keys and model overrides.
///
/// Implementations encrypt keys at rest. Maps are keyed by provider wire name
/// (`"openai"`, `"gemini"`, ...).
pub trait CredentialStore: Send + Sync {
    /// Upsert one record per provider in `credentials`.
    ///
    /// Providers not present are left untouched; a present provider's secret,
    /// model and timestamp are replaced together. An empty key is stored as
    /// "no secret".
    fn save(
        &self,
        credentials: &BTreeMap<String, StoredCredential>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Decrypt every record.
    ///
    /// A record that fails to decrypt yields an empty key rather than an
    /// error, so one bad record never hides the others.
    fn load(
        &self,
    ) -> impl std::future::Future<Output = Result<BTreeMap<String, StoredCredential>, RepositoryError>>
    + Send;

    /// Raw rows, ciphertext included, ordered by provider.
    fn records(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<CredentialRecord>, RepositoryError>> + Send;
}
