//! Persisted provider credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

/// One persisted row of the credential store.
///
/// `encrypted_secret` is `nonce || ciphertext`, or empty when no key is
/// stored. A write always replaces secret, model and timestamp together.
#[derive(Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Provider wire name (primary key).
    pub provider: String,
    pub encrypted_secret: Vec<u8>,
    /// Optional override of the provider's default model.
    pub model: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("provider", &self.provider)
            .field("encrypted_secret_len", &self.encrypted_secret.len())
            .field("model", &self.model)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Decrypted view of a credential, as saved and loaded by the store.
///
/// An empty `api_key` means "no secret".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub api_key: Redacted,
    pub model: Option<String>,
}

impl StoredCredential {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            api_key: Redacted::new(api_key),
            model,
        }
    }

    /// The key, if non-empty.
    pub fn api_key(&self) -> Option<&str> {
        Some(self.api_key.expose()).filter(|k| !k.trim().is_empty())
    }

    /// The model override, if non-empty.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.trim().is_empty())
    }
}

/// Listing row for `key list`: the key is only ever shown masked.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub provider: String,
    pub masked_key: String,
    pub model: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A wrapper that redacts secret values in Debug and Display output.
///
/// Use this to wrap any `String` that might contain sensitive data.
/// The actual value is accessible via `.expose()`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redacted(String);

impl Redacted {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the underlying secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Show masked representation: last 4 chars visible.
    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Redacted(\"***\")")
    }
}

impl fmt::Display for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

/// Mask a secret for redisplay: `****` followed by the last four characters.
///
/// Keys of four characters or fewer become `****`; an empty key stays empty.
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        "****".to_string()
    } else {
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}
