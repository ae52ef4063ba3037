//! AES-256-GCM vault encryption for API keys at rest.
//!
//! The 32-byte master key is generated once per deployment and kept in a
//! hex-encoded key file next to the credential database. Records are
//! unreadable without it.
//!
//! Encrypted format: `nonce (12 bytes) || ciphertext`
//!
//! SECURITY: Error types never contain plaintext or key material.

use std::io::Write;
use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use thiserror::Error;

/// Nonce size for AES-256-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

const KEY_SIZE: usize = 32;

/// Errors from vault encryption operations.
///
/// IMPORTANT: These errors never include plaintext, key material, or ciphertext
/// in their Display/Debug output to prevent accidental logging of secrets.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("encryption failed")]
    EncryptionFailed,

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("invalid ciphertext: too short")]
    CiphertextTooShort,

    #[error("key file error: {0}")]
    KeyFile(String),
}

/// AES-256-GCM encryption for stored credentials.
///
/// Each encryption call generates a random 12-byte nonce, prepended to the ciphertext.
/// This means encrypting the same plaintext twice produces different output.
pub struct VaultCrypto {
    cipher: Aes256Gcm,
}

impl VaultCrypto {
    /// Create a new VaultCrypto from a raw 32-byte key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Load the master key from `path`, creating it on first use.
    ///
    /// A new key is random, written hex-encoded, and readable only by the
    /// owner on Unix. An existing file with bad content is an error; it is
    /// never silently replaced, since that would orphan every stored record.
    pub fn from_key_file(path: &Path) -> Result<Self, VaultError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let bytes = hex_decode(content.trim())
                    .map_err(|_| VaultError::KeyFile("corrupted key file".to_string()))?;
                let key: [u8; KEY_SIZE] = bytes
                    .try_into()
                    .map_err(|_| VaultError::KeyFile("invalid key length".to_string()))?;
                Ok(Self::new(&key))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let key = generate_key();
                write_key_file(path, &hex_encode(&key))?;
                tracing::info!(path = %path.display(), "created credential key file");
                Ok(Self::new(&key))
            }
            Err(e) => Err(VaultError::KeyFile(e.to_string())),
        }
    }

    /// Encrypt plaintext using AES-256-GCM with a random nonce.
    ///
    /// Returns `nonce (12 bytes) || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| VaultError::EncryptionFailed)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt data produced by `encrypt()`.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, VaultError> {
        if data.len() < NONCE_SIZE {
            return Err(VaultError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)
    }
}

/// Generate a random 32-byte key using the OS CSPRNG.
pub fn generate_key() -> [u8; KEY_SIZE] {
    use aes_gcm::aead::rand_core::RngCore;
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    key
}

fn write_key_file(path: &Path, hex_key: &str) -> Result<(), VaultError> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|e| VaultError::KeyFile(e.to_string()))?;
    file.write_all(hex_key.as_bytes())
        .and_then(|()| file.sync_all())
        .map_err(|e| VaultError::KeyFile(e.to_string()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd length hex string".to_string());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .ok_or_else(|| format!("invalid hex at position {i}"))
                .and_then(|pair| {
                    u8::from_str_radix(pair, 16)
                        .map_err(|e| format!("invalid hex at position {i}: {e}"))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let crypto = VaultCrypto::new(&test_key());
        let encrypted = crypto.encrypt(b"sk-live-abc123").unwrap();
        assert_eq!(crypto.decrypt(&encrypted).unwrap(), b"sk-live-abc123");
        assert_ne!(crypto.encrypt(b"sk-live-abc123").unwrap(), encrypted);
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let crypto1 = VaultCrypto::new(&test_key());
        let mut wrong_key = test_key();
        wrong_key[0] = 0xFF;
        let crypto2 = VaultCrypto::new(&wrong_key);

        let encrypted = crypto1.encrypt(b"secret data").unwrap();
        assert!(matches!(
            crypto2.decrypt(&encrypted).unwrap_err(),
            VaultError::DecryptionFailed
        ));
    }

    #[test]
    fn test_ciphertext_too_short() {
        let crypto = VaultCrypto::new(&test_key());
        assert!(matches!(
            crypto.decrypt(&[0u8; 5]).unwrap_err(),
            VaultError::CiphertextTooShort
        ));
    }

    #[test]
    fn test_key_file_created_once_and_reused() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("credentials.key");

        let first = VaultCrypto::from_key_file(&path).unwrap();
        let encrypted = first.encrypt(b"persisted").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.len(), 64);

        let second = VaultCrypto::from_key_file(&path).unwrap();
        assert_eq!(second.decrypt(&encrypted).unwrap(), b"persisted");
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("credentials.key");
        VaultCrypto::from_key_file(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupted_key_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("credentials.key");
        std::fs::write(&path, "not hex at all").unwrap();
        assert!(matches!(
            VaultCrypto::from_key_file(&path),
            Err(VaultError::KeyFile(_))
        ));

        std::fs::write(&path, "abcd").unwrap();
        assert!(matches!(
            VaultCrypto::from_key_file(&path),
            Err(VaultError::KeyFile(_))
        ));
    }

    #[test]
    fn test_hex_roundtrip() {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0xFF];
        let encoded = hex_encode(&bytes);
        assert_eq!(encoded, "deadbeef00ff");
        assert_eq!(hex_decode(&encoded).unwrap(), bytes);
    }

    #[test]
    fn test_vault_error_never_contains_secrets() {
        let errors = [
            VaultError::EncryptionFailed,
            VaultError::DecryptionFailed,
            VaultError::CiphertextTooShort,
            VaultError::KeyFile("permission denied".to_string()),
        ];
        for err in &errors {
            assert!(!err.to_string().contains("sk-super-secret"));
        }
    }
}
