//! Encrypted-at-rest credential vault.
//!
//! A vault blob is `base64(salt ‖ nonce ‖ ciphertext+tag)`:
//!
//! ```text
//! ┌──────────────┬─────────────┬──────────────────────────────┐
//! │ salt (16 B)  │ nonce (12 B)│ AES-256-GCM ciphertext + tag │
//! └──────────────┴─────────────┴──────────────────────────────┘
//! ```
//!
//! The AES key is derived from a secret with PBKDF2-HMAC-SHA256. The secret is
//! either a user passphrase or the device fingerprint (see [`fingerprint`]).
//! Salt and nonce are drawn fresh for every encryption.
//!
//! # Example
//!
//! ```ignore
//! use forge_models::vault::CredentialVault;
//!
//! let vault = CredentialVault::new();
//! let blob = vault.encrypt("{\"openai\":{}}", "passphrase").await?;
//! let plain = vault.decrypt(&blob, "passphrase").await?;
//! ```

mod entropy;
pub mod fingerprint;

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;
use sha2::Sha256;
use zeroize::Zeroizing;

pub use entropy::{EntropySource, OsEntropy};
pub use fingerprint::{EnvironmentProbe, ProbeError, SystemProbe};

use crate::error::VaultError;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Where the vault's encryption secret comes from.
#[derive(Clone, Default)]
pub enum VaultSecret {
    /// A user-supplied passphrase.
    Passphrase(SecretString),
    /// The deterministic device fingerprint (passwordless mode).
    #[default]
    DeviceFingerprint,
}

impl VaultSecret {
    /// Create a passphrase secret.
    pub fn passphrase(passphrase: impl Into<String>) -> Self {
        Self::Passphrase(SecretString::from(passphrase.into()))
    }
}

impl std::fmt::Debug for VaultSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passphrase(_) => write!(f, "Passphrase([REDACTED])"),
            Self::DeviceFingerprint => write!(f, "DeviceFingerprint"),
        }
    }
}

/// Derive an AES-256 key from `secret` and `salt` with PBKDF2-HMAC-SHA256.
///
/// Deterministic in `(secret, salt)`; different salts give independent keys.
pub fn derive_key(secret: &str, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key[..]);
    key
}

/// Authenticated encryption of credential data with a derived key.
///
/// Randomness and environment attributes are injected so tests can run with
/// deterministic fixtures.
#[derive(Clone)]
pub struct CredentialVault {
    entropy: Arc<dyn EntropySource>,
    probe: Arc<dyn EnvironmentProbe>,
}

impl CredentialVault {
    /// Create a vault backed by the OS RNG and the native environment probe.
    pub fn new() -> Self {
        Self {
            entropy: Arc::new(OsEntropy),
            probe: Arc::new(SystemProbe::new()),
        }
    }

    /// Replace the randomness source.
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Replace the environment probe used for fingerprinting.
    pub fn with_probe(mut self, probe: Arc<dyn EnvironmentProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Encrypt `plaintext` under `secret`, returning a base64 vault blob.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::EntropyUnavailable` if fresh salt/nonce bytes cannot
    /// be obtained. There is no fallback to fixed values.
    pub async fn encrypt(&self, plaintext: &str, secret: &str) -> Result<String, VaultError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        self.entropy.fill(&mut salt)?;
        self.entropy.fill(&mut nonce)?;

        let plaintext = Zeroizing::new(plaintext.to_owned());
        let secret = Zeroizing::new(secret.to_owned());

        run_blocking(move || {
            let key = derive_key(&secret, &salt);
            let cipher =
                Aes256Gcm::new_from_slice(&key[..]).map_err(|_| VaultError::EncryptionFailed)?;
            let ciphertext = cipher
                .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
                .map_err(|_| VaultError::EncryptionFailed)?;

            let mut combined = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
            combined.extend_from_slice(&salt);
            combined.extend_from_slice(&nonce);
            combined.extend_from_slice(&ciphertext);
            Ok(STANDARD.encode(combined))
        })
        .await
    }

    /// Decrypt a vault blob produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Every failure (undecodable blob, truncated blob, wrong secret, tampered
    /// ciphertext) is reported as `VaultError::DecryptionFailed`. The key is
    /// derived before any check so all paths cost one derivation.
    pub async fn decrypt(&self, blob: &str, secret: &str) -> Result<Zeroizing<String>, VaultError> {
        let blob = blob.trim().to_owned();
        let secret = Zeroizing::new(secret.to_owned());

        run_blocking(move || {
            let parsed = split_blob(&blob);
            let salt = parsed.as_ref().map(|p| p.salt).unwrap_or([0u8; SALT_LEN]);
            let key = derive_key(&secret, &salt);

            let parts = parsed.ok_or(VaultError::DecryptionFailed)?;
            let cipher =
                Aes256Gcm::new_from_slice(&key[..]).map_err(|_| VaultError::DecryptionFailed)?;
            let plaintext = cipher
                .decrypt(Nonce::from_slice(&parts.nonce), parts.ciphertext.as_slice())
                .map_err(|_| VaultError::DecryptionFailed)?;

            String::from_utf8(plaintext)
                .map(Zeroizing::new)
                .map_err(|_| VaultError::DecryptionFailed)
        })
        .await
    }

    /// Deterministic device fingerprint used as the passwordless secret.
    pub fn device_fingerprint(&self) -> String {
        fingerprint::device_fingerprint(self.probe.as_ref())
    }

    /// Resolve a [`VaultSecret`] to the string fed into key derivation.
    pub fn resolve_secret(&self, secret: &VaultSecret) -> SecretString {
        match secret {
            VaultSecret::Passphrase(p) => p.clone(),
            VaultSecret::DeviceFingerprint => SecretString::from(self.device_fingerprint()),
        }
    }
}

impl Default for CredentialVault {
    fn default() -> Self {
        Self::new()
    }
}

struct BlobParts {
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

fn split_blob(blob: &str) -> Option<BlobParts> {
    let bytes = STANDARD.decode(blob).ok()?;
    if bytes.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return None;
    }

    let (salt, rest) = bytes.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    Some(BlobParts {
        salt: salt.try_into().ok()?,
        nonce: nonce.try_into().ok()?,
        ciphertext: ciphertext.to_vec(),
    })
}

async fn run_blocking<T, F>(f: F) -> Result<T, VaultError>
where
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Worker(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};

    /// Deterministic entropy that counts upward, for reproducible blobs.
    struct CountingEntropy(AtomicU8);

    impl EntropySource for CountingEntropy {
        fn fill(&self, buf: &mut [u8]) -> Result<(), VaultError> {
            for b in buf.iter_mut() {
                *b = self.0.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    struct BrokenEntropy;

    impl EntropySource for BrokenEntropy {
        fn fill(&self, _buf: &mut [u8]) -> Result<(), VaultError> {
            Err(VaultError::EntropyUnavailable("getrandom unavailable".into()))
        }
    }

    fn decode(blob: &str) -> Vec<u8> {
        STANDARD.decode(blob).unwrap()
    }

    #[test]
    fn derive_key_is_deterministic() {
        let salt = [7u8; SALT_LEN];
        let a = derive_key("correct horse", &salt);
        let b = derive_key("correct horse", &salt);
        assert_eq!(*a, *b);
    }

    #[test]
    fn derive_key_depends_on_salt_and_secret() {
        let base = derive_key("correct horse", &[1u8; SALT_LEN]);
        let other_salt = derive_key("correct horse", &[2u8; SALT_LEN]);
        let other_secret = derive_key("battery staple", &[1u8; SALT_LEN]);
        assert_ne!(*base, *other_salt);
        assert_ne!(*base, *other_secret);
    }

    #[tokio::test]
    async fn encrypt_then_decrypt_round_trips() {
        let vault = CredentialVault::new();
        let plaintext = r#"{"openai":{"key":"sk-test","model":"gpt-x"}}"#;

        let blob = vault.encrypt(plaintext, "s3cret").await.unwrap();
        let decrypted = vault.decrypt(&blob, "s3cret").await.unwrap();

        assert_eq!(decrypted.as_str(), plaintext);
    }

    #[tokio::test]
    async fn blob_layout_is_salt_nonce_ciphertext() {
        let vault = CredentialVault::new().with_entropy(Arc::new(CountingEntropy(AtomicU8::new(0))));

        let blob = vault.encrypt("hello", "pw").await.unwrap();
        let bytes = decode(&blob);

        assert_eq!(bytes.len(), SALT_LEN + NONCE_LEN + "hello".len() + TAG_LEN);
        assert_eq!(&bytes[..SALT_LEN], &(0u8..16).collect::<Vec<_>>()[..]);
        assert_eq!(&bytes[SALT_LEN..SALT_LEN + NONCE_LEN], &(16u8..28).collect::<Vec<_>>()[..]);
    }

    #[tokio::test]
    async fn wrong_secret_fails_with_decryption_failed() {
        let vault = CredentialVault::new();
        let blob = vault.encrypt("payload", "right").await.unwrap();

        let err = vault.decrypt(&blob, "wrong").await.unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }

    #[tokio::test]
    async fn same_plaintext_encrypts_to_different_blobs() {
        let vault = CredentialVault::new();
        let a = vault.encrypt("payload", "pw").await.unwrap();
        let b = vault.encrypt("payload", "pw").await.unwrap();

        assert_ne!(a, b);
        let (a, b) = (decode(&a), decode(&b));
        assert_ne!(&a[..SALT_LEN], &b[..SALT_LEN], "salt must be fresh");
        assert_ne!(
            &a[SALT_LEN..SALT_LEN + NONCE_LEN],
            &b[SALT_LEN..SALT_LEN + NONCE_LEN],
            "nonce must be fresh"
        );
    }

    #[tokio::test]
    async fn tampered_ciphertext_is_rejected() {
        let vault = CredentialVault::new();
        let blob = vault.encrypt("payload", "pw").await.unwrap();

        let mut bytes = decode(&blob);
        let idx = SALT_LEN + NONCE_LEN + 2;
        bytes[idx] ^= 0x01;
        let tampered = STANDARD.encode(&bytes);

        let err = vault.decrypt(&tampered, "pw").await.unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }

    #[tokio::test]
    async fn malformed_blobs_report_the_same_error() {
        let vault = CredentialVault::new();

        for blob in ["not base64 at all!", "", "AAAA"] {
            let err = vault.decrypt(blob, "pw").await.unwrap_err();
            assert!(matches!(err, VaultError::DecryptionFailed), "blob {blob:?}");
        }
    }

    #[tokio::test]
    async fn encrypt_aborts_without_entropy() {
        let vault = CredentialVault::new().with_entropy(Arc::new(BrokenEntropy));
        let err = vault.encrypt("payload", "pw").await.unwrap_err();
        assert!(matches!(err, VaultError::EntropyUnavailable(_)));
    }

    #[test]
    fn vault_secret_debug_is_redacted() {
        let secret = VaultSecret::passphrase("hunter2");
        let debug = format!("{secret:?}");
        assert!(!debug.contains("hunter2"));
    }
}
