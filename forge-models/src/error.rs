//! Error types for the vault, gateway and provider layers.

use std::fmt;

use thiserror::Error;

use crate::ProviderId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during vault and gateway operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Vault encryption or decryption failed.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),

    /// Provider is not part of the registry.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// No API key is configured for the provider.
    #[error("no API key configured for {0}")]
    MissingCredential(ProviderId),

    /// The provider rejected or failed the request.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Blob storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the credential vault.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Wrong secret or corrupted blob. The two causes are deliberately
    /// indistinguishable.
    #[error("decryption failed: invalid secret or corrupted data")]
    DecryptionFailed,

    /// The secure random number generator could not produce bytes.
    #[error("secure randomness unavailable: {0}")]
    EntropyUnavailable(String),

    /// The AEAD primitive refused to encrypt.
    #[error("encryption failed")]
    EncryptionFailed,

    /// The blocking crypto task did not complete.
    #[error("crypto worker failed: {0}")]
    Worker(String),
}

/// Classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Key rejected (401/403 or an auth error envelope).
    Auth,
    /// Rate limit or billing quota exhausted.
    Quota,
    /// Provider returned no content, citing a block or finish reason.
    SafetyBlock,
    /// Transport-level failure before a response arrived.
    Network,
    /// A 2xx body did not match the provider's envelope.
    MalformedResponse,
    /// Caller cancelled the in-flight request.
    Cancelled,
    /// Any other non-2xx response.
    Other,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Auth => "authentication error",
            Self::Quota => "quota exceeded",
            Self::SafetyBlock => "safety block",
            Self::Network => "network error",
            Self::MalformedResponse => "malformed response",
            Self::Cancelled => "request cancelled",
            Self::Other => "API error",
        };
        f.write_str(label)
    }
}

/// A failure reported by (or while talking to) a provider.
///
/// `message` is the provider's own text whenever the error body carried one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} {kind}: {message}")]
pub struct ProviderError {
    pub provider: ProviderId,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: ProviderId, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }
}

impl Error {
    /// Provider error kind, if this is a provider failure.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Error::Provider(e) => Some(e.kind),
            _ => None,
        }
    }
}
