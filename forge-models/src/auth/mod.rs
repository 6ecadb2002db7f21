//! In-memory credential store.
//!
//! Holds one [`CredentialEntry`] per configured provider. The store is only
//! ever persisted as a whole: the gateway serializes it to JSON, encrypts the
//! JSON through the vault and writes the resulting blob.
//!
//! # Example
//!
//! ```
//! use forge_models::ProviderId;
//! use forge_models::auth::{ApiKey, CredentialStore};
//!
//! let mut store = CredentialStore::default();
//! store.set(ProviderId::OpenAi, ApiKey::new("sk-..."), "gpt-4.1-mini");
//! assert!(store.configured().contains(&ProviderId::OpenAi));
//! ```

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::{ProviderId, Result};

/// A secure API key that prevents accidental logging.
///
/// The key is wrapped in `SecretString` which:
/// - Implements `Debug` as `"[REDACTED]"`
/// - Zeroizes memory on drop
/// - Requires explicit `.expose_secret()` to access the value
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Expose the secret key value.
    ///
    /// Use sparingly - only when actually sending to an API or sealing the
    /// store in the vault.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key is empty (an unconfigured slot).
    pub fn is_empty(&self) -> bool {
        self.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// Serialization exposes the key: it only ever feeds the vault plaintext.
impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose_secret())
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(ApiKey::new)
    }
}

/// Stored configuration and usage counters for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialEntry {
    pub key: ApiKey,
    pub model: String,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub request_count: u64,
}

impl CredentialEntry {
    /// A freshly configured entry with zeroed usage.
    pub fn new(key: ApiKey, model: impl Into<String>) -> Self {
        Self {
            key,
            model: model.into(),
            last_used: None,
            request_count: 0,
        }
    }

    /// Record one successful request at `at`.
    pub fn record_use(&mut self, at: DateTime<Utc>) {
        self.last_used = Some(at);
        self.request_count += 1;
    }
}

/// Read-only usage projection for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub last_used: Option<DateTime<Utc>>,
    pub request_count: u64,
    pub model: String,
}

/// Provider id → credential entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialStore {
    entries: BTreeMap<ProviderId, CredentialEntry>,
}

impl CredentialStore {
    /// Parse a store from its JSON plaintext.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to JSON plaintext. The buffer is wiped on drop.
    pub fn to_json(&self) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(serde_json::to_string(self)?))
    }

    /// Insert or replace a provider's entry, resetting its usage.
    pub fn set(&mut self, provider: ProviderId, key: ApiKey, model: impl Into<String>) {
        self.entries
            .insert(provider, CredentialEntry::new(key, model));
    }

    /// Remove a provider's entry. Returns whether one existed.
    pub fn remove(&mut self, provider: ProviderId) -> bool {
        self.entries.remove(&provider).is_some()
    }

    /// Entry for a provider, if any.
    pub fn get(&self, provider: ProviderId) -> Option<&CredentialEntry> {
        self.entries.get(&provider)
    }

    /// Mutable entry for a provider, if any.
    pub fn get_mut(&mut self, provider: ProviderId) -> Option<&mut CredentialEntry> {
        self.entries.get_mut(&provider)
    }

    /// Entry for a provider only if it carries a non-empty key.
    pub fn configured_entry(&self, provider: ProviderId) -> Option<&CredentialEntry> {
        self.get(provider).filter(|e| !e.key.is_empty())
    }

    /// Providers with a non-empty key.
    pub fn configured(&self) -> BTreeSet<ProviderId> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.key.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Usage counters for configured providers.
    pub fn usage(&self) -> BTreeMap<ProviderId, UsageStats> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.key.is_empty())
            .map(|(id, e)| {
                (
                    *id,
                    UsageStats {
                        last_used: e.last_used,
                        request_count: e.request_count,
                        model: e.model.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
