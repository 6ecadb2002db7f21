//! Provider gateway: one contract over three LLM providers.
//!
//! The gateway owns the [`CredentialStore`]. The store lives in memory behind
//! a mutex and leaves the process only as a vault blob: every mutation
//! re-encrypts the whole store and writes it to the [`BlobStore`] while the
//! lock is held. Network calls never hold the lock.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use forge_models::{GenerationRequest, ProviderId};
//! use forge_models::auth::ApiKey;
//! use forge_models::gateway::{GenerateOptions, ProviderGateway};
//! use forge_models::storage::FileBlobStore;
//!
//! # async fn run() -> forge_models::Result<()> {
//! let gateway = ProviderGateway::builder(Arc::new(FileBlobStore::new("/tmp/forge/vault"))).build();
//! gateway.load_store().await;
//! gateway.set_credential(ProviderId::OpenAi, ApiKey::new("sk-..."), None).await?;
//!
//! let text = gateway
//!     .generate(
//!         ProviderId::OpenAi,
//!         &GenerationRequest::new("A lighthouse in a storm"),
//!         None,
//!         GenerateOptions::default(),
//!     )
//!     .await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod prompt;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activity::{ActivitySink, HistoryMode, NoopSink};
use crate::auth::{ApiKey, CredentialStore, UsageStats};
use crate::error::{ProviderError, ProviderErrorKind};
use crate::providers::{
    ChatCall, CredentialCheck, HttpRequest, HttpResponse, HttpTransport, ProviderInfo,
    ProviderRegistry, ReqwestTransport,
};
use crate::registry::ModelProfile;
use crate::sanitize::sanitize;
use crate::storage::BlobStore;
use crate::vault::{CredentialVault, VaultSecret};
use crate::{EnhancedScene, Error, GenerationRequest, ProviderId, Result};

/// Sampling temperature when the caller does not set one.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Output token budget when the caller does not set one.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Per-call generation settings.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Cancelling drops the in-flight request.
    pub cancel: Option<CancellationToken>,
}

impl GenerateOptions {
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// What [`ProviderGateway::load_store`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Nothing persisted yet.
    Fresh,
    /// Blob decrypted and parsed.
    Loaded { entries: usize },
    /// Blob unreadable, undecryptable or malformed; started empty.
    Reset,
}

/// Builder for [`ProviderGateway`].
pub struct GatewayBuilder {
    storage: Arc<dyn BlobStore>,
    providers: ProviderRegistry,
    vault: CredentialVault,
    secret: VaultSecret,
    transport: Option<Arc<dyn HttpTransport>>,
    activity: Arc<dyn ActivitySink>,
}

impl GatewayBuilder {
    pub fn providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    pub fn vault(mut self, vault: CredentialVault) -> Self {
        self.vault = vault;
        self
    }

    /// Secret the store is sealed with. Defaults to the device fingerprint.
    pub fn secret(mut self, secret: VaultSecret) -> Self {
        self.secret = secret;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn activity(mut self, activity: Arc<dyn ActivitySink>) -> Self {
        self.activity = activity;
        self
    }

    /// Build the gateway with an empty store. Call
    /// [`ProviderGateway::load_store`] to read persisted credentials.
    pub fn build(self) -> ProviderGateway {
        ProviderGateway {
            providers: self.providers,
            vault: self.vault,
            secret: self.secret,
            storage: self.storage,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(ReqwestTransport::new())),
            activity: self.activity,
            store: Mutex::new(CredentialStore::default()),
        }
    }
}

/// Credential-aware front door to every provider.
pub struct ProviderGateway {
    providers: ProviderRegistry,
    vault: CredentialVault,
    secret: VaultSecret,
    storage: Arc<dyn BlobStore>,
    transport: Arc<dyn HttpTransport>,
    activity: Arc<dyn ActivitySink>,
    store: Mutex<CredentialStore>,
}

impl ProviderGateway {
    pub fn builder(storage: Arc<dyn BlobStore>) -> GatewayBuilder {
        GatewayBuilder {
            storage,
            providers: ProviderRegistry::default(),
            vault: CredentialVault::new(),
            secret: VaultSecret::default(),
            transport: None,
            activity: Arc::new(NoopSink),
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    // ────────────────────────────────────────────────────────────────────────
    // Persistence
    // ────────────────────────────────────────────────────────────────────────

    /// Replace the in-memory store with the persisted one.
    ///
    /// Never fails: anything that prevents reading the blob leaves an empty
    /// store and reports [`StoreStatus::Reset`].
    pub async fn load_store(&self) -> StoreStatus {
        let mut store = self.store.lock().await;

        let blob = match self.storage.read().await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("no persisted credential store");
                *store = CredentialStore::default();
                return StoreStatus::Fresh;
            }
            Err(e) => {
                warn!(error = %e, "could not read credential store, starting fresh");
                *store = CredentialStore::default();
                return StoreStatus::Reset;
            }
        };

        match self.open_blob(&blob).await {
            Ok(loaded) => {
                let entries = loaded.len();
                *store = loaded;
                debug!(entries, "loaded credential store");
                StoreStatus::Loaded { entries }
            }
            Err(e) => {
                warn!(error = %e, "could not open credential store, starting fresh");
                *store = CredentialStore::default();
                StoreStatus::Reset
            }
        }
    }

    /// Encrypt and persist the current store.
    pub async fn save_store(&self) -> Result<()> {
        let store = self.store.lock().await;
        self.persist(&store).await
    }

    /// Delete the persisted blob and empty the in-memory store.
    pub async fn forget_store(&self) -> Result<()> {
        let mut store = self.store.lock().await;
        self.storage.clear().await?;
        *store = CredentialStore::default();
        info!("cleared credential store");
        Ok(())
    }

    async fn open_blob(&self, blob: &str) -> Result<CredentialStore> {
        let secret = self.vault.resolve_secret(&self.secret);
        let plaintext = self.vault.decrypt(blob, secret.expose_secret()).await?;
        CredentialStore::from_json(&plaintext)
    }

    async fn persist(&self, store: &CredentialStore) -> Result<()> {
        let json = store.to_json()?;
        let secret = self.vault.resolve_secret(&self.secret);
        let blob = self.vault.encrypt(&json, secret.expose_secret()).await?;
        self.storage.write(&blob).await?;
        debug!(entries = store.len(), "persisted credential store");
        Ok(())
    }

    /// Apply `change` to a copy of the store, persist it, then swap it in.
    async fn mutate<T>(&self, change: impl FnOnce(&mut CredentialStore) -> T) -> Result<T> {
        let mut store = self.store.lock().await;
        let mut updated = store.clone();
        let out = change(&mut updated);
        self.persist(&updated).await?;
        *store = updated;
        Ok(out)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Credentials
    // ────────────────────────────────────────────────────────────────────────

    /// Configure a provider. `model` defaults to the first catalog entry.
    /// Usage counters start from zero.
    pub async fn set_credential(
        &self,
        provider: ProviderId,
        key: ApiKey,
        model: Option<&str>,
    ) -> Result<()> {
        let info = self.provider_info(provider)?;
        let model = match model.filter(|m| !m.trim().is_empty()) {
            Some(m) => m.to_string(),
            None => info
                .default_model()
                .map(|m| m.id.to_string())
                .unwrap_or_default(),
        };

        self.mutate(|store| store.set(provider, key, model.clone()))
            .await?;
        info!(%provider, %model, "stored credential");
        Ok(())
    }

    /// Remove a provider's entry. Returns whether one existed.
    pub async fn remove_credential(&self, provider: ProviderId) -> Result<bool> {
        let removed = self.mutate(|store| store.remove(provider)).await?;
        info!(%provider, removed, "removed credential");
        Ok(removed)
    }

    pub async fn list_configured_providers(&self) -> BTreeSet<ProviderId> {
        self.store.lock().await.configured()
    }

    pub async fn has_credential(&self, provider: ProviderId) -> bool {
        self.store.lock().await.configured_entry(provider).is_some()
    }

    pub async fn stored_key(&self, provider: ProviderId) -> Option<ApiKey> {
        self.store
            .lock()
            .await
            .configured_entry(provider)
            .map(|e| e.key.clone())
    }

    pub async fn usage_stats(&self) -> BTreeMap<ProviderId, UsageStats> {
        self.store.lock().await.usage()
    }

    /// Check a key with one minimal live request. Never fails: problems are
    /// reported in the returned [`CredentialCheck`].
    pub async fn validate_credential(&self, provider: ProviderId, key: &ApiKey) -> CredentialCheck {
        let Some(info) = self.providers.get(provider) else {
            return CredentialCheck::failed("Unknown provider");
        };
        match self.transport.send(info.validate_request(key)).await {
            Ok(response) => {
                let check = CredentialCheck::from_response(&response);
                debug!(%provider, status = response.status, valid = check.valid, "validated credential");
                check
            }
            Err(e) => CredentialCheck::failed(e.to_string()),
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Generation
    // ────────────────────────────────────────────────────────────────────────

    /// Enhance one scene description.
    ///
    /// With a `profile`, the instruction carries the target model's
    /// constraints. The provider's answer is passed through [`sanitize`].
    pub async fn generate(
        &self,
        provider: ProviderId,
        request: &GenerationRequest,
        profile: Option<&ModelProfile>,
        options: GenerateOptions,
    ) -> Result<String> {
        let system = prompt::system_prompt(profile);
        let user = prompt::user_prompt(request);
        let (model, raw) = self.complete(provider, &system, &user, &options).await?;

        let text = sanitize(&raw);
        self.activity.record_usage_event(
            "generate_prompt",
            json!({
                "provider": provider.as_str(),
                "model": model,
                "target": profile.map(|p| p.id),
                "scene_count": 1,
            }),
        );
        self.activity.record_history_entry(&text, HistoryMode::Ai);
        Ok(text)
    }

    /// Enhance several scenes at once, returning one structured scene per
    /// element of the model's JSON array. An empty input returns an empty
    /// result without contacting the provider.
    pub async fn generate_batch(
        &self,
        provider: ProviderId,
        scenes: &[GenerationRequest],
        options: GenerateOptions,
    ) -> Result<Vec<EnhancedScene>> {
        if scenes.is_empty() {
            debug!(%provider, "empty batch, nothing to send");
            return Ok(Vec::new());
        }
        let user = prompt::batch_user_prompt(scenes)?;
        let (model, raw) = self
            .complete(provider, prompt::BATCH_SYSTEM_PROMPT, &user, &options)
            .await?;

        let json = prompt::strip_code_fences(&raw);
        let enhanced: Vec<EnhancedScene> = match serde_json::from_str(json) {
            Ok(enhanced) => enhanced,
            Err(e) => {
                let err = ProviderError::new(
                    provider,
                    ProviderErrorKind::MalformedResponse,
                    format!("batch output is not a JSON array of scenes: {e}"),
                );
                self.record_failure(&err);
                return Err(err.into());
            }
        };

        if enhanced.len() != scenes.len() {
            warn!(
                %provider,
                requested = scenes.len(),
                returned = enhanced.len(),
                "batch returned a different number of scenes"
            );
        }

        self.activity.record_usage_event(
            "generate_batch",
            json!({
                "provider": provider.as_str(),
                "model": model,
                "scene_count": enhanced.len(),
            }),
        );
        self.activity.record_history_entry(json, HistoryMode::Json);
        Ok(enhanced)
    }

    /// Send one system/user exchange and account for it.
    ///
    /// Returns the model used and the raw text. Usage is only recorded after
    /// the provider produced text.
    async fn complete(
        &self,
        provider: ProviderId,
        system: &str,
        user: &str,
        options: &GenerateOptions,
    ) -> Result<(String, String)> {
        let info = self.provider_info(provider)?;
        let (key, model) = {
            let store = self.store.lock().await;
            let entry = store
                .configured_entry(provider)
                .ok_or(Error::MissingCredential(provider))?;
            (entry.key.clone(), entry.model.clone())
        };

        let call = ChatCall {
            model: &model,
            system,
            user,
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        };
        let request = info.chat_request(&key, &call);
        debug!(%provider, %model, ?request, "sending generation request");

        let text = match self
            .send(provider, request, options.cancel.as_ref())
            .await
            .and_then(|response| info.extract_text(&response))
        {
            Ok(text) => text,
            Err(e) => {
                self.record_failure(&e);
                return Err(e.into());
            }
        };

        self.record_use(provider).await;
        Ok((model, text))
    }

    async fn send(
        &self,
        provider: ProviderId,
        request: HttpRequest,
        cancel: Option<&CancellationToken>,
    ) -> std::result::Result<HttpResponse, ProviderError> {
        let send = self.transport.send(request);
        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    return Err(ProviderError::new(
                        provider,
                        ProviderErrorKind::Cancelled,
                        "request cancelled",
                    ));
                }
                outcome = send => outcome,
            },
            None => send.await,
        };
        outcome.map_err(|e| ProviderError::new(provider, ProviderErrorKind::Network, e.to_string()))
    }

    /// Bump usage for `provider`. Goes through [`Self::mutate`], so a failed
    /// write leaves memory matching disk; the failure is only logged.
    async fn record_use(&self, provider: ProviderId) {
        let at = Utc::now();
        let recorded = self
            .mutate(|store| {
                if let Some(entry) = store.get_mut(provider) {
                    entry.record_use(at);
                }
            })
            .await;
        if let Err(e) = recorded {
            warn!(%provider, error = %e, "could not persist usage counters");
        }
    }

    fn record_failure(&self, err: &ProviderError) {
        warn!(provider = %err.provider, kind = %err.kind, message = %err.message, "generation failed");
        self.activity.record_usage_event(
            "error",
            json!({
                "type": err.kind.to_string(),
                "message": err.message,
            }),
        );
    }

    fn provider_info(&self, provider: ProviderId) -> Result<&ProviderInfo> {
        self.providers
            .get(provider)
            .ok_or_else(|| Error::UnknownProvider(provider.to_string()))
    }
}
