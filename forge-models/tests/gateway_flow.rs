//! End-to-end gateway tests
//!
//! These tests drive the public API the way the CLI does:
//! - credentials are sealed in a real file through the vault
//! - generation goes through a fake transport that answers per provider
//! - usage counters survive a reload

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use forge_models::auth::ApiKey;
use forge_models::gateway::{GenerateOptions, ProviderGateway, StoreStatus};
use forge_models::providers::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use forge_models::registry::ModelProfileRegistry;
use forge_models::storage::{BlobStore, FileBlobStore, MemoryBlobStore};
use forge_models::vault::{CredentialVault, EnvironmentProbe, ProbeError, VaultSecret};
use forge_models::{Error, GenerationRequest, ProviderId};

/// Answers every provider with a canned success and counts calls.
#[derive(Default)]
struct ScriptedTransport {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(request.url.clone());

        let body = if request.url.contains("api.openai.com") {
            json!({"choices": [{"message": {"content": "Prompt: \"Fog drifts over a quiet harbor\""}, "finish_reason": "stop"}]})
        } else if request.url.contains("api.anthropic.com") {
            json!({"content": [{"type": "text", "text": "Neon rain on empty streets"}], "stop_reason": "end_turn"})
        } else {
            json!({"candidates": [{"content": {"parts": [{"text": "'Dunes at golden hour'"}]}, "finishReason": "STOP"}]})
        };
        Ok(HttpResponse::new(200, body.to_string()))
    }
}

/// Deterministic environment for passwordless mode.
struct TestProbe;

impl EnvironmentProbe for TestProbe {
    fn user_agent(&self) -> Result<String, ProbeError> {
        Ok("forge (test; x86_64; /home/test)".into())
    }

    fn locale(&self) -> Result<String, ProbeError> {
        Ok("en_US.UTF-8".into())
    }

    fn display_dimensions(&self) -> Result<String, ProbeError> {
        Ok("headless".into())
    }

    fn timezone_offset(&self) -> Result<i32, ProbeError> {
        Ok(0)
    }

    fn logical_cores(&self) -> Result<Option<usize>, ProbeError> {
        Ok(Some(4))
    }
}

fn passwordless_gateway(
    storage: Arc<dyn BlobStore>,
    transport: Arc<ScriptedTransport>,
) -> ProviderGateway {
    ProviderGateway::builder(storage)
        .vault(CredentialVault::new().with_probe(Arc::new(TestProbe)))
        .secret(VaultSecret::DeviceFingerprint)
        .transport(transport)
        .build()
}

#[tokio::test]
async fn set_list_generate_usage_round_trip() {
    let dir = TempDir::new().unwrap();
    let storage: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(dir.path().join("vault")));
    let transport = Arc::new(ScriptedTransport::default());

    let gateway = passwordless_gateway(storage.clone(), transport.clone());
    assert_eq!(gateway.load_store().await, StoreStatus::Fresh);

    gateway
        .set_credential(ProviderId::OpenAi, ApiKey::new("sk-test-1"), None)
        .await
        .unwrap();
    let configured = gateway.list_configured_providers().await;
    assert_eq!(configured.into_iter().collect::<Vec<_>>(), [ProviderId::OpenAi]);

    let start = Utc::now();
    let profile = ModelProfileRegistry::new().get_profile("veo");
    let text = gateway
        .generate(
            ProviderId::OpenAi,
            &GenerationRequest::new("a harbor").lighting("overcast"),
            profile,
            GenerateOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(text, "Fog drifts over a quiet harbor");

    let usage = gateway.usage_stats().await;
    let stats = &usage[&ProviderId::OpenAi];
    assert_eq!(stats.request_count, 1);
    assert_eq!(stats.model, "gpt-5.2-pro");
    assert!(stats.last_used.unwrap() >= start);
    assert_eq!(transport.calls(), 1);

    // The blob on disk never contains the key in the clear.
    let raw = std::fs::read_to_string(dir.path().join("vault")).unwrap();
    assert!(!raw.contains("sk-test-1"));

    // A second process with the same environment sees the same state.
    let reopened = passwordless_gateway(storage, transport);
    assert_eq!(reopened.load_store().await, StoreStatus::Loaded { entries: 1 });
    assert_eq!(reopened.usage_stats().await[&ProviderId::OpenAi].request_count, 1);
}

#[tokio::test]
async fn every_provider_normalizes_to_clean_text() {
    let transport = Arc::new(ScriptedTransport::default());
    let gateway = passwordless_gateway(Arc::new(MemoryBlobStore::new()), transport.clone());

    for provider in ProviderId::ALL {
        gateway
            .set_credential(provider, ApiKey::new(format!("key-{provider}")), None)
            .await
            .unwrap();
    }

    let request = GenerationRequest::new("scene");
    let mut outputs = Vec::new();
    for provider in ProviderId::ALL {
        outputs.push(
            gateway
                .generate(provider, &request, None, GenerateOptions::default())
                .await
                .unwrap(),
        );
    }

    assert_eq!(
        outputs,
        [
            "Fog drifts over a quiet harbor",
            "Neon rain on empty streets",
            "Dunes at golden hour",
        ]
    );
    let urls = transport.urls.lock().unwrap().clone();
    assert!(urls[2].ends_with("/v1beta/models/gemini-3-pro:generateContent"));
}

#[tokio::test]
async fn missing_credential_makes_no_network_call() {
    let transport = Arc::new(ScriptedTransport::default());
    let gateway = passwordless_gateway(Arc::new(MemoryBlobStore::new()), transport.clone());

    let err = gateway
        .generate(
            ProviderId::Anthropic,
            &GenerationRequest::new("scene"),
            None,
            GenerateOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MissingCredential(ProviderId::Anthropic)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn changed_passphrase_starts_from_empty_store() {
    let storage: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let transport = Arc::new(ScriptedTransport::default());

    let first = ProviderGateway::builder(storage.clone())
        .secret(VaultSecret::passphrase("first passphrase"))
        .transport(transport.clone())
        .build();
    first
        .set_credential(ProviderId::Gemini, ApiKey::new("AIza-1"), None)
        .await
        .unwrap();

    let second = ProviderGateway::builder(storage)
        .secret(VaultSecret::passphrase("second passphrase"))
        .transport(transport)
        .build();
    assert_eq!(second.load_store().await, StoreStatus::Reset);
    assert!(second.list_configured_providers().await.is_empty());
}

#[tokio::test]
async fn concurrent_mutations_all_persist() {
    let storage: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let transport = Arc::new(ScriptedTransport::default());
    let gateway = Arc::new(passwordless_gateway(storage.clone(), transport.clone()));

    let handles: Vec<_> = ProviderId::ALL
        .into_iter()
        .map(|provider| {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move {
                gateway
                    .set_credential(provider, ApiKey::new("k"), None)
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let reopened = passwordless_gateway(storage, transport);
    assert_eq!(reopened.load_store().await, StoreStatus::Loaded { entries: 3 });
}
