//! Wiring from configuration to a ready [`ProviderGateway`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use forge_models::activity::TracingSink;
use forge_models::providers::ReqwestTransport;
use forge_models::storage::{BlobStore, FileBlobStore, KeyringBlobStore};
use forge_models::vault::VaultSecret;
use forge_models::{ProviderGateway, StoreStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{ForgeConfig, VaultBackend};

/// Environment variable holding the vault passphrase.
pub const PASSPHRASE_ENV: &str = "FORGE_PASSPHRASE";

/// Keychain service name for the keyring backend.
pub const KEYRING_SERVICE: &str = "forge";

/// Build the gateway described by `config` and load the persisted store.
pub async fn open_gateway(config: &ForgeConfig) -> Result<ProviderGateway> {
    let transport =
        ReqwestTransport::with_timeout(Duration::from_secs(config.network.timeout_secs))?;

    let gateway = ProviderGateway::builder(blob_store(config))
        .secret(vault_secret(std::env::var(PASSPHRASE_ENV).ok()))
        .transport(Arc::new(transport))
        .activity(Arc::new(TracingSink::new()))
        .build();

    match gateway.load_store().await {
        StoreStatus::Fresh => debug!("no credentials stored yet"),
        StoreStatus::Loaded { entries } => debug!(entries, "credentials loaded"),
        StoreStatus::Reset => warn!(
            "stored credentials could not be opened (changed passphrase or machine?); starting empty"
        ),
    }

    Ok(gateway)
}

fn blob_store(config: &ForgeConfig) -> Arc<dyn BlobStore> {
    match config.vault.backend {
        VaultBackend::File => {
            let path = config
                .vault
                .path
                .clone()
                .unwrap_or_else(forge_paths::vault_path);
            Arc::new(FileBlobStore::new(path))
        }
        VaultBackend::Keyring => Arc::new(KeyringBlobStore::new(KEYRING_SERVICE)),
    }
}

/// A non-empty passphrase seals the vault; otherwise the device fingerprint does.
fn vault_secret(passphrase: Option<String>) -> VaultSecret {
    match passphrase {
        Some(p) if !p.is_empty() => VaultSecret::passphrase(p),
        _ => VaultSecret::DeviceFingerprint,
    }
}

/// A token that fires on Ctrl-C, for aborting in-flight provider calls.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_passphrase_falls_back_to_fingerprint() {
        assert!(matches!(vault_secret(None), VaultSecret::DeviceFingerprint));
        assert!(matches!(
            vault_secret(Some(String::new())),
            VaultSecret::DeviceFingerprint
        ));
        assert!(matches!(
            vault_secret(Some("hunter2".into())),
            VaultSecret::Passphrase(_)
        ));
    }

    #[tokio::test]
    async fn file_backend_uses_configured_path() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("vault");
        let mut config = ForgeConfig::default();
        config.vault.path = Some(path.clone());

        let store = blob_store(&config);
        store.write("sealed").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "sealed");
    }

    #[tokio::test]
    async fn open_gateway_starts_fresh_without_a_vault() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = ForgeConfig::default();
        config.vault.path = Some(temp_dir.path().join("vault"));

        let gateway = open_gateway(&config).await.unwrap();

        assert!(gateway.list_configured_providers().await.is_empty());
    }
}
