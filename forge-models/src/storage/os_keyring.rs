//! System keyring blob slot.

use async_trait::async_trait;
use tracing::debug;

use super::BlobStore;
use crate::{Error, Result};

/// Default keyring account holding the vault blob.
pub const DEFAULT_ACCOUNT: &str = "credential-vault";

/// Stores the blob as a single system keyring secret.
///
/// Keyring calls may block on the platform secret service, so each one runs
/// on the blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringBlobStore {
    service: String,
    account: String,
}

impl KeyringBlobStore {
    /// # Arguments
    ///
    /// * `service` - Service identifier for the keyring (e.g., "forge")
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: DEFAULT_ACCOUNT.to_string(),
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    async fn with_entry<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        let account = self.account.clone();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account)
                .map_err(|e| Error::Storage(format!("keyring: {e}")))?;
            op(entry)
        })
        .await
        .map_err(|e| Error::Storage(format!("keyring task failed: {e}")))?
    }
}

#[async_trait]
impl BlobStore for KeyringBlobStore {
    async fn read(&self) -> Result<Option<String>> {
        self.with_entry(|entry| match entry.get_password() {
            Ok(blob) => Ok(Some(blob)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Storage(format!("keyring: {e}"))),
        })
        .await
    }

    async fn write(&self, blob: &str) -> Result<()> {
        let blob = blob.to_string();
        self.with_entry(move |entry| {
            entry
                .set_password(&blob)
                .map_err(|e| Error::Storage(format!("keyring: {e}")))
        })
        .await?;
        debug!(service = %self.service, "stored vault blob in keyring");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.with_entry(|entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!("keyring: {e}"))),
        })
        .await
    }
}
