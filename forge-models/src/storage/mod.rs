//! Persistent slot for the encrypted credential blob.
//!
//! The gateway never sees plaintext on disk: it hands a [`BlobStore`] the
//! base64 vault blob and reads it back the same way.

mod file;
mod os_keyring;

pub use file::FileBlobStore;
pub use os_keyring::KeyringBlobStore;

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{Error, Result};

/// One opaque string slot.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Current contents, or `None` if nothing has been written.
    async fn read(&self) -> Result<Option<String>>;

    /// Replace the contents.
    async fn write(&self, blob: &str) -> Result<()>;

    /// Remove the contents. Clearing an empty slot is not an error.
    async fn clear(&self) -> Result<()>;
}

/// In-process slot, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    slot: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `blob` already stored.
    pub fn with_blob(blob: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(blob.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.slot
            .lock()
            .map_err(|_| Error::Storage("memory slot poisoned".to_string()))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    async fn write(&self, blob: &str) -> Result<()> {
        *self.lock()? = Some(blob.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}
