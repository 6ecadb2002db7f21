use std::path::PathBuf;

use forge_models::ProviderId;
use forge_models::gateway::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};

/// Default request timeout for provider calls, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawForgeConfig {
    #[serde(default)]
    pub vault: RawVaultConfig,

    #[serde(default)]
    pub generation: RawGenerationConfig,

    #[serde(default)]
    pub network: RawNetworkConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawVaultConfig {
    pub backend: Option<VaultBackend>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawGenerationConfig {
    pub provider: Option<ProviderId>,
    pub target: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawNetworkConfig {
    pub timeout_secs: Option<u64>,
}

/// Where the encrypted credential blob lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultBackend {
    /// A 0600 file under the data directory
    #[default]
    File,
    /// The OS keychain
    Keyring,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ForgeConfig {
    #[serde(default)]
    pub vault: VaultConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VaultConfig {
    pub backend: VaultBackend,

    /// Vault file location (file backend only). Defaults to the XDG data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Provider used by `generate` and `batch` when none is given
    pub provider: ProviderId,

    /// Target video model profile id (e.g. "veo")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    pub temperature: f64,

    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderId::OpenAi,
            target: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
