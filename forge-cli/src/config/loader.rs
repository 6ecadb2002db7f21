use super::types::{
    DEFAULT_TIMEOUT_SECS, ForgeConfig, GenerationConfig, NetworkConfig, RawForgeConfig,
    RawGenerationConfig, RawNetworkConfig, RawVaultConfig, VaultConfig,
};
use anyhow::Result;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<ForgeConfig> {
        Self::load_from(Some(&Self::user_config_path()), &Self::project_config_path())
    }

    /// Load and merge the given layers. Missing files are skipped.
    pub fn load_from(user_path: Option<&Path>, project_path: &Path) -> Result<ForgeConfig> {
        let mut raw = RawForgeConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project_path)?);
        }

        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<RawForgeConfig> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Get user config path (`$XDG_CONFIG_HOME/forge/config.toml`)
    pub fn user_config_path() -> PathBuf {
        forge_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with FORGE_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("FORGE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".forge/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawForgeConfig, overlay: RawForgeConfig) -> RawForgeConfig {
        RawForgeConfig {
            vault: RawVaultConfig {
                backend: overlay.vault.backend.or(base.vault.backend),
                path: overlay.vault.path.or(base.vault.path),
            },
            generation: RawGenerationConfig {
                provider: overlay.generation.provider.or(base.generation.provider),
                target: overlay.generation.target.or(base.generation.target),
                temperature: overlay.generation.temperature.or(base.generation.temperature),
                max_tokens: overlay.generation.max_tokens.or(base.generation.max_tokens),
            },
            network: RawNetworkConfig {
                timeout_secs: overlay.network.timeout_secs.or(base.network.timeout_secs),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawForgeConfig) -> ForgeConfig {
        let generation = GenerationConfig::default();
        ForgeConfig {
            vault: VaultConfig {
                backend: raw.vault.backend.unwrap_or_default(),
                path: raw.vault.path,
            },
            generation: GenerationConfig {
                provider: raw.generation.provider.unwrap_or(generation.provider),
                target: raw.generation.target.filter(|t| !t.trim().is_empty()),
                temperature: raw.generation.temperature.unwrap_or(generation.temperature),
                max_tokens: raw.generation.max_tokens.unwrap_or(generation.max_tokens),
            },
            network: NetworkConfig {
                timeout_secs: raw.network.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
        }
    }

    /// Save config to a specific path
    ///
    /// Creates parent directories if they don't exist.
    pub fn save_to_path(config: &ForgeConfig, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(config)?;
        std::fs::write(path, toml)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::VaultBackend;
    use forge_models::ProviderId;
    use serial_test::serial;
    use tempfile::TempDir;

    fn raw(toml_str: &str) -> RawForgeConfig {
        toml::from_str(toml_str).unwrap()
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_overlay_wins_when_set() {
        let base = raw("[generation]\nprovider = \"openai\"\ntemperature = 0.9\n");
        let overlay = raw("[generation]\nprovider = \"gemini\"\n");

        let merged = ConfigLoader::merge_raw(base, overlay);

        assert_eq!(merged.generation.provider, Some(ProviderId::Gemini));
        // Not set in overlay, base survives
        assert_eq!(merged.generation.temperature, Some(0.9));
    }

    #[test]
    fn test_unset_overlay_keeps_base_sections() {
        let base = raw("[vault]\nbackend = \"keyring\"\n[network]\ntimeout_secs = 5\n");
        let merged = ConfigLoader::merge_raw(base, RawForgeConfig::default());

        assert_eq!(merged.vault.backend, Some(VaultBackend::Keyring));
        assert_eq!(merged.network.timeout_secs, Some(5));
    }

    #[test]
    fn test_finalize_applies_defaults() {
        let config = ConfigLoader::finalize(raw("[generation]\nmax_tokens = 900\n"));

        assert_eq!(config.generation.max_tokens, 900);
        assert_eq!(config.generation.temperature, 0.7);
        assert_eq!(config.generation.provider, ProviderId::OpenAi);
        assert_eq!(config.network.timeout_secs, 60);
    }

    #[test]
    fn test_finalize_drops_blank_target() {
        let config = ConfigLoader::finalize(raw("[generation]\ntarget = \"  \"\n"));
        assert!(config.generation.target.is_none());
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_load_layers_project_over_user() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user.toml");
        let project = temp_dir.path().join("project.toml");
        std::fs::write(
            &user,
            "[generation]\nprovider = \"anthropic\"\ntarget = \"veo\"\n",
        )
        .unwrap();
        std::fs::write(&project, "[generation]\ntarget = \"kling\"\n").unwrap();

        let config = ConfigLoader::load_from(Some(&user), &project).unwrap();

        assert_eq!(config.generation.provider, ProviderId::Anthropic);
        assert_eq!(config.generation.target.as_deref(), Some("kling"));
    }

    #[test]
    fn test_load_missing_files_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigLoader::load_from(
            Some(&temp_dir.path().join("absent.toml")),
            &temp_dir.path().join("also-absent.toml"),
        )
        .unwrap();

        assert_eq!(config.vault.backend, VaultBackend::File);
        assert_eq!(config.generation.max_tokens, 500);
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join("config.toml");
        std::fs::write(&project, "[generation\nprovider = ").unwrap();

        assert!(ConfigLoader::load_from(None, &project).is_err());
    }

    #[test]
    #[serial]
    fn test_project_path_env_override() {
        let temp_dir = TempDir::new().unwrap();

        // SAFETY: env access is serialized across tests in this crate
        unsafe {
            std::env::set_var("FORGE_PROJECT_CONFIG_DIR", temp_dir.path());
        }
        let path = ConfigLoader::project_config_path();
        unsafe {
            std::env::remove_var("FORGE_PROJECT_CONFIG_DIR");
        }

        assert_eq!(path, temp_dir.path().join("config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_path_default() {
        unsafe {
            std::env::remove_var("FORGE_PROJECT_CONFIG_DIR");
        }
        assert_eq!(
            ConfigLoader::project_config_path(),
            PathBuf::from(".forge/config.toml")
        );
    }

    // ==================== Save Tests ====================

    #[test]
    fn test_save_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir
            .path()
            .join("nested")
            .join("deep")
            .join("config.toml");

        ConfigLoader::save_to_path(&ForgeConfig::default(), &path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_saved_config_loads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = ForgeConfig::default();
        config.generation.provider = ProviderId::Gemini;
        config.generation.target = Some("luma".to_string());
        config.network.timeout_secs = 30;
        ConfigLoader::save_to_path(&config, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("provider = \"gemini\""));
        assert!(contents.contains("timeout_secs = 30"));

        let loaded = ConfigLoader::load_from(None, &path).unwrap();
        assert_eq!(loaded.generation.provider, ProviderId::Gemini);
        assert_eq!(loaded.generation.target.as_deref(), Some("luma"));
    }
}
