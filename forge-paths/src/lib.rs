//! XDG Base Directory paths for forge.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths. This matches tools like gh, docker, kubectl.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "forge";

/// Name of the encrypted credential blob inside [`data_dir`].
pub const VAULT_FILE: &str = "vault";

/// Get the forge config directory.
///
/// Returns `$XDG_CONFIG_HOME/forge` if set, otherwise `~/.config/forge`.
/// This is where `config.toml` lives.
///
/// # Examples
///
/// ```
/// use forge_paths::config_dir;
///
/// let config = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".config",
    )
}

/// Get the forge data directory.
///
/// Returns `$XDG_DATA_HOME/forge` if set, otherwise `~/.local/share/forge`.
/// This is where the credential vault is stored.
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".local/share",
    )
}

/// Default location of the encrypted credential blob.
pub fn vault_path() -> PathBuf {
    data_dir().join(VAULT_FILE)
}

/// `<xdg>/forge`, else `<home>/<fallback>/forge`, else a relative path.
fn resolve(xdg: Option<PathBuf>, home: Option<PathBuf>, fallback: &str) -> PathBuf {
    // XDG base directory rules say relative values are ignored.
    match (xdg.filter(|p| p.is_absolute()), home) {
        (Some(xdg), _) => xdg.join(APP_DIR),
        (None, Some(home)) => home.join(fallback).join(APP_DIR),
        (None, None) => Path::new(fallback).join(APP_DIR),
    }
}
