//! Device fingerprinting for passwordless vault mode.
//!
//! The fingerprint is a SHA-256 digest of a fixed, ordered list of
//! environment attributes. It is a convenience key, not a secret: anyone who
//! can read the same environment can recompute it, and the fallback value used
//! when an attribute cannot be read is public. Passwordless mode therefore
//! provides obfuscation, not confidentiality.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Local, NaiveDate, Offset, TimeZone};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

/// Origin used to scope the fallback fingerprint.
pub const DEFAULT_ORIGIN: &str = "forge://localhost";

/// Prefix of the fallback fingerprint.
const FALLBACK_PREFIX: &str = "default_device_salt_";

/// An environment attribute could not be read.
#[derive(Debug, Error)]
#[error("environment probe failed: {0}")]
pub struct ProbeError(pub String);

/// Supplies the attributes that make up the device fingerprint.
///
/// Injected into the vault so tests can use deterministic fixtures.
pub trait EnvironmentProbe: Send + Sync {
    /// Client identification string.
    fn user_agent(&self) -> Result<String, ProbeError>;
    /// Preferred locale (e.g., "en_US.UTF-8").
    fn locale(&self) -> Result<String, ProbeError>;
    /// Display dimensions as `WxH`, or a fixed marker when there is none.
    fn display_dimensions(&self) -> Result<String, ProbeError>;
    /// Minutes west of UTC.
    fn timezone_offset(&self) -> Result<i32, ProbeError>;
    /// Number of logical cores, if known.
    fn logical_cores(&self) -> Result<Option<usize>, ProbeError>;
    /// Origin that scopes the fallback fingerprint.
    fn origin(&self) -> String {
        DEFAULT_ORIGIN.to_string()
    }
}

/// Read the fingerprint components in their fixed order.
pub fn fingerprint_components(probe: &dyn EnvironmentProbe) -> Result<Vec<String>, ProbeError> {
    Ok(vec![
        probe.user_agent()?,
        probe.locale()?,
        probe.display_dimensions()?,
        probe.timezone_offset()?.to_string(),
        probe
            .logical_cores()?
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    ])
}

/// Compute the device fingerprint, falling back to an origin-scoped constant
/// if any attribute read fails.
pub fn device_fingerprint(probe: &dyn EnvironmentProbe) -> String {
    match fingerprint_components(probe) {
        Ok(components) => {
            let digest = Sha256::digest(components.join("|").as_bytes());
            STANDARD.encode(digest)
        }
        Err(e) => {
            warn!(error = %e, "falling back to origin-scoped device fingerprint");
            fallback_fingerprint(probe)
        }
    }
}

fn fallback_fingerprint(probe: &dyn EnvironmentProbe) -> String {
    format!("{FALLBACK_PREFIX}{}", probe.origin())
}

/// Native probe for a command-line host.
///
/// A terminal host has no display, so dimensions are reported as `headless`.
/// The timezone offset is taken at a fixed reference instant so daylight
/// saving changes do not alter the fingerprint.
#[derive(Debug, Clone, Default)]
pub struct SystemProbe {
    origin: Option<String>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the fallback fingerprint to a custom origin.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            origin: Some(origin.into()),
        }
    }
}

impl EnvironmentProbe for SystemProbe {
    fn user_agent(&self) -> Result<String, ProbeError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ProbeError("home directory unavailable".to_string()))?;
        Ok(format!(
            "forge ({}; {}; {})",
            std::env::consts::OS,
            std::env::consts::ARCH,
            home.display()
        ))
    }

    fn locale(&self) -> Result<String, ProbeError> {
        let locale = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty())
            .unwrap_or_else(|| "C".to_string());
        Ok(locale)
    }

    fn display_dimensions(&self) -> Result<String, ProbeError> {
        Ok("headless".to_string())
    }

    fn timezone_offset(&self) -> Result<i32, ProbeError> {
        let reference = NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| ProbeError("invalid reference instant".to_string()))?;
        let offset = Local.offset_from_utc_datetime(&reference).fix();
        Ok(-(offset.local_minus_utc() / 60))
    }

    fn logical_cores(&self) -> Result<Option<usize>, ProbeError> {
        Ok(std::thread::available_parallelism().ok().map(|n| n.get()))
    }

    fn origin(&self) -> String {
        self.origin
            .clone()
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string())
    }
}
