//! Core types shared by the gateway, providers and registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Identifier of a supported LLM provider.
///
/// The set is closed: every request builder and response extractor matches
/// on it exhaustively.
///
/// # Examples
///
/// ```
/// use forge_models::ProviderId;
///
/// let id: ProviderId = "anthropic".parse().unwrap();
/// assert_eq!(id, ProviderId::Anthropic);
/// assert_eq!(id.to_string(), "anthropic");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Gemini,
}

impl ProviderId {
    /// All providers, in registry order.
    pub const ALL: [ProviderId; 3] = [ProviderId::OpenAi, ProviderId::Anthropic, ProviderId::Gemini];

    /// Wire identifier (e.g., "openai").
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Anthropic => "anthropic",
            ProviderId::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

/// An entry in a provider's model catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogModel {
    /// Model id sent on the wire.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Output token ceiling advertised for the model.
    pub max_tokens: u32,
}

impl CatalogModel {
    pub const fn new(id: &'static str, name: &'static str, max_tokens: u32) -> Self {
        Self {
            id,
            name,
            max_tokens,
        }
    }
}

/// A single scene to enhance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Free-text scene description.
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting: Option<String>,
    /// Things the scene should avoid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl GenerationRequest {
    /// Create a request with only a description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Set the camera direction.
    pub fn camera(mut self, camera: impl Into<String>) -> Self {
        self.camera = Some(camera.into());
        self
    }

    /// Set the lighting style.
    pub fn lighting(mut self, lighting: impl Into<String>) -> Self {
        self.lighting = Some(lighting.into());
        self
    }

    /// Set the negative prompt.
    pub fn negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }
}

/// One element of a batch generation result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedScene {
    pub description: String,
    #[serde(default)]
    pub camera: String,
    #[serde(default)]
    pub lighting: String,
    #[serde(default)]
    pub negative_prompt: String,
}

impl From<EnhancedScene> for GenerationRequest {
    fn from(scene: EnhancedScene) -> Self {
        fn non_empty(s: String) -> Option<String> {
            if s.trim().is_empty() { None } else { Some(s) }
        }

        Self {
            description: scene.description,
            camera: non_empty(scene.camera),
            lighting: non_empty(scene.lighting),
            negative_prompt: non_empty(scene.negative_prompt),
        }
    }
}
