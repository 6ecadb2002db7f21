//! Model profile registry for target video models.
//!
//! Every supported video model has a static [`ModelProfile`] describing the
//! resolutions, aspect ratios and frame rates it accepts and the prompt
//! features it understands. The registry validates generation parameters
//! against a profile and suggests corrections.
//!
//! Unknown model ids are deliberately fail-open: [`ModelProfileRegistry::validate`]
//! reports them valid and [`ModelProfileRegistry::supports`] returns `true`.
//! Callers that need strictness must check [`ModelProfileRegistry::get_profile`].

mod content;
mod payload;

pub use content::{ContentReport, PROHIBITED_TERMS, validate_content};
pub use payload::{PayloadData, PayloadLayout, format_payload, format_payload_at};

use serde::{Deserialize, Serialize};

/// Capabilities and constraints of one target video model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProfile {
    pub id: &'static str,
    pub name: &'static str,
    pub max_resolution: &'static str,
    /// First element is the canonical default.
    pub allowed_resolutions: &'static [&'static str],
    pub allowed_aspect_ratios: &'static [&'static str],
    pub allowed_frame_rates: &'static [&'static str],
    pub supports_negative_prompt: bool,
    pub supports_camera_controls: bool,
    /// Prompt length ceiling, in words.
    pub max_prompt_length: u32,
    pub description: &'static str,
}

impl ModelProfile {
    /// Whether the model understands a prompt feature.
    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::NegativePrompt => self.supports_negative_prompt,
            Feature::CameraControls => self.supports_camera_controls,
        }
    }
}

/// Built-in profiles, in display order.
pub static BUILTIN_PROFILES: &[ModelProfile] = &[
    ModelProfile {
        id: "veo",
        name: "Google Veo",
        max_resolution: "1080p",
        allowed_resolutions: &["1080p"],
        allowed_aspect_ratios: &["16:9", "9:16", "1:1", "4:3", "21:9"],
        allowed_frame_rates: &["24", "30"],
        supports_negative_prompt: true,
        supports_camera_controls: true,
        max_prompt_length: 500,
        description: "Google's high-fidelity video generation model aimed at cinematic realism.",
    },
    ModelProfile {
        id: "sora",
        name: "OpenAI Sora",
        max_resolution: "1080p",
        allowed_resolutions: &["1080p"],
        allowed_aspect_ratios: &["16:9", "9:16", "1:1", "4:3", "21:9"],
        allowed_frame_rates: &["24", "30", "60"],
        supports_negative_prompt: false,
        supports_camera_controls: true,
        max_prompt_length: 300,
        description: "OpenAI's physics-simulating video model known for complex motion.",
    },
    ModelProfile {
        id: "runway",
        name: "Runway Gen-3 Alpha",
        max_resolution: "4K",
        allowed_resolutions: &["720p", "1080p", "4K"],
        allowed_aspect_ratios: &["16:9", "9:16", "21:9"],
        allowed_frame_rates: &["24", "30", "60"],
        supports_negative_prompt: false,
        supports_camera_controls: true,
        max_prompt_length: 500,
        description: "Runway's latest model with advanced temporal consistency and realistic motion.",
    },
    ModelProfile {
        id: "luma",
        name: "Luma Dream Machine",
        max_resolution: "1080p",
        allowed_resolutions: &["1080p"],
        allowed_aspect_ratios: &["16:9", "9:16", "1:1", "4:3"],
        allowed_frame_rates: &["24", "30"],
        supports_negative_prompt: true,
        supports_camera_controls: true,
        max_prompt_length: 400,
        description: "Fast, high-quality video model optimized for creative workflows.",
    },
    ModelProfile {
        id: "kling",
        name: "Kling",
        max_resolution: "1080p",
        allowed_resolutions: &["1080p"],
        allowed_aspect_ratios: &["16:9", "9:16", "1:1"],
        allowed_frame_rates: &["30"],
        supports_negative_prompt: true,
        supports_camera_controls: true,
        max_prompt_length: 600,
        description: "Emerging high-motion model with strong character consistency.",
    },
];

/// Prompt features a target model may or may not understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    NegativePrompt,
    CameraControls,
}

/// Generation parameters checked against a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<String>,
}

impl GenerationParams {
    /// Project-wide defaults: 1080p, 16:9, 24 fps.
    pub fn project_defaults() -> Self {
        Self {
            resolution: Some("1080p".to_string()),
            aspect_ratio: Some("16:9".to_string()),
            frame_rate: Some("24".to_string()),
        }
    }

    /// Replace every violating parameter with its suggested value.
    pub fn apply(&self, violations: &[ValidationViolation]) -> Self {
        let mut corrected = self.clone();
        for v in violations {
            let slot = match v.param {
                Param::Resolution => &mut corrected.resolution,
                Param::AspectRatio => &mut corrected.aspect_ratio,
                Param::FrameRate => &mut corrected.frame_rate,
            };
            *slot = Some(v.suggested_value.clone());
        }
        corrected
    }
}

/// A validated parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Resolution,
    AspectRatio,
    FrameRate,
}

impl Param {
    pub fn as_str(&self) -> &'static str {
        match self {
            Param::Resolution => "resolution",
            Param::AspectRatio => "aspect_ratio",
            Param::FrameRate => "frame_rate",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Param::Resolution => "Resolution",
            Param::AspectRatio => "Aspect Ratio",
            Param::FrameRate => "Frame Rate",
        }
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter a profile does not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationViolation {
    pub param: Param,
    pub message: String,
    pub suggested_value: String,
}

/// Outcome of [`ModelProfileRegistry::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<ValidationViolation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

/// Read-only lookup over the profile table.
#[derive(Debug, Clone, Copy)]
pub struct ModelProfileRegistry {
    profiles: &'static [ModelProfile],
}

impl Default for ModelProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelProfileRegistry {
    /// Registry over the built-in profiles.
    pub const fn new() -> Self {
        Self {
            profiles: BUILTIN_PROFILES,
        }
    }

    pub fn get_profile(&self, id: &str) -> Option<&'static ModelProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn profiles(&self) -> &'static [ModelProfile] {
        self.profiles
    }

    /// Check parameters against a profile, in the order resolution,
    /// aspect ratio, frame rate. Unknown ids validate clean.
    pub fn validate(&self, id: &str, params: &GenerationParams) -> ValidationReport {
        let Some(profile) = self.get_profile(id) else {
            return ValidationReport::from_violations(Vec::new());
        };

        let checks = [
            (Param::Resolution, &params.resolution, profile.allowed_resolutions),
            (Param::AspectRatio, &params.aspect_ratio, profile.allowed_aspect_ratios),
            (Param::FrameRate, &params.frame_rate, profile.allowed_frame_rates),
        ];

        let violations = checks
            .into_iter()
            .filter_map(|(param, value, allowed)| {
                let value = value.as_deref().filter(|v| !v.is_empty())?;
                if allowed.contains(&value) {
                    return None;
                }
                Some(ValidationViolation {
                    param,
                    message: format!(
                        "{} '{}' is not supported by {}. Supported: {}",
                        param.label(),
                        value,
                        profile.name,
                        allowed.join(", ")
                    ),
                    suggested_value: allowed.first().copied().unwrap_or_default().to_string(),
                })
            })
            .collect();

        ValidationReport::from_violations(violations)
    }

    /// Whether a model supports a feature. Unknown ids report `true`.
    pub fn supports(&self, id: &str, feature: Feature) -> bool {
        self.get_profile(id).is_none_or(|p| p.supports(feature))
    }
}
