//! Final JSON payload layouts per target model.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::ModelProfileRegistry;
use crate::GenerationRequest;

/// Project data wrapped by a payload layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadData {
    pub scenes: Vec<GenerationRequest>,
    #[serde(default)]
    pub global_parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Output structure expected by a target model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadLayout {
    /// `{target_model, generated_at, ...data}`.
    Envelope,
    /// Prompt list with the envelope moved under `metadata`.
    Sora,
}

impl PayloadLayout {
    pub fn for_model(id: &str) -> Self {
        match id {
            "sora" => PayloadLayout::Sora,
            _ => PayloadLayout::Envelope,
        }
    }
}

/// Format a payload for `id`, stamped with the current time.
pub fn format_payload(id: &str, data: &PayloadData) -> Value {
    format_payload_at(id, data, Utc::now())
}

/// Format a payload for `id`, stamped with `generated_at`.
pub fn format_payload_at(id: &str, data: &PayloadData, generated_at: DateTime<Utc>) -> Value {
    let target = ModelProfileRegistry::new()
        .get_profile(id)
        .map_or(id, |p| p.name);

    let mut envelope = Map::new();
    envelope.insert("target_model".into(), Value::from(target));
    envelope.insert(
        "generated_at".into(),
        Value::from(generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    if let Ok(Value::Object(core)) = serde_json::to_value(data) {
        envelope.extend(core);
    }

    match PayloadLayout::for_model(id) {
        PayloadLayout::Envelope => Value::Object(envelope),
        PayloadLayout::Sora => json!({
            "model": "sora-1.0",
            "prompts": data.scenes.iter().map(|s| s.description.as_str()).collect::<Vec<_>>(),
            "advanced_params": data.global_parameters,
            "metadata": envelope,
        }),
    }
}
