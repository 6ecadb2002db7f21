//! Gemini generateContent codec.
//!
//! Gemini has no system role in this API version, so the system instruction
//! is prepended to the user text.

use serde::{Deserialize, Serialize};

use super::{ApiErrorBody, ChatCall, HttpRequest, ProviderInfo, malformed, safety_block};
use crate::ProviderId;
use crate::error::{ProviderError, ProviderErrorKind};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: [Content; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

pub(super) fn chat_request(info: &ProviderInfo, call: &ChatCall<'_>) -> HttpRequest {
    let body = GenerateRequest {
        contents: [Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(format!("{}\n\n{}", call.system, call.user)),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: call.temperature,
            max_output_tokens: call.max_tokens,
        },
    };
    let url = format!("{}/{}:generateContent", info.endpoint(), call.model);
    HttpRequest::post(url, serde_json::json!(body))
}

pub(super) fn validate_request(info: &ProviderInfo) -> HttpRequest {
    HttpRequest::get(info.validate_endpoint())
}

pub(super) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| malformed(ProviderId::Gemini, e))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "UNKNOWN_REASON".to_string());
        return Err(safety_block(
            ProviderId::Gemini,
            format!("Gemini blocked the request: {reason}. Please try a slightly different prompt."),
        ));
    };

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.trim().is_empty());

    text.ok_or_else(|| {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "SAFETY/FILTERING".to_string());
        safety_block(
            ProviderId::Gemini,
            format!(
                "Gemini response generation failed: {reason}. The content may have been flagged by safety filters."
            ),
        )
    })
}

pub(super) fn error_kind(body: Option<&ApiErrorBody>) -> Option<ProviderErrorKind> {
    let body = body?;
    match body.status.as_deref() {
        Some("RESOURCE_EXHAUSTED") => return Some(ProviderErrorKind::Quota),
        Some("UNAUTHENTICATED" | "PERMISSION_DENIED") => return Some(ProviderErrorKind::Auth),
        _ => {}
    }
    body.message
        .as_deref()
        .filter(|m| m.contains("API key not valid"))
        .map(|_| ProviderErrorKind::Auth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ApiKey;
    use crate::providers::{HttpMethod, HttpResponse, ProviderRegistry};
    use serde_json::json;

    fn info() -> ProviderInfo {
        ProviderRegistry::default()
            .get(ProviderId::Gemini)
            .cloned()
            .unwrap()
    }

    #[test]
    fn request_merges_system_into_user_text() {
        let call = ChatCall {
            model: "gemini-2.5-pro",
            system: "be cinematic",
            user: "a harbor",
            temperature: 0.25,
            max_tokens: 500,
        };
        let request = info().chat_request(&ApiKey::new("AIza"), &call);

        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert_eq!(request.query_param("key"), Some("AIza"));
        assert_eq!(
            request.body.unwrap(),
            json!({
                "contents": [{"role": "user", "parts": [{"text": "be cinematic\n\na harbor"}]}],
                "generationConfig": {"temperature": 0.25, "maxOutputTokens": 500}
            })
        );
    }

    #[test]
    fn validation_lists_models_with_key_param() {
        let request = info().validate_request(&ApiKey::new("AIza"));
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models"
        );
        assert_eq!(request.query_param("key"), Some("AIza"));
    }

    #[test]
    fn extracts_first_part() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "Golden hour over dunes"}]}, "finishReason": "STOP"}]
        });
        assert_eq!(extract_text(&body.to_string()).unwrap(), "Golden hour over dunes");
    }

    #[test]
    fn no_candidates_reports_block_reason() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = extract_text(&body.to_string()).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::SafetyBlock);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn empty_parts_reports_finish_reason() {
        let body = json!({"candidates": [{"content": {"parts": []}, "finishReason": "RECITATION"}]});
        let err = extract_text(&body.to_string()).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::SafetyBlock);
        assert!(err.message.contains("RECITATION"));
    }

    #[test]
    fn resource_exhausted_is_quota() {
        let body = json!({"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}});
        let err = info().classify_error(&HttpResponse::new(429, body.to_string()));
        assert_eq!(err.kind, ProviderErrorKind::Quota);
        assert_eq!(err.message, "Quota exceeded");
    }

    #[test]
    fn invalid_key_on_400_is_auth() {
        let body = json!({"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}});
        let err = info().classify_error(&HttpResponse::new(400, body.to_string()));
        assert_eq!(err.kind, ProviderErrorKind::Auth);
    }
}
