//! Anthropic messages codec.

use serde::{Deserialize, Serialize};

use super::{ApiErrorBody, ChatCall, HttpRequest, ProviderInfo, malformed, safety_block};
use crate::ProviderId;
use crate::error::{ProviderError, ProviderErrorKind};

/// Model used for the key validation probe.
const VALIDATION_MODEL: &str = "claude-3-5-haiku-20241022";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub(super) fn chat_request(info: &ProviderInfo, call: &ChatCall<'_>) -> HttpRequest {
    let body = MessagesRequest {
        model: call.model,
        max_tokens: call.max_tokens,
        system: Some(call.system),
        messages: [Message {
            role: "user",
            content: call.user,
        }],
    };
    HttpRequest::post(info.endpoint(), serde_json::json!(body))
}

pub(super) fn validate_request(info: &ProviderInfo) -> HttpRequest {
    let body = MessagesRequest {
        model: VALIDATION_MODEL,
        max_tokens: 10,
        system: None,
        messages: [Message {
            role: "user",
            content: "Hi",
        }],
    };
    HttpRequest::post(info.validate_endpoint(), serde_json::json!(body))
}

pub(super) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| malformed(ProviderId::Anthropic, e))?;

    let text = response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .filter(|t| !t.trim().is_empty());

    text.ok_or_else(|| {
        let reason = response.stop_reason.unwrap_or_else(|| "unknown".to_string());
        safety_block(
            ProviderId::Anthropic,
            format!("Anthropic returned no text content: {reason}"),
        )
    })
}

pub(super) fn error_kind(body: Option<&ApiErrorBody>) -> Option<ProviderErrorKind> {
    match body?.kind.as_deref()? {
        "authentication_error" | "permission_error" => Some(ProviderErrorKind::Auth),
        "rate_limit_error" => Some(ProviderErrorKind::Quota),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ApiKey;
    use crate::providers::{HttpResponse, ProviderRegistry};
    use serde_json::json;

    fn info() -> ProviderInfo {
        ProviderRegistry::default()
            .get(ProviderId::Anthropic)
            .cloned()
            .unwrap()
    }

    #[test]
    fn request_puts_system_at_top_level() {
        let call = ChatCall {
            model: "claude-sonnet-4.5",
            system: "be cinematic",
            user: "a harbor",
            temperature: 0.7,
            max_tokens: 500,
        };
        let request = info().chat_request(&ApiKey::new("sk-ant"), &call);
        let body = request.body.unwrap();

        assert_eq!(request.url, "https://api.anthropic.com/v1/messages");
        assert_eq!(body["model"], "claude-sonnet-4.5");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["system"], "be cinematic");
        assert_eq!(body["messages"], json!([{"role": "user", "content": "a harbor"}]));
    }

    #[test]
    fn validation_is_minimal_message() {
        let request = info().validate_request(&ApiKey::new("sk-ant"));
        assert_eq!(
            request.body.clone().unwrap(),
            json!({
                "model": "claude-3-5-haiku-20241022",
                "max_tokens": 10,
                "messages": [{"role": "user", "content": "Hi"}]
            })
        );
        assert_eq!(request.header("x-api-key"), Some("sk-ant"));
        assert_eq!(request.header("anthropic-version"), Some("2023-06-01"));
    }

    #[test]
    fn extracts_first_text_block() {
        let body = json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Rain-slicked neon streets"}
            ],
            "stop_reason": "end_turn"
        });
        assert_eq!(extract_text(&body.to_string()).unwrap(), "Rain-slicked neon streets");
    }

    #[test]
    fn empty_content_reports_stop_reason() {
        let body = json!({"content": [], "stop_reason": "refusal"});
        let err = extract_text(&body.to_string()).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::SafetyBlock);
        assert!(err.message.contains("refusal"));
    }

    #[test]
    fn error_types_are_classified() {
        let body = |t: &str| json!({"type": "error", "error": {"type": t, "message": "nope"}}).to_string();

        let err = info().classify_error(&HttpResponse::new(401, body("authentication_error")));
        assert_eq!(err.kind, ProviderErrorKind::Auth);
        assert_eq!(err.message, "nope");

        let err = info().classify_error(&HttpResponse::new(429, body("rate_limit_error")));
        assert_eq!(err.kind, ProviderErrorKind::Quota);

        let err = info().classify_error(&HttpResponse::new(529, body("overloaded_error")));
        assert_eq!(err.kind, ProviderErrorKind::Other);
    }

    #[test]
    fn unreadable_error_body_uses_generic_message() {
        let err = info().classify_error(&HttpResponse::new(500, ""));
        assert_eq!(err.message, "Anthropic API error");
    }
}
