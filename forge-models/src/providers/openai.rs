//! OpenAI chat completions codec.

use serde::{Deserialize, Serialize};

use super::{ApiErrorBody, ChatCall, HttpRequest, ProviderInfo, malformed, safety_block};
use crate::ProviderId;
use crate::error::{ProviderError, ProviderErrorKind};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

pub(super) fn chat_request(info: &ProviderInfo, call: &ChatCall<'_>) -> HttpRequest {
    let body = ChatRequest {
        model: call.model,
        messages: [
            Message {
                role: "system",
                content: call.system,
            },
            Message {
                role: "user",
                content: call.user,
            },
        ],
        temperature: call.temperature,
        max_tokens: call.max_tokens,
    };
    HttpRequest::post(info.endpoint(), serde_json::json!(body))
}

pub(super) fn validate_request(info: &ProviderInfo) -> HttpRequest {
    HttpRequest::get(info.validate_endpoint())
}

pub(super) fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| malformed(ProviderId::OpenAi, e))?;

    let Some(choice) = response.choices.into_iter().next() else {
        return Err(safety_block(
            ProviderId::OpenAi,
            "OpenAI returned no choices".to_string(),
        ));
    };

    let (content, refusal) = match choice.message {
        Some(m) => (m.content, m.refusal),
        None => (None, None),
    };
    match content.filter(|c| !c.trim().is_empty()) {
        Some(text) => Ok(text),
        None => {
            let reason = refusal
                .or(choice.finish_reason)
                .unwrap_or_else(|| "unknown".to_string());
            Err(safety_block(
                ProviderId::OpenAi,
                format!("OpenAI returned no content: {reason}"),
            ))
        }
    }
}

pub(super) fn error_kind(body: Option<&ApiErrorBody>) -> Option<ProviderErrorKind> {
    let body = body?;
    let code = body.code_str().or(body.kind.as_deref())?;
    match code {
        "insufficient_quota" | "rate_limit_exceeded" => Some(ProviderErrorKind::Quota),
        "invalid_api_key" => Some(ProviderErrorKind::Auth),
        _ => None,
    }
}
