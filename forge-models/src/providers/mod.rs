//! Provider registry and wire codecs.
//!
//! Each supported provider speaks its own protocol: different auth headers,
//! request envelopes, response shapes and error bodies. This module turns a
//! provider-neutral [`ChatCall`] into an [`HttpRequest`] and a raw
//! [`HttpResponse`] back into text, dispatching on the closed [`ProviderId`]
//! enum.
//!
//! # Example
//!
//! ```
//! use forge_models::ProviderId;
//! use forge_models::providers::{ChatCall, ProviderRegistry};
//! use forge_models::auth::ApiKey;
//!
//! let registry = ProviderRegistry::default();
//! let openai = registry.get(ProviderId::OpenAi).unwrap();
//! let call = ChatCall {
//!     model: "o4-mini",
//!     system: "You are terse.",
//!     user: "Describe a harbor.",
//!     temperature: 0.7,
//!     max_tokens: 500,
//! };
//! let request = openai.chat_request(&ApiKey::new("sk-..."), &call);
//! assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
//! ```

mod anthropic;
mod gemini;
mod http;
mod openai;

pub use http::{
    DEFAULT_TIMEOUT, HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport,
    TransportError,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::ApiKey;
use crate::error::{ProviderError, ProviderErrorKind};
use crate::{CatalogModel, ProviderId};

/// Anthropic API version sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

// ────────────────────────────────────────────────────────────────────────────
// Catalogs
// ────────────────────────────────────────────────────────────────────────────

const OPENAI_MODELS: &[CatalogModel] = &[
    CatalogModel::new("gpt-5.2-pro", "GPT-5.2 Pro (Recommended)", 4096),
    CatalogModel::new("o4-mini", "o4-mini", 4096),
    CatalogModel::new("gpt-4.1-mini", "GPT-4.1 mini", 4096),
    CatalogModel::new("gpt-4.5", "GPT-4.5", 4096),
];

const ANTHROPIC_MODELS: &[CatalogModel] = &[
    CatalogModel::new("claude-opus-4.5", "Claude Opus 4.5 (Recommended)", 4096),
    CatalogModel::new("claude-sonnet-4.5", "Claude Sonnet 4.5", 4096),
    CatalogModel::new("claude-opus-4.1", "Claude Opus 4.1", 4096),
    CatalogModel::new("claude-haiku-4.5", "Claude Haiku 4.5", 4096),
];

const GEMINI_MODELS: &[CatalogModel] = &[
    CatalogModel::new("gemini-3-pro", "Gemini 3 Pro (Recommended)", 8192),
    CatalogModel::new("gemini-2.5-pro", "Gemini 2.5 Pro", 8192),
    CatalogModel::new("gemini-3-flash", "Gemini 3 Flash", 8192),
    CatalogModel::new("gemini-2.5-flash-lite", "Gemini 2.5 Flash-Lite", 8192),
];

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// How a provider expects the API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// `x-api-key: <key>` plus `anthropic-version`.
    ApiKeyHeader,
    /// `?key=<key>`.
    QueryParam,
}

/// Static description of one provider.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub display_name: &'static str,
    /// First entry is the default model.
    pub models: &'static [CatalogModel],
    pub auth: AuthStyle,
    base_url: String,
    generate_path: &'static str,
    validate_path: &'static str,
}

impl ProviderInfo {
    fn builtin(id: ProviderId) -> Self {
        match id {
            ProviderId::OpenAi => Self {
                id,
                display_name: "OpenAI",
                models: OPENAI_MODELS,
                auth: AuthStyle::Bearer,
                base_url: "https://api.openai.com".to_string(),
                generate_path: "/v1/chat/completions",
                validate_path: "/v1/models",
            },
            ProviderId::Anthropic => Self {
                id,
                display_name: "Anthropic",
                models: ANTHROPIC_MODELS,
                auth: AuthStyle::ApiKeyHeader,
                base_url: "https://api.anthropic.com".to_string(),
                generate_path: "/v1/messages",
                validate_path: "/v1/messages",
            },
            ProviderId::Gemini => Self {
                id,
                display_name: "Gemini",
                models: GEMINI_MODELS,
                auth: AuthStyle::QueryParam,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                generate_path: "/v1beta/models",
                validate_path: "/v1beta/models",
            },
        }
    }

    /// Generation endpoint. Gemini appends `/{model}:generateContent`.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.generate_path)
    }

    /// Endpoint used for key validation.
    pub fn validate_endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.validate_path)
    }

    /// First catalog entry.
    pub fn default_model(&self) -> Option<&'static CatalogModel> {
        self.models.first()
    }

    pub fn catalog_model(&self, id: &str) -> Option<&'static CatalogModel> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Build the generation request for this provider.
    pub fn chat_request(&self, key: &ApiKey, call: &ChatCall<'_>) -> HttpRequest {
        let mut request = match self.id {
            ProviderId::OpenAi => openai::chat_request(self, call),
            ProviderId::Anthropic => anthropic::chat_request(self, call),
            ProviderId::Gemini => gemini::chat_request(self, call),
        };
        self.apply_auth(key, &mut request);
        request
    }

    /// Build the minimal live request used to validate a key.
    pub fn validate_request(&self, key: &ApiKey) -> HttpRequest {
        let mut request = match self.id {
            ProviderId::OpenAi => openai::validate_request(self),
            ProviderId::Anthropic => anthropic::validate_request(self),
            ProviderId::Gemini => gemini::validate_request(self),
        };
        self.apply_auth(key, &mut request);
        request
    }

    /// Extract the generated text from a response, classifying failures.
    pub fn extract_text(&self, response: &HttpResponse) -> Result<String, ProviderError> {
        if !response.is_success() {
            return Err(self.classify_error(response));
        }
        match self.id {
            ProviderId::OpenAi => openai::extract_text(&response.body),
            ProviderId::Anthropic => anthropic::extract_text(&response.body),
            ProviderId::Gemini => gemini::extract_text(&response.body),
        }
    }

    /// Turn a non-2xx response into a [`ProviderError`].
    pub fn classify_error(&self, response: &HttpResponse) -> ProviderError {
        let body = ApiErrorBody::parse(&response.body);
        let (specific, fallback) = match self.id {
            ProviderId::OpenAi => (openai::error_kind(body.as_ref()), "OpenAI API error"),
            ProviderId::Anthropic => (anthropic::error_kind(body.as_ref()), "Anthropic API error"),
            ProviderId::Gemini => (gemini::error_kind(body.as_ref()), "Gemini API error"),
        };
        let kind = specific.unwrap_or_else(|| status_kind(response.status));
        let message = body
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        ProviderError::new(self.id, kind, message)
    }

    fn apply_auth(&self, key: &ApiKey, request: &mut HttpRequest) {
        let secret = key.expose_secret().to_string();
        match self.auth {
            AuthStyle::Bearer => request
                .headers
                .push(("authorization", format!("Bearer {secret}"))),
            AuthStyle::ApiKeyHeader => {
                request.headers.push(("x-api-key", secret));
                request
                    .headers
                    .push(("anthropic-version", ANTHROPIC_VERSION.to_string()));
            }
            AuthStyle::QueryParam => request.query.push(("key", secret)),
        }
    }
}

/// Immutable set of providers the gateway can talk to.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<ProviderInfo>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            providers: ProviderId::ALL.into_iter().map(ProviderInfo::builtin).collect(),
        }
    }
}

impl ProviderRegistry {
    pub fn get(&self, id: ProviderId) -> Option<&ProviderInfo> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn providers(&self) -> &[ProviderInfo] {
        &self.providers
    }

    /// Point a provider at a different base URL (proxies, local fakes).
    pub fn with_base_url(mut self, id: ProviderId, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if let Some(info) = self.providers.iter_mut().find(|p| p.id == id) {
            info.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    /// Registry without `id`.
    pub fn without(mut self, id: ProviderId) -> Self {
        self.providers.retain(|p| p.id != id);
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared codec pieces
// ────────────────────────────────────────────────────────────────────────────

/// Provider-neutral generation call.
#[derive(Debug, Clone, Copy)]
pub struct ChatCall<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Outcome of a live key check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialCheck {
    pub valid: bool,
    pub message: String,
}

impl CredentialCheck {
    pub fn from_response(response: &HttpResponse) -> Self {
        if response.is_success() {
            return Self {
                valid: true,
                message: "API key is valid!".to_string(),
            };
        }
        let message = ApiErrorBody::parse(&response.body)
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Invalid API key".to_string());
        Self {
            valid: false,
            message,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// The `error` object all three providers put in failure bodies.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    status: Option<String>,
}

impl ApiErrorBody {
    fn parse(body: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            error: Option<ApiErrorBody>,
        }
        serde_json::from_str::<Envelope>(body).ok()?.error
    }

    fn code_str(&self) -> Option<&str> {
        self.code.as_ref().and_then(Value::as_str)
    }
}

fn status_kind(status: u16) -> ProviderErrorKind {
    match status {
        401 | 403 => ProviderErrorKind::Auth,
        429 => ProviderErrorKind::Quota,
        _ => ProviderErrorKind::Other,
    }
}

fn malformed(provider: ProviderId, err: serde_json::Error) -> ProviderError {
    ProviderError::new(
        provider,
        ProviderErrorKind::MalformedResponse,
        format!("unexpected response body: {err}"),
    )
}

fn safety_block(provider: ProviderId, message: String) -> ProviderError {
    ProviderError::new(provider, ProviderErrorKind::SafetyBlock, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call() -> ChatCall<'static> {
        ChatCall {
            model: "m",
            system: "sys",
            user: "usr",
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    #[test]
    fn default_registry_has_all_providers() {
        let registry = ProviderRegistry::default();
        let ids: Vec<_> = registry.providers().iter().map(|p| p.id).collect();
        assert_eq!(ids, ProviderId::ALL);
    }

    #[test]
    fn default_models_are_first_catalog_entries() {
        let registry = ProviderRegistry::default();
        let first = |id| registry.get(id).unwrap().default_model().unwrap().id;
        assert_eq!(first(ProviderId::OpenAi), "gpt-5.2-pro");
        assert_eq!(first(ProviderId::Anthropic), "claude-opus-4.5");
        assert_eq!(first(ProviderId::Gemini), "gemini-3-pro");
    }

    #[test]
    fn gemini_catalog_advertises_8192_tokens() {
        let registry = ProviderRegistry::default();
        let gemini = registry.get(ProviderId::Gemini).unwrap();
        assert!(gemini.models.iter().all(|m| m.max_tokens == 8192));
        assert_eq!(
            gemini.catalog_model("gemini-2.5-flash-lite").unwrap().name,
            "Gemini 2.5 Flash-Lite"
        );
    }

    #[test]
    fn auth_styles_place_key_correctly() {
        let registry = ProviderRegistry::default();
        let key = ApiKey::new("secret");

        let openai = registry.get(ProviderId::OpenAi).unwrap().chat_request(&key, &call());
        assert_eq!(openai.header("authorization"), Some("Bearer secret"));

        let anthropic = registry.get(ProviderId::Anthropic).unwrap().chat_request(&key, &call());
        assert_eq!(anthropic.header("x-api-key"), Some("secret"));
        assert_eq!(anthropic.header("anthropic-version"), Some("2023-06-01"));
        assert_eq!(anthropic.header("authorization"), None);

        let gemini = registry.get(ProviderId::Gemini).unwrap().chat_request(&key, &call());
        assert_eq!(gemini.query_param("key"), Some("secret"));
        assert!(gemini.headers.is_empty());
    }

    #[test]
    fn base_url_override_rewrites_endpoints() {
        let registry = ProviderRegistry::default().with_base_url(ProviderId::OpenAi, "http://127.0.0.1:9000/");
        let openai = registry.get(ProviderId::OpenAi).unwrap();
        assert_eq!(openai.endpoint(), "http://127.0.0.1:9000/v1/chat/completions");
        assert_eq!(openai.validate_endpoint(), "http://127.0.0.1:9000/v1/models");
    }

    #[test]
    fn without_removes_provider() {
        let registry = ProviderRegistry::default().without(ProviderId::Gemini);
        assert!(registry.get(ProviderId::Gemini).is_none());
        assert_eq!(registry.providers().len(), 2);
    }

    #[test]
    fn status_classification_fallback() {
        let registry = ProviderRegistry::default();
        let openai = registry.get(ProviderId::OpenAi).unwrap();

        let err = openai.classify_error(&HttpResponse::new(401, "not json"));
        assert_eq!(err.kind, ProviderErrorKind::Auth);
        assert_eq!(err.message, "OpenAI API error");

        let err = openai.classify_error(&HttpResponse::new(429, "{}"));
        assert_eq!(err.kind, ProviderErrorKind::Quota);

        let err = openai.classify_error(&HttpResponse::new(500, r#"{"error":{"message":"boom"}}"#));
        assert_eq!(err.kind, ProviderErrorKind::Other);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn credential_check_from_responses() {
        let ok = CredentialCheck::from_response(&HttpResponse::new(200, "{}"));
        assert!(ok.valid);
        assert_eq!(ok.message, "API key is valid!");

        let bad = CredentialCheck::from_response(&HttpResponse::new(
            401,
            json!({"error": {"message": "Incorrect API key provided"}}).to_string(),
        ));
        assert!(!bad.valid);
        assert_eq!(bad.message, "Incorrect API key provided");

        let opaque = CredentialCheck::from_response(&HttpResponse::new(403, "<html>"));
        assert_eq!(opaque.message, "Invalid API key");
    }
}
