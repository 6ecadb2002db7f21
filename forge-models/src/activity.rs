//! Usage analytics and output history hooks.
//!
//! The gateway reports what it did through an [`ActivitySink`]. Sinks are
//! fire-and-forget: they return nothing and must swallow their own failures.

use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// How a history entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    /// Free text from single-scene generation.
    Ai,
    /// Structured JSON from batch generation.
    Json,
}

impl HistoryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryMode::Ai => "ai",
            HistoryMode::Json => "json",
        }
    }
}

/// Receiver for usage events and history entries.
pub trait ActivitySink: Send + Sync {
    fn record_usage_event(&self, name: &str, data: Value);
    fn record_history_entry(&self, content: &str, mode: HistoryMode);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ActivitySink for NoopSink {
    fn record_usage_event(&self, _name: &str, _data: Value) {}
    fn record_history_entry(&self, _content: &str, _mode: HistoryMode) {}
}

/// Emits activity as structured `tracing` events under one session id.
#[derive(Debug, Clone)]
pub struct TracingSink {
    session_id: Uuid,
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingSink {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

impl ActivitySink for TracingSink {
    fn record_usage_event(&self, name: &str, data: Value) {
        info!(
            target: "forge::activity",
            session = %self.session_id,
            event_id = %Uuid::new_v4(),
            event = name,
            data = %data,
            "usage event"
        );
    }

    fn record_history_entry(&self, content: &str, mode: HistoryMode) {
        info!(
            target: "forge::activity",
            session = %self.session_id,
            mode = mode.as_str(),
            chars = content.chars().count(),
            "history entry"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_mode_labels() {
        assert_eq!(HistoryMode::Ai.as_str(), "ai");
        assert_eq!(HistoryMode::Json.as_str(), "json");
    }

    #[test]
    fn sinks_accept_events() {
        let sinks: Vec<Box<dyn ActivitySink>> = vec![Box::new(NoopSink), Box::new(TracingSink::new())];
        for sink in sinks {
            sink.record_usage_event("generate_prompt", json!({"provider": "openai"}));
            sink.record_history_entry("A quiet harbor", HistoryMode::Ai);
        }
    }

    #[test]
    fn tracing_sink_sessions_are_distinct() {
        assert_ne!(TracingSink::new().session_id(), TracingSink::new().session_id());
    }
}
