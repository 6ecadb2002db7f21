//! Lexical content check.
//!
//! A best-effort substring filter, not a moderation system.

use serde::Serialize;

/// Terms that flag a prompt, matched case-insensitively as substrings.
pub const PROHIBITED_TERMS: &[&str] = &["nsfw", "naked", "graphic violence", "blood", "hate speech"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentReport {
    pub safe: bool,
    pub flagged_terms: Vec<&'static str>,
}

pub fn validate_content(text: &str) -> ContentReport {
    let lowered = text.to_lowercase();
    let flagged_terms: Vec<_> = PROHIBITED_TERMS
        .iter()
        .copied()
        .filter(|term| lowered.contains(term))
        .collect();
    ContentReport {
        safe: flagged_terms.is_empty(),
        flagged_terms,
    }
}
