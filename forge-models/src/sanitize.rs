//! Cleanup of raw model output.
//!
//! Models like to prefix their answer with a label (`Prompt:`) or wrap it in
//! quotes. [`sanitize`] removes both and is idempotent:
//! `sanitize(sanitize(x)) == sanitize(x)` for every input.

/// Single-word labels removed from the start of a response.
const LABELS: &[&str] = &["prompt", "result", "response", "output", "description"];

/// Remove leading labels and wrapping quotes from a model response.
///
/// ```
/// use forge_models::sanitize::sanitize;
///
/// assert_eq!(sanitize("Prompt: \"A calm lake\""), "A calm lake");
/// assert_eq!(sanitize("  Scene 3: 'Rain on neon streets'  "), "Rain on neon streets");
/// ```
pub fn sanitize(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let next = sanitize_once(current);
        if next == current {
            return next.to_string();
        }
        current = next;
    }
}

fn sanitize_once(text: &str) -> &str {
    let text = text.trim();
    let text = strip_label(text).unwrap_or(text).trim_start();
    strip_quotes(text).trim()
}

/// Strip one leading `<label>:` if present, returning what follows the colon.
fn strip_label(text: &str) -> Option<&str> {
    let (word, rest) = leading_word(text)?;
    let rest = match word.to_ascii_lowercase().as_str() {
        "enhanced" => {
            let (next, rest) = leading_word(rest.trim_start())?;
            next.eq_ignore_ascii_case("prompt").then_some(rest)?
        }
        "scene" => {
            let rest = rest.trim_start();
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                return None;
            }
            &rest[digits..]
        }
        w if LABELS.contains(&w) => rest,
        _ => return None,
    };
    rest.trim_start().strip_prefix(':')
}

/// Split off the leading run of ASCII letters.
fn leading_word(text: &str) -> Option<(&str, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    (end > 0).then(|| text.split_at(end))
}

fn strip_quotes(text: &str) -> &str {
    let is_quote = |c: u8| c == b'"' || c == b'\'';
    let bytes = text.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last)) if bytes.len() >= 2 && is_quote(first) && is_quote(last) => {
            &text[1..text.len() - 1]
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_label_and_quotes() {
        assert_eq!(sanitize("Prompt: \"A calm lake\""), "A calm lake");
    }

    #[test]
    fn strips_every_known_label() {
        for label in [
            "Prompt",
            "Enhanced Prompt",
            "Result",
            "Response",
            "Scene 12",
            "Output",
            "Description",
        ] {
            assert_eq!(sanitize(&format!("{label}: A foggy pier")), "A foggy pier", "{label}");
        }
    }

    #[test]
    fn labels_are_case_insensitive() {
        assert_eq!(sanitize("ENHANCED PROMPT: dusk"), "dusk");
        assert_eq!(sanitize("output:dusk"), "dusk");
    }

    #[test]
    fn label_requires_colon() {
        assert_eq!(sanitize("Description of a quiet alley"), "Description of a quiet alley");
        assert_eq!(sanitize("Outputs flicker"), "Outputs flicker");
        assert_eq!(sanitize("Scene: opening shot"), "Scene: opening shot");
    }

    #[test]
    fn single_quotes_are_stripped() {
        assert_eq!(sanitize("'Wide shot of dunes'"), "Wide shot of dunes");
    }

    #[test]
    fn inner_quotes_are_kept() {
        assert_eq!(
            sanitize("A sign reads \"OPEN\" in red"),
            "A sign reads \"OPEN\" in red"
        );
    }

    #[test]
    fn nested_wrapping_is_fully_removed() {
        assert_eq!(sanitize("Result: \"Prompt: 'Snowfall'\""), "Snowfall");
    }

    #[test]
    fn lone_quote_is_left_alone() {
        assert_eq!(sanitize("\""), "\"");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(sanitize("Prompt: «Ciel étoilé»"), "«Ciel étoilé»");
        assert_eq!(sanitize("\"日本の夜景\""), "日本の夜景");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(text in "\\PC{0,64}") {
            let once = sanitize(&text);
            prop_assert_eq!(sanitize(&once), once.clone());
        }

        #[test]
        fn sanitize_is_idempotent_on_labelled_input(
            label in "(Prompt|Enhanced Prompt|Result|Scene [0-9]{1,3}|Output)",
            body in "[\"' a-zA-Z:]{0,24}",
        ) {
            let text = format!("{label}: {body}");
            let once = sanitize(&text);
            prop_assert_eq!(sanitize(&once), once.clone());
        }
    }
}
