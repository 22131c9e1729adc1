//! Stance response parser.
//!
//! Turns free-form model output into a [`StanceVerdict`]. Parsing never
//! fails: missing or malformed information degrades to `NONE` with a
//! default reasoning string, and a diagnostic is logged instead.
//!
//! ## Extraction order
//!
//! | Field | Order |
//! |-------|-------|
//! | stance | `STANCE:` → `classification:` → `result:` → `answer:` → bare label → substring scan → `NONE` |
//! | reasoning | labeled patterns → explanatory sentences → short verbatim response → fixed fallback |
//! | confidence | `confidence:` → `certainty:` → `score:` → absent |

use crate::patterns::{
    is_explanatory, BARE_LABEL_PATTERN, CONFIDENCE_PATTERNS, REASONING_ECHO, REASONING_PATTERNS,
    SENTENCE_SPLIT, STANCE_MARKER_PATTERNS, WHITESPACE_RUN,
};
use crate::types::{Stance, StanceVerdict};

/// Reasoning returned for empty input.
pub const EMPTY_RESPONSE_REASONING: &str = "No valid response provided";

/// Reasoning returned when nothing explanatory could be recovered.
pub const NO_CLEAR_REASONING: &str = "No clear reasoning provided in the response.";

/// Reasoning returned when cleanup leaves nothing behind.
pub const NO_REASONING: &str = "No reasoning provided.";

/// Upper bound on reasoning length, in characters.
pub const MAX_REASONING_CHARS: usize = 500;

/// Labeled reasoning must be longer than this to be accepted.
const MIN_LABELED_REASONING_CHARS: usize = 10;

/// Responses shorter than this are used verbatim as a last resort.
const VERBATIM_RESPONSE_LIMIT: usize = 200;

/// Parses raw model output into stance verdicts.
///
/// Stateless; a single instance can be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct StanceParser;

impl StanceParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a raw response into a verdict.
    pub fn parse(&self, raw: &str) -> StanceVerdict {
        let response = raw.trim();
        if response.is_empty() {
            tracing::warn!("Empty or invalid response received");
            return StanceVerdict::new(Stance::None, EMPTY_RESPONSE_REASONING.to_string(), None);
        }

        let stance = self.extract_stance(response);
        let reasoning = clean_reasoning(&self.extract_reasoning(response));
        let confidence = self.extract_confidence(response);

        tracing::debug!(
            stance = %stance,
            confidence = ?confidence,
            reasoning = preview(&reasoning, 50),
            "Parsed stance response"
        );

        StanceVerdict::new(stance, reasoning, confidence)
    }

    /// Extract the stance label.
    ///
    /// Ambiguous responses are resolved by pattern priority, never by
    /// counting label occurrences.
    pub fn extract_stance(&self, response: &str) -> Stance {
        for (marker, regex) in STANCE_MARKER_PATTERNS.iter() {
            if let Some(caps) = regex.captures(response) {
                let stance = Stance::normalize(&caps[1]);
                tracing::trace!(marker, stance = %stance, "Stance matched marker");
                return stance;
            }
        }

        if let Some(caps) = BARE_LABEL_PATTERN.captures(response) {
            return Stance::normalize(&caps[1]);
        }

        let upper = response.to_uppercase();
        if let Some(stance) = Stance::ALL
            .into_iter()
            .find(|stance| upper.contains(stance.as_str()))
        {
            return stance;
        }

        tracing::warn!(
            response = preview(response, 100),
            "Could not extract valid stance from response"
        );
        Stance::None
    }

    /// Extract reasoning text before cleanup.
    pub fn extract_reasoning(&self, response: &str) -> String {
        for (_, regex) in REASONING_PATTERNS.iter() {
            for caps in regex.captures_iter(response) {
                let candidate = caps[1].trim();
                if candidate.chars().count() > MIN_LABELED_REASONING_CHARS {
                    return candidate.to_string();
                }
            }
        }

        let sentences: Vec<&str> = SENTENCE_SPLIT
            .split(response)
            .map(str::trim)
            .filter(|sentence| is_explanatory(sentence))
            .take(2)
            .collect();
        if !sentences.is_empty() {
            return sentences.join(". ");
        }

        if response.chars().count() < VERBATIM_RESPONSE_LIMIT {
            return response.to_string();
        }

        NO_CLEAR_REASONING.to_string()
    }

    /// Extract a confidence score normalized to [0.0, 1.0].
    ///
    /// Values above 1.0 are read as percentages. `None` means the response
    /// asserted no confidence at all, which is distinct from `Some(0.0)`.
    pub fn extract_confidence(&self, response: &str) -> Option<f64> {
        for (label, regex) in CONFIDENCE_PATTERNS.iter() {
            let Some(caps) = regex.captures(response) else {
                continue;
            };
            match caps[1].parse::<f64>() {
                Ok(mut value) => {
                    if value > 1.0 {
                        value /= 100.0;
                    }
                    return Some(value.clamp(0.0, 1.0));
                }
                Err(e) => {
                    tracing::debug!(label, error = %e, "Skipping unparseable confidence");
                }
            }
        }
        None
    }
}

/// Normalize extracted reasoning for presentation.
///
/// The result is non-empty, at most [`MAX_REASONING_CHARS`] characters, and
/// ends in terminal punctuation.
pub fn clean_reasoning(raw: &str) -> String {
    let stripped = REASONING_ECHO.replace(raw.trim_start(), "");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();

    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return NO_REASONING.to_string();
    };
    let mut reasoning: String = first.to_uppercase().chain(chars).collect();

    if reasoning.chars().count() > MAX_REASONING_CHARS {
        reasoning = reasoning.chars().take(MAX_REASONING_CHARS).collect();
        let kept = reasoning.trim_end().len();
        reasoning.truncate(kept);
    }

    if !reasoning.ends_with(|c: char| matches!(c, '.' | '!' | '?')) {
        if reasoning.chars().count() >= MAX_REASONING_CHARS {
            reasoning.pop();
        }
        reasoning.push('.');
    }

    reasoning
}

/// Leading slice of `text`, at most `max_chars` characters.
fn preview(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map(|(idx, _)| &text[..idx])
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> StanceVerdict {
        StanceParser::new().parse(raw)
    }

    #[test]
    fn test_empty_input() {
        for raw in ["", "   \n\t "] {
            let verdict = parse(raw);
            assert_eq!(verdict.stance(), Stance::None);
            assert_eq!(verdict.reasoning(), EMPTY_RESPONSE_REASONING);
            assert_eq!(verdict.confidence(), None);
        }
    }

    #[test]
    fn test_canonical_format() {
        let verdict = parse(
            "STANCE: AGAINST\nReasoning: Clinton's judgment is questioned due to the scandal.",
        );
        assert_eq!(verdict.stance(), Stance::Against);
        assert!(verdict.reasoning().starts_with("Clinton's judgment"));
        assert_eq!(verdict.confidence(), None);
    }

    #[test]
    fn test_stance_marker_beats_earlier_bare_label() {
        let verdict = parse("Some might say FAVOR, but overall STANCE: AGAINST");
        assert_eq!(verdict.stance(), Stance::Against);
    }

    #[test]
    fn test_marker_priority_order() {
        let verdict = parse("Answer: FAVOR\nClassification: NONE");
        assert_eq!(verdict.stance(), Stance::None);

        let verdict = parse("Result: against\nanswer: favor");
        assert_eq!(verdict.stance(), Stance::Against);
    }

    #[test]
    fn test_bare_label_first_occurrence_wins() {
        let verdict = parse("Between AGAINST and FAVOR I pick the first. FAVOR FAVOR FAVOR");
        assert_eq!(verdict.stance(), Stance::Against);
    }

    #[test]
    fn test_markdown_decorated_marker() {
        let verdict = parse("**Stance:** **favor**\n**Reasoning:** The author praises the plan.");
        assert_eq!(verdict.stance(), Stance::Favor);
    }

    #[test]
    fn test_prose_after_marker_is_not_a_label() {
        let verdict = parse("Result: For this tweet, the stance is AGAINST.");
        assert_eq!(verdict.stance(), Stance::Against);

        let verdict = parse("Answer: Pro-life groups are criticized here, so AGAINST.");
        assert_eq!(verdict.stance(), Stance::Against);

        let verdict = parse("Classification: Anti-war rhetoric, but overall FAVOR");
        assert_eq!(verdict.stance(), Stance::Favor);
    }

    #[test]
    fn test_synonym_marker_does_not_shadow_later_label() {
        let verdict = parse(
            "Previous stance: opposed\nSTANCE: FAVOR\nReasoning: The author endorses the plan.",
        );
        assert_eq!(verdict.stance(), Stance::Favor);
    }

    #[test]
    fn test_synonym_alone_is_not_a_label() {
        assert_eq!(parse("Stance: Positive").stance(), Stance::None);
        assert_eq!(parse("Stance: mixed, though leaning AGAINST overall").stance(), Stance::Against);
    }

    #[test]
    fn test_substring_fallback() {
        assert_eq!(parse("A FAVORABLE view overall").stance(), Stance::Favor);
        assert_eq!(parse("They are AGAINSTit").stance(), Stance::Against);
    }

    #[test]
    fn test_no_stance_defaults_to_none() {
        let verdict = parse("The weather will be sunny tomorrow.");
        assert_eq!(verdict.stance(), Stance::None);
    }

    #[test]
    fn test_reasoning_short_label_falls_through() {
        let raw = "STANCE: FAVOR\nReasoning: ok\nAnalysis: The text clearly praises the policy outcomes.";
        let verdict = parse(raw);
        assert_eq!(
            verdict.reasoning(),
            "The text clearly praises the policy outcomes."
        );
    }

    #[test]
    fn test_reasoning_echo_stripped() {
        let verdict = parse("STANCE: NONE\nReasoning: reasoning: the text is purely factual");
        assert_eq!(verdict.reasoning(), "The text is purely factual.");
    }

    #[test]
    fn test_reasoning_keyword_sentences() {
        let raw = "The author supports the bill. It shows optimism. It demonstrates hope.";
        let verdict = parse(raw);
        assert_eq!(
            verdict.reasoning(),
            "The author supports the bill. It shows optimism."
        );
    }

    #[test]
    fn test_reasoning_verbatim_short_response() {
        let verdict = parse("nope");
        assert_eq!(verdict.stance(), Stance::None);
        assert_eq!(verdict.reasoning(), "Nope.");
    }

    #[test]
    fn test_reasoning_fixed_fallback_for_long_text() {
        let raw = "zzz qqq ".repeat(40);
        let verdict = parse(&raw);
        assert_eq!(verdict.reasoning(), NO_CLEAR_REASONING);
    }

    #[test]
    fn test_reasoning_whitespace_collapsed_and_capitalized() {
        let verdict = parse("STANCE: FAVOR\nReasoning:   the   author\tlikes it   a lot!");
        assert_eq!(verdict.reasoning(), "The author likes it a lot!");
    }

    #[test]
    fn test_reasoning_truncated_with_punctuation() {
        let raw = format!("STANCE: FAVOR\nReasoning: {}", "word ".repeat(200));
        let verdict = parse(&raw);
        assert!(verdict.reasoning().chars().count() <= MAX_REASONING_CHARS);
        assert!(verdict.reasoning().ends_with('.'));
    }

    #[test]
    fn test_confidence_percentage() {
        let verdict = parse("STANCE: FAVOR\nConfidence: 87");
        assert_eq!(verdict.confidence(), Some(0.87));
    }

    #[test]
    fn test_confidence_fraction() {
        let verdict = parse("STANCE: FAVOR\nconfidence: 0.42");
        assert_eq!(verdict.confidence(), Some(0.42));
    }

    #[test]
    fn test_confidence_clamped() {
        let verdict = parse("STANCE: FAVOR\nConfidence: 250");
        assert_eq!(verdict.confidence(), Some(1.0));
    }

    #[test]
    fn test_confidence_alternate_labels() {
        assert_eq!(parse("Certainty: 0.6").confidence(), Some(0.6));
        assert_eq!(parse("Score: 75").confidence(), Some(0.75));
    }

    #[test]
    fn test_confidence_falls_through_to_later_label() {
        assert_eq!(parse("Confidence: high\nScore: 80").confidence(), Some(0.8));
        assert_eq!(parse("Certainty: unsure\nScore: 0.25").confidence(), Some(0.25));
    }

    #[test]
    fn test_confidence_zero_is_not_absent() {
        assert_eq!(parse("STANCE: NONE\nConfidence: 0").confidence(), Some(0.0));
        assert_eq!(parse("STANCE: NONE\nConfidence: High").confidence(), None);
    }

    #[test]
    fn test_render_round_trip() {
        let verdict = parse(
            "stance: against\nExplanation: the author mocks the proposal repeatedly\nConfidence: 91",
        );
        let reparsed = parse(&verdict.render());
        assert_eq!(reparsed, verdict);
    }

    #[test]
    fn test_render_short_reasoning_keeps_only_stance() {
        let verdict = parse("nope");
        assert_eq!(verdict.reasoning(), "Nope.");

        let reparsed = parse(&verdict.render());
        assert_eq!(reparsed.stance(), verdict.stance());
        assert_eq!(reparsed.reasoning(), "STANCE: NONE Reasoning: Nope.");

        let verdict = parse("FAVOR");
        let reparsed = parse(&verdict.render());
        assert_eq!(reparsed.stance(), Stance::Favor);
        assert_ne!(reparsed.reasoning(), verdict.reasoning());
    }

    #[test]
    fn test_clean_reasoning_empty_after_strip() {
        assert_eq!(clean_reasoning("Because:   "), NO_REASONING);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("héllo wörld", 4), "héll");
        assert_eq!(preview("short", 50), "short");
    }
}
