//! # stance-core
//!
//! Deterministic parsing of stance-detection model output.
//!
//! Large language models asked to classify a text's stance toward a target
//! answer in free-form prose: sometimes in the requested format, often not.
//! This crate recovers a structured [`StanceVerdict`] from whatever came
//! back.
//!
//! ## Key Guarantees
//!
//! 1. **Never fails**: malformed input degrades to `NONE` with default reasoning
//! 2. **Deterministic**: pattern priority decides ambiguous responses, not counts
//! 3. **Bounded**: reasoning is non-empty, at most 500 characters, punctuated
//! 4. **No I/O**: safe to call from any thread or async context
//!
//! ## Example
//!
//! ```rust
//! use stance_core::{parse, Stance};
//!
//! let verdict = parse("STANCE: FAVOR\nReasoning: The author praises the plan.\nConfidence: 87");
//! assert_eq!(verdict.stance(), Stance::Favor);
//! assert_eq!(verdict.confidence(), Some(0.87));
//! ```

pub mod parser;
pub mod patterns;
pub mod types;
pub mod validation;

pub use parser::{
    clean_reasoning, StanceParser, EMPTY_RESPONSE_REASONING, MAX_REASONING_CHARS,
    NO_CLEAR_REASONING, NO_REASONING,
};
pub use types::{ParseStanceError, Stance, StanceVerdict};
pub use validation::{FormatIssue, FormatReport};

/// Parse a raw model response with the default parser.
pub fn parse(raw: &str) -> StanceVerdict {
    StanceParser::new().parse(raw)
}

/// Report formatting problems in a raw model response.
pub fn validate_format(raw: &str) -> FormatReport {
    StanceParser::new().validate_format(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parse() {
        let verdict = parse("STANCE: AGAINST\nReasoning: The text criticizes the senator's record.");
        assert_eq!(verdict.stance(), Stance::Against);
        assert_eq!(verdict.reasoning(), "The text criticizes the senator's record.");
    }

    #[test]
    fn test_parser_is_shareable_across_threads() {
        let parser = StanceParser::new();
        let handles: Vec<_> = ["STANCE: FAVOR", "STANCE: AGAINST", "STANCE: NONE"]
            .into_iter()
            .map(|raw| std::thread::spawn(move || parser.parse(raw).stance()))
            .collect();

        let stances: Vec<Stance> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(stances, vec![Stance::Favor, Stance::Against, Stance::None]);
    }
}
