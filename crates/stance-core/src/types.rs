//! Core types for stance verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The classified position of a text toward a target entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stance {
    /// Support, agreement, or endorsement of the target.
    Favor,
    /// Opposition, criticism, or disagreement with the target.
    Against,
    /// No discernible position, or unrelated to the target.
    None,
}

impl Stance {
    /// All stances in label-priority order.
    pub const ALL: [Stance; 3] = [Stance::Favor, Stance::Against, Stance::None];

    /// The canonical uppercase label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Favor => "FAVOR",
            Stance::Against => "AGAINST",
            Stance::None => "NONE",
        }
    }

    /// Resolve a canonical label or a known synonym.
    ///
    /// Returns `None` for words that are neither, so callers can decide
    /// whether to keep searching or fall back to [`Stance::None`].
    pub fn resolve(word: &str) -> Option<Stance> {
        match word.trim().to_uppercase().as_str() {
            "FAVOR" | "POSITIVE" | "SUPPORT" | "FOR" | "PRO" => Some(Stance::Favor),
            "AGAINST" | "NEGATIVE" | "OPPOSE" | "OPPOSED" | "ANTI" => Some(Stance::Against),
            "NONE" | "NEUTRAL" | "UNKNOWN" | "UNCLEAR" => Some(Stance::None),
            _ => None,
        }
    }

    /// Map any word onto a stance; unrecognized values become `NONE`.
    pub fn normalize(word: &str) -> Stance {
        Self::resolve(word).unwrap_or(Stance::None)
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a canonical stance label.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid stance label '{0}': expected FAVOR, AGAINST, or NONE")]
pub struct ParseStanceError(pub String);

impl FromStr for Stance {
    type Err = ParseStanceError;

    /// Strict parse: only the three canonical labels, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FAVOR" => Ok(Stance::Favor),
            "AGAINST" => Ok(Stance::Against),
            "NONE" => Ok(Stance::None),
            _ => Err(ParseStanceError(s.to_string())),
        }
    }
}

/// Structured result of parsing a model response.
///
/// Verdicts are immutable and only constructed by
/// [`StanceParser`](crate::StanceParser).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StanceVerdict {
    stance: Stance,
    reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f64>,
}

impl StanceVerdict {
    pub(crate) fn new(stance: Stance, reasoning: String, confidence: Option<f64>) -> Self {
        Self {
            stance,
            reasoning,
            confidence,
        }
    }

    pub fn stance(&self) -> Stance {
        self.stance
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Confidence in [0.0, 1.0], or `None` when the response asserted none.
    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    /// Render the verdict in the canonical response format.
    ///
    /// Parsing the rendered text yields an equal verdict as long as the
    /// reasoning is longer than 10 characters. Shorter reasoning is too
    /// brief for the labeled `Reasoning:` pattern, so a re-parse recovers
    /// the stance but not the reasoning.
    pub fn render(&self) -> String {
        let mut out = format!("STANCE: {}\nReasoning: {}", self.stance, self.reasoning);
        if let Some(confidence) = self.confidence {
            out.push_str(&format!("\nConfidence: {}", confidence));
        }
        out
    }

    /// Decompose into `(stance, reasoning, confidence)`.
    pub fn into_parts(self) -> (Stance, String, Option<f64>) {
        (self.stance, self.reasoning, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stance_from_str() {
        assert_eq!("favor".parse::<Stance>().unwrap(), Stance::Favor);
        assert_eq!(" AGAINST ".parse::<Stance>().unwrap(), Stance::Against);
        assert_eq!("None".parse::<Stance>().unwrap(), Stance::None);
        assert!("support".parse::<Stance>().is_err());
    }

    #[test]
    fn test_normalize_synonyms() {
        for word in ["positive", "SUPPORT", "For", "pro"] {
            assert_eq!(Stance::normalize(word), Stance::Favor, "{word}");
        }
        for word in ["negative", "oppose", "OPPOSED", "anti"] {
            assert_eq!(Stance::normalize(word), Stance::Against, "{word}");
        }
        for word in ["neutral", "unknown", "unclear"] {
            assert_eq!(Stance::normalize(word), Stance::None, "{word}");
        }
        assert_eq!(Stance::normalize("mixed"), Stance::None);
        assert_eq!(Stance::resolve("mixed"), None);
    }

    #[test]
    fn test_stance_serializes_uppercase() {
        let json = serde_json::to_string(&Stance::Against).unwrap();
        assert_eq!(json, "\"AGAINST\"");
    }

    #[test]
    fn test_render_omits_absent_confidence() {
        let verdict = StanceVerdict::new(Stance::Favor, "Supportive tone.".into(), None);
        assert_eq!(verdict.render(), "STANCE: FAVOR\nReasoning: Supportive tone.");

        let verdict = StanceVerdict::new(Stance::None, "Neutral text.".into(), Some(0.5));
        assert!(verdict.render().ends_with("\nConfidence: 0.5"));
    }

    #[test]
    fn test_verdict_serialization_skips_missing_confidence() {
        let verdict = StanceVerdict::new(Stance::None, "Nothing here.".into(), None);
        let value = serde_json::to_value(&verdict).unwrap();
        assert_eq!(value["stance"], "NONE");
        assert!(value.get("confidence").is_none());
    }
}
