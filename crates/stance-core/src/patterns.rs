//! Extraction patterns for model responses.
//!
//! Every table is ordered: callers walk it front to back and the first
//! acceptable match wins. Reordering a table changes classification
//! behavior.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // STANCE PATTERNS
    // =========================================================================

    /// Explicit label markers, most specific first. Each captures a
    /// canonical label following the marker; markdown decoration (`**`, `[`,
    /// quotes) between the colon and the label is skipped.
    pub static ref STANCE_MARKER_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("stance", Regex::new(r#"(?i)\bstance\s*:[\s*_\["'`]*(FAVOR|AGAINST|NONE)\b"#).unwrap()),
        ("classification", Regex::new(r#"(?i)\bclassification\s*:[\s*_\["'`]*(FAVOR|AGAINST|NONE)\b"#).unwrap()),
        ("result", Regex::new(r#"(?i)\bresult\s*:[\s*_\["'`]*(FAVOR|AGAINST|NONE)\b"#).unwrap()),
        ("answer", Regex::new(r#"(?i)\banswer\s*:[\s*_\["'`]*(FAVOR|AGAINST|NONE)\b"#).unwrap()),
    ];

    /// Bare occurrence of a canonical label anywhere in the text.
    pub static ref BARE_LABEL_PATTERN: Regex = Regex::new(
        r"(?i)\b(FAVOR|AGAINST|NONE)\b"
    ).unwrap();

    // =========================================================================
    // REASONING PATTERNS
    // =========================================================================

    /// Labeled reasoning, each capturing up to the next line break.
    pub static ref REASONING_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("reasoning", Regex::new(r"(?im)(?:reasoning|explanation|because|rationale):\s*(.*?)$").unwrap()),
        ("reason phrase", Regex::new(r"(?im)(?:this is because|the reason is):\s*(.*?)$").unwrap()),
        ("justification", Regex::new(r"(?im)(?:justification|support):\s*(.*?)$").unwrap()),
        ("analysis", Regex::new(r"(?im)(?:analysis|assessment):\s*(.*?)$").unwrap()),
    ];

    /// Sentence boundaries for the keyword fallback.
    pub static ref SENTENCE_SPLIT: Regex = Regex::new(r"[.!?]+").unwrap();

    /// A redundant label echoed at the start of extracted reasoning.
    pub static ref REASONING_ECHO: Regex = Regex::new(
        r"(?i)^(?:reasoning|explanation|because):\s*"
    ).unwrap();

    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    // =========================================================================
    // CONFIDENCE PATTERNS
    // =========================================================================

    pub static ref CONFIDENCE_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("confidence", Regex::new(r"(?i)confidence:\s*([0-9]*\.?[0-9]+)").unwrap()),
        ("certainty", Regex::new(r"(?i)certainty:\s*([0-9]*\.?[0-9]+)").unwrap()),
        ("score", Regex::new(r"(?i)score:\s*([0-9]*\.?[0-9]+)").unwrap()),
    ];
}

/// Words whose presence marks a sentence as explanatory.
pub const EXPLANATORY_KEYWORDS: &[&str] = &[
    "because",
    "since",
    "as",
    "due to",
    "given that",
    "considering",
    "indicates",
    "suggests",
    "shows",
    "demonstrates",
    "expresses",
    "support",
    "opposition",
    "favor",
    "against",
];

/// Check whether a sentence contains any explanatory keyword.
pub fn is_explanatory(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    EXPLANATORY_KEYWORDS.iter().any(|k| lower.contains(k))
}
