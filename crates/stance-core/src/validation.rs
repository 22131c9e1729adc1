//! Response format diagnostics.
//!
//! Used for offline quality auditing of model output, not on the request
//! path. Validation never mutates or rejects anything; it only reports.

use serde::{Serialize, Serializer};

use crate::parser::StanceParser;
use crate::types::Stance;

const MIN_REASONING_CHARS: usize = 20;
const MIN_RESPONSE_CHARS: usize = 50;
const MAX_RESPONSE_CHARS: usize = 1000;

/// A single formatting problem found in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatIssue {
    Empty,
    NoClearStance,
    InsufficientReasoning,
    TooShort,
    TooLong,
}

impl FormatIssue {
    pub fn message(&self) -> &'static str {
        match self {
            FormatIssue::Empty => "Empty response",
            FormatIssue::NoClearStance => "No clear stance detected",
            FormatIssue::InsufficientReasoning => "Insufficient reasoning provided",
            FormatIssue::TooShort => "Response too short",
            FormatIssue::TooLong => "Response too long",
        }
    }

    /// Human-readable remedy paired with this issue.
    pub fn suggestion(&self) -> &'static str {
        match self {
            FormatIssue::Empty => "Response should contain a stance classification and reasoning",
            FormatIssue::NoClearStance => {
                "Response should explicitly state FAVOR, AGAINST, or NONE"
            }
            FormatIssue::InsufficientReasoning => {
                "Response should include clear justification for the stance"
            }
            FormatIssue::TooShort => "Response should provide more detailed analysis",
            FormatIssue::TooLong => "Response should be more concise",
        }
    }
}

impl Serialize for FormatIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

/// Outcome of [`StanceParser::validate_format`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatReport {
    pub is_valid: bool,
    pub issues: Vec<FormatIssue>,
    pub suggestions: Vec<&'static str>,
}

impl FormatReport {
    fn from_issues(issues: Vec<FormatIssue>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            suggestions: issues.iter().map(FormatIssue::suggestion).collect(),
            issues,
        }
    }

    pub fn has_issue(&self, issue: FormatIssue) -> bool {
        self.issues.contains(&issue)
    }
}

impl StanceParser {
    /// Report formatting problems in a raw response.
    pub fn validate_format(&self, raw: &str) -> FormatReport {
        if raw.trim().is_empty() {
            return FormatReport::from_issues(vec![FormatIssue::Empty]);
        }

        let mut issues = Vec::new();

        if self.extract_stance(raw) == Stance::None && !raw.to_uppercase().contains("NONE") {
            issues.push(FormatIssue::NoClearStance);
        }

        if self.extract_reasoning(raw).chars().count() < MIN_REASONING_CHARS {
            issues.push(FormatIssue::InsufficientReasoning);
        }

        let length = raw.chars().count();
        if length < MIN_RESPONSE_CHARS {
            issues.push(FormatIssue::TooShort);
        } else if length > MAX_RESPONSE_CHARS {
            issues.push(FormatIssue::TooLong);
        }

        if !issues.is_empty() {
            tracing::debug!(issues = ?issues, "Response format issues found");
        }

        FormatReport::from_issues(issues)
    }
}
