use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of an issue.
///
/// Variants are declared in ascending order so the derived `Ord` gives
/// `Error > Warning > Info`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain tags used by the built-in collaborators.
pub mod domains {
    pub const TOKEN: &str = "token";
    pub const CONTRAST: &str = "contrast";
    pub const MOTION: &str = "motion";
    pub const MARKUP: &str = "markup";
    pub const CONVENTION: &str = "convention";
}

/// Where an issue was found: a token path or a markup element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    Token { path: String },
    Element { selector: String },
}

impl Locator {
    pub fn token(path: impl Into<String>) -> Self {
        Locator::Token { path: path.into() }
    }

    pub fn element(selector: impl Into<String>) -> Self {
        Locator::Element {
            selector: selector.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Locator::Token { path } => path,
            Locator::Element { selector } => selector,
        }
    }

    pub fn token_path(&self) -> Option<&str> {
        match self {
            Locator::Token { path } => Some(path),
            Locator::Element { .. } => None,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected rule violation. Every collaborator reports problems in this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Domain tag, e.g. `contrast` or `markup`.
    #[serde(rename = "type")]
    pub domain: String,

    /// Stable rule code within the domain, e.g. `contrast.min_ratio`.
    pub code: String,

    pub severity: Severity,
    pub message: String,
    pub locator: Locator,

    /// WCAG success criterion or policy reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Issue {
    pub fn new(
        domain: impl Into<String>,
        code: impl Into<String>,
        severity: Severity,
        locator: Locator,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            code: code.into(),
            severity,
            message: message.into(),
            locator,
            citation: None,
            suggestion: None,
        }
    }

    pub fn with_citation(mut self, citation: impl Into<String>) -> Self {
        self.citation = Some(citation.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// Issue tally by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub info: u64,
    pub warning: u64,
    pub error: u64,
}

impl IssueCounts {
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Info => counts.info += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> u64 {
        self.info + self.warning + self.error
    }
}
