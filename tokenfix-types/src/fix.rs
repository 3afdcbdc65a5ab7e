use crate::issue::{Issue, Locator, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Routing keys understood by the built-in collaborators.
pub mod fix_types {
    pub const TOKEN_UPDATE: &str = "token.update";
    pub const TOKEN_CREATE: &str = "token.create";
    pub const TOKEN_DELETE: &str = "token.delete";
    pub const TOKEN_CONTRAST: &str = "token.contrast";
    pub const ARIA_SET_ATTRIBUTE: &str = "aria.set_attribute";
    pub const ARIA_REMOVE_ATTRIBUTE: &str = "aria.remove_attribute";
}

/// Lifecycle of a fix request. Skipped requests stay `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    #[default]
    Pending,
    Applied,
    Failed,
}

/// The change a fix request proposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FixPayload {
    TokenSet {
        path: String,
        value: String,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        token_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    TokenRemove {
        path: String,
    },
    /// Collaborator-specific edit, interpreted only by the owning collaborator.
    Transform {
        rule_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<serde_json::Value>,
    },
}

impl FixPayload {
    pub fn set_value(path: impl Into<String>, value: impl Into<String>) -> Self {
        FixPayload::TokenSet {
            path: path.into(),
            value: value.into(),
            token_type: None,
            description: None,
        }
    }

    pub fn token_path(&self) -> Option<&str> {
        match self {
            FixPayload::TokenSet { path, .. } | FixPayload::TokenRemove { path } => Some(path),
            FixPayload::Transform { .. } => None,
        }
    }
}

/// A proposed remediation for one issue, owned by exactly one collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRequest {
    pub id: String,

    /// Routing key.
    #[serde(rename = "type")]
    pub fix_type: String,

    pub severity: Severity,

    /// Collaborator that detected the issue.
    pub source: String,

    /// Collaborator that must apply the fix. Empty means "resolve by routing key".
    pub target: String,

    pub issue: Issue,
    pub fix: FixPayload,
    pub description: String,
    pub auto_fixable: bool,

    #[serde(default)]
    pub status: FixStatus,

    pub created_at: DateTime<Utc>,
}

impl FixRequest {
    /// A pending request for `issue`. Severity follows the issue; `id` and `source` are filled in
    /// by the orchestrator when empty.
    pub fn new(
        fix_type: impl Into<String>,
        target: impl Into<String>,
        issue: Issue,
        fix: FixPayload,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            fix_type: fix_type.into(),
            severity: issue.severity,
            source: String::new(),
            target: target.into(),
            issue,
            fix,
            description: description.into(),
            auto_fixable: false,
            status: FixStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn auto_fixable(mut self, auto_fixable: bool) -> Self {
        self.auto_fixable = auto_fixable;
        self
    }
}

/// One mutation performed while applying a fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub locator: Locator,
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixResult {
    pub request_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub changes: Option<Vec<Change>>,
    pub needs_validation: bool,
    pub completed_at: DateTime<Utc>,
}

impl FixResult {
    pub fn applied(request_id: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            error: None,
            changes: Some(changes),
            needs_validation: true,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: false,
            error: Some(error.into()),
            changes: None,
            needs_validation: false,
            completed_at: Utc::now(),
        }
    }

    /// Result recorded for a dry run: nothing was touched.
    pub fn simulated(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            success: true,
            error: None,
            changes: None,
            needs_validation: false,
            completed_at: Utc::now(),
        }
    }
}
