//! The request/response envelope used for every cross-component call.

use crate::fix::{FixRequest, FixResult};
use crate::issue::Issue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AgentRequest {
    Detect,
    SuggestFixes {
        issues: Vec<Issue>,
    },
    ApplyFix {
        fix: Box<FixRequest>,
    },
    /// Collaborator-specific action outside the fix contract.
    Custom {
        name: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl AgentRequest {
    pub fn action(&self) -> &str {
        match self {
            AgentRequest::Detect => "detect",
            AgentRequest::SuggestFixes { .. } => "suggest_fixes",
            AgentRequest::ApplyFix { .. } => "apply_fix",
            AgentRequest::Custom { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ResponseData {
    Issues(Vec<Issue>),
    Fixes(Vec<FixRequest>),
    FixResult(FixResult),
    Value(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    pub fn ok(data: ResponseData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn into_issues(self) -> Result<Vec<Issue>, String> {
        match self.checked()? {
            Some(ResponseData::Issues(issues)) => Ok(issues),
            other => Err(unexpected("issues", other.as_ref())),
        }
    }

    pub fn into_fixes(self) -> Result<Vec<FixRequest>, String> {
        match self.checked()? {
            Some(ResponseData::Fixes(fixes)) => Ok(fixes),
            other => Err(unexpected("fixes", other.as_ref())),
        }
    }

    pub fn into_fix_result(self) -> Result<FixResult, String> {
        match self.checked()? {
            Some(ResponseData::FixResult(result)) => Ok(result),
            other => Err(unexpected("fix_result", other.as_ref())),
        }
    }

    fn checked(self) -> Result<Option<ResponseData>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self
                .error
                .unwrap_or_else(|| "collaborator reported failure".to_string()))
        }
    }
}

fn unexpected(expected: &str, got: Option<&ResponseData>) -> String {
    let got = match got {
        None => "no data",
        Some(ResponseData::Issues(_)) => "issues",
        Some(ResponseData::Fixes(_)) => "fixes",
        Some(ResponseData::FixResult(_)) => "fix_result",
        Some(ResponseData::Value(_)) => "value",
    };
    format!("expected {expected} in response, got {got}")
}
