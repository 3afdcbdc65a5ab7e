//! Reports produced by the orchestrator: batch processing, fix cycles and status.

use crate::fix::{FixRequest, FixResult};
use crate::issue::Issue;
use serde::{Deserialize, Serialize};

/// Phases of one fix-cycle iteration, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Validating,
    Suggesting,
    Filtering,
    Applying,
    Revalidating,
}

/// How a fix cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    Converged,
    IterationLimitReached,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationStats {
    /// 1-based.
    pub iteration: u32,
    pub issues_found: u64,
    pub fixes_applied: u64,
    pub fixes_failed: u64,

    #[serde(default)]
    pub fixes_skipped: u64,
}

/// A collaborator call that failed outright during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub agent: String,
    pub phase: CyclePhase,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixCycleReport {
    pub schema: String,

    #[serde(default)]
    pub iterations: Vec<IterationStats>,

    pub total_fixed: u64,
    pub remaining_issues: u64,
    pub outcome: CycleOutcome,

    /// Issues still open when the cycle stopped.
    #[serde(default)]
    pub issues: Vec<Issue>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agent_failures: Vec<AgentFailure>,
}

impl FixCycleReport {
    pub fn new() -> Self {
        Self {
            schema: crate::schema::TOKENFIX_CYCLE_V1.to_string(),
            iterations: vec![],
            total_fixed: 0,
            remaining_issues: 0,
            outcome: CycleOutcome::Converged,
            issues: vec![],
            agent_failures: vec![],
        }
    }

    pub fn converged(&self) -> bool {
        self.outcome == CycleOutcome::Converged
    }
}

impl Default for FixCycleReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable reason tokens for skipped fixes.
pub mod skip_tokens {
    pub const NOT_AUTO_FIXABLE: &str = "not_auto_fixable";
    pub const NOT_OWNER: &str = "not_owner";
    pub const DENYLIST: &str = "denylist";
    pub const ALLOWLIST_MISSING: &str = "allowlist_missing";
    pub const DUPLICATE_REQUEST: &str = "duplicate_request";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedFix {
    pub request: FixRequest,
    pub result: FixResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFix {
    pub request: FixRequest,
    pub reason: String,
    pub reason_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedFix {
    pub request: FixRequest,
    pub error: String,
}

/// Outcome of processing one batch of fix requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessReport {
    pub schema: String,
    pub dry_run: bool,

    #[serde(default)]
    pub processed: Vec<ProcessedFix>,

    #[serde(default)]
    pub skipped: Vec<SkippedFix>,

    #[serde(default)]
    pub failed: Vec<FailedFix>,

    /// Unified diff of the token changes the batch would make (dry runs only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl ProcessReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            schema: crate::schema::TOKENFIX_PROCESS_V1.to_string(),
            dry_run,
            processed: vec![],
            skipped: vec![],
            failed: vec![],
            preview: None,
        }
    }

    /// Fixes that actually changed state. Always zero for dry runs.
    pub fn applied_count(&self) -> u64 {
        if self.dry_run {
            0
        } else {
            self.processed.len() as u64
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} processed, {} skipped, {} failed{}",
            self.processed.len(),
            self.skipped.len(),
            self.failed.len(),
            if self.dry_run { " (dry run)" } else { "" }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub id: String,

    #[serde(default)]
    pub routing_keys: Vec<String>,
}

/// Diagnostic snapshot of an orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub schema: String,
    pub agents: Vec<AgentStatus>,
    pub fix_history: u64,
    pub fixes_applied: u64,
    pub fixes_failed: u64,
    pub pending_fixes: u64,
}
