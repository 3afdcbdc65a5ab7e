//! The bounded validate / suggest / apply loop.

use crate::orchestrator::{Orchestrator, ProcessOptions};
use tokenfix_types::cycle::{
    AgentFailure, CycleOutcome, CyclePhase, FixCycleReport, IterationStats,
};
use tokenfix_types::envelope::AgentRequest;
use tokenfix_types::fix::FixRequest;
use tokenfix_types::issue::Issue;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixCycleOptions {
    pub auto_fix_only: bool,
    pub max_iterations: u32,
}

impl Default for FixCycleOptions {
    fn default() -> Self {
        Self {
            auto_fix_only: true,
            max_iterations: 3,
        }
    }
}

/// Issues grouped by the agent that detected them, in agent id order.
pub type Detected = Vec<(String, Vec<Issue>)>;

impl Orchestrator {
    /// Ask every registered agent for its issues. Agents that fail are reported separately and
    /// contribute no issues.
    pub fn detect_all(&mut self) -> (Detected, Vec<AgentFailure>) {
        self.detect_phase(CyclePhase::Validating)
    }

    fn detect_phase(&mut self, phase: CyclePhase) -> (Detected, Vec<AgentFailure>) {
        let ids: Vec<String> = self.agents.keys().cloned().collect();
        let mut detected = Vec::new();
        let mut failures = Vec::new();

        for id in ids {
            let outcome = self
                .route_request(&id, AgentRequest::Detect)
                .map_err(|e| e.to_string())
                .and_then(|resp| resp.into_issues());
            match outcome {
                Ok(issues) => {
                    debug!(agent = %id, count = issues.len(), "detected issues");
                    detected.push((id, issues));
                }
                Err(message) => failures.push(failure(id, phase, message)),
            }
        }
        (detected, failures)
    }

    /// Requests for every agent's own issues, with `source` stamped.
    pub fn suggest_all(&mut self, detected: &Detected) -> (Vec<FixRequest>, Vec<AgentFailure>) {
        let mut out = Vec::new();
        let mut failures = Vec::new();
        for (id, issues) in detected {
            if issues.is_empty() {
                continue;
            }
            let outcome = self
                .route_request(
                    id,
                    AgentRequest::SuggestFixes {
                        issues: issues.clone(),
                    },
                )
                .map_err(|e| e.to_string())
                .and_then(|resp| resp.into_fixes());
            match outcome {
                Ok(fixes) => {
                    out.extend(fixes.into_iter().map(|mut fix| {
                        if fix.source.is_empty() {
                            fix.source = id.clone();
                        }
                        fix
                    }));
                }
                Err(message) => {
                    failures.push(failure(id.clone(), CyclePhase::Suggesting, message))
                }
            }
        }
        (out, failures)
    }

    /// Validate, suggest and apply until no issues remain or `max_iterations` passes have run.
    ///
    /// Every severity counts toward convergence. A fix that brings its own issue back is not
    /// detected; the iteration bound stops it.
    pub fn run_fix_cycle(&mut self, options: FixCycleOptions) -> FixCycleReport {
        let mut report = FixCycleReport::new();

        info!(phase = ?CyclePhase::Validating, "starting fix cycle");
        let (mut detected, failures) = self.detect_phase(CyclePhase::Validating);
        report.agent_failures.extend(failures);

        for iteration in 1..=options.max_iterations {
            let issues_found = count(&detected);
            if issues_found == 0 {
                break;
            }

            info!(iteration, phase = ?CyclePhase::Suggesting, issues_found, "suggesting fixes");
            let (fixes, failures) = self.suggest_all(&detected);
            report.agent_failures.extend(failures);

            info!(
                iteration,
                phase = ?CyclePhase::Filtering,
                requested = fixes.len(),
                "filtering fixes"
            );
            info!(iteration, phase = ?CyclePhase::Applying, "applying fixes");
            let processed = self.process_fixes(
                fixes,
                ProcessOptions {
                    auto_fix_only: options.auto_fix_only,
                    dry_run: false,
                },
            );

            let stats = IterationStats {
                iteration,
                issues_found,
                fixes_applied: processed.applied_count(),
                fixes_failed: processed.failed.len() as u64,
                fixes_skipped: processed.skipped.len() as u64,
            };
            report.total_fixed += stats.fixes_applied;
            report.iterations.push(stats);

            info!(iteration, phase = ?CyclePhase::Revalidating, "revalidating");
            let (next, failures) = self.detect_phase(CyclePhase::Revalidating);
            report.agent_failures.extend(failures);
            detected = next;
        }

        report.remaining_issues = count(&detected);
        report.issues = detected.into_iter().flat_map(|(_, issues)| issues).collect();
        report.outcome = if report.remaining_issues == 0 {
            CycleOutcome::Converged
        } else {
            CycleOutcome::IterationLimitReached
        };

        info!(
            outcome = ?report.outcome,
            iterations = report.iterations.len(),
            total_fixed = report.total_fixed,
            remaining = report.remaining_issues,
            "fix cycle finished"
        );
        report
    }
}

fn count(detected: &Detected) -> u64 {
    detected.iter().map(|(_, issues)| issues.len() as u64).sum()
}

fn failure(agent: String, phase: CyclePhase, message: String) -> AgentFailure {
    warn!(agent = %agent, phase = ?phase, error = %message, "agent call failed");
    AgentFailure {
        agent,
        phase,
        message,
    }
}
