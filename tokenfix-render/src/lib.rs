//! Rendering helpers (markdown) for human-readable reports.

use tokenfix_types::cycle::{CycleOutcome, FixCycleReport, ProcessReport, SystemStatus};
use tokenfix_types::issue::{Issue, IssueCounts};

pub fn render_cycle_md(report: &FixCycleReport) -> String {
    let mut out = String::new();
    out.push_str("# tokenfix cycle\n\n");
    out.push_str(&format!("- Outcome: `{}`\n", outcome_label(report.outcome)));
    out.push_str(&format!("- Iterations: {}\n", report.iterations.len()));
    out.push_str(&format!("- Fixed: {}\n", report.total_fixed));
    out.push_str(&format!("- Remaining: {}\n\n", report.remaining_issues));

    if !report.iterations.is_empty() {
        out.push_str("## Iterations\n\n");
        out.push_str("| # | Found | Applied | Failed | Skipped |\n");
        out.push_str("|---|---|---|---|---|\n");
        for it in &report.iterations {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                it.iteration, it.issues_found, it.fixes_applied, it.fixes_failed, it.fixes_skipped
            ));
        }
        out.push('\n');
    }

    out.push_str("## Remaining issues\n\n");
    if report.issues.is_empty() {
        out.push_str("_No issues._\n");
    } else {
        let counts = IssueCounts::from_issues(&report.issues);
        out.push_str(&format!(
            "{} error, {} warning, {} info\n\n",
            counts.error, counts.warning, counts.info
        ));
        for issue in &report.issues {
            push_issue(&mut out, issue);
        }
    }

    if !report.agent_failures.is_empty() {
        out.push_str("\n## Collaborator failures\n\n");
        for f in &report.agent_failures {
            out.push_str(&format!("- `{}` during {:?}: {}\n", f.agent, f.phase, f.message));
        }
    }

    out
}

pub fn render_process_md(report: &ProcessReport) -> String {
    let mut out = String::new();
    out.push_str("# tokenfix fixes\n\n");
    out.push_str(&format!("- {}\n\n", report.summary()));

    out.push_str("## Processed\n\n");
    if report.processed.is_empty() {
        out.push_str("_None._\n");
    }
    for (i, p) in report.processed.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n\n", i + 1, p.request.id));
        out.push_str(&format!("- Type: `{}`\n", p.request.fix_type));
        out.push_str(&format!("- Target: `{}`\n", p.request.target));
        out.push_str(&format!("- At: `{}`\n", p.request.issue.locator));
        out.push_str(&format!("\n{}\n", p.request.description));

        if let Some(changes) = &p.result.changes
            && !changes.is_empty()
        {
            out.push_str("\n**Changes**\n\n");
            for c in changes {
                let before = c.before.as_deref().unwrap_or("-");
                let after = c.after.as_deref().unwrap_or("-");
                out.push_str(&format!("- `{}` {} → {}\n", c.locator, before, after));
            }
        }
        out.push('\n');
    }

    if !report.skipped.is_empty() {
        out.push_str("## Skipped\n\n");
        for s in &report.skipped {
            out.push_str(&format!(
                "- `{}` {} (`{}`): {}\n",
                s.request.fix_type, s.request.issue.locator, s.reason_token, s.reason
            ));
        }
        out.push('\n');
    }

    if !report.failed.is_empty() {
        out.push_str("## Failed\n\n");
        for f in &report.failed {
            out.push_str(&format!(
                "- `{}` {}: {}\n",
                f.request.fix_type, f.request.issue.locator, f.error
            ));
        }
        out.push('\n');
    }

    if let Some(preview) = report.preview.as_deref().filter(|p| !p.is_empty()) {
        out.push_str("## Preview\n\n```diff\n");
        out.push_str(preview);
        if !preview.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
    }

    out
}

pub fn render_status_md(status: &SystemStatus) -> String {
    let mut out = String::new();
    out.push_str("# tokenfix status\n\n");
    out.push_str(&format!(
        "- History: {} (applied {}, failed {})\n- Pending: {}\n\n",
        status.fix_history, status.fixes_applied, status.fixes_failed, status.pending_fixes
    ));
    out.push_str("## Collaborators\n\n");
    for agent in &status.agents {
        if agent.routing_keys.is_empty() {
            out.push_str(&format!("- `{}`\n", agent.id));
        } else {
            out.push_str(&format!(
                "- `{}`: {}\n",
                agent.id,
                agent.routing_keys.join(", ")
            ));
        }
    }
    out
}

fn push_issue(out: &mut String, issue: &Issue) {
    out.push_str(&format!(
        "- **{}** `{}` at `{}`: {}",
        issue.severity, issue.code, issue.locator, issue.message
    ));
    if let Some(citation) = &issue.citation {
        out.push_str(&format!(" ({citation})"));
    }
    out.push('\n');
    if let Some(suggestion) = &issue.suggestion {
        out.push_str(&format!("  - Suggestion: {suggestion}\n"));
    }
}

fn outcome_label(o: CycleOutcome) -> &'static str {
    match o {
        CycleOutcome::Converged => "converged",
        CycleOutcome::IterationLimitReached => "iteration_limit_reached",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokenfix_types::cycle::{
        AgentStatus, IterationStats, ProcessedFix, SkippedFix, skip_tokens,
    };
    use tokenfix_types::fix::{Change, FixPayload, FixRequest, FixResult};
    use tokenfix_types::issue::{Locator, Severity};

    fn issue() -> Issue {
        Issue::new(
            "contrast",
            "contrast.min_ratio",
            Severity::Error,
            Locator::token("semantic.text"),
            "contrast 2.54:1 is below 4.5:1",
        )
        .with_citation("WCAG 2.1 SC 1.4.3")
    }

    fn request() -> FixRequest {
        let mut req = FixRequest::new(
            "token.contrast",
            "tokens",
            issue(),
            FixPayload::set_value("semantic.text", "#4b5563"),
            "raise contrast",
        );
        req.id = "fix-1".to_string();
        req
    }

    #[test]
    fn cycle_report_lists_iterations_and_issues() {
        let mut report = FixCycleReport::new();
        report.iterations.push(IterationStats {
            iteration: 1,
            issues_found: 2,
            fixes_applied: 1,
            fixes_failed: 0,
            fixes_skipped: 1,
        });
        report.total_fixed = 1;
        report.remaining_issues = 1;
        report.outcome = CycleOutcome::IterationLimitReached;
        report.issues.push(issue());

        let md = render_cycle_md(&report);
        assert!(md.starts_with("# tokenfix cycle\n\n- Outcome: `iteration_limit_reached`\n"));
        assert!(md.contains("| 1 | 2 | 1 | 0 | 1 |\n"));
        assert!(md.contains("1 error, 0 warning, 0 info\n"));
        assert!(md.contains(
            "- **error** `contrast.min_ratio` at `semantic.text`: contrast 2.54:1 is below 4.5:1 (WCAG 2.1 SC 1.4.3)\n"
        ));
    }

    #[test]
    fn converged_cycle_has_no_issue_list() {
        let md = render_cycle_md(&FixCycleReport::new());
        assert_eq!(
            md,
            "# tokenfix cycle\n\n- Outcome: `converged`\n- Iterations: 0\n- Fixed: 0\n- Remaining: 0\n\n## Remaining issues\n\n_No issues._\n"
        );
    }

    #[test]
    fn process_report_shows_changes_skips_and_preview() {
        let mut report = ProcessReport::new(false);
        report.processed.push(ProcessedFix {
            request: request(),
            result: FixResult::applied(
                "fix-1",
                vec![Change {
                    locator: Locator::token("semantic.text"),
                    before: Some("#9ca3af".to_string()),
                    after: Some("#4b5563".to_string()),
                }],
            ),
        });
        report.skipped.push(SkippedFix {
            request: request(),
            reason: "duplicate request id in batch".to_string(),
            reason_token: skip_tokens::DUPLICATE_REQUEST.to_string(),
        });
        report.preview = Some("diff --git a/tokens.json b/tokens.json\n".to_string());

        let md = render_process_md(&report);
        assert!(md.contains("- 1 processed, 1 skipped, 0 failed\n"));
        assert!(md.contains("### 1. fix-1\n"));
        assert!(md.contains("- `semantic.text` #9ca3af → #4b5563\n"));
        assert!(md.contains("(`duplicate_request`): duplicate request id in batch\n"));
        assert!(md.contains("```diff\ndiff --git a/tokens.json b/tokens.json\n```\n"));
    }

    #[test]
    fn status_lists_agents_and_keys() {
        let status = SystemStatus {
            schema: "tokenfix.status.v1".to_string(),
            agents: vec![
                AgentStatus {
                    id: "motion".to_string(),
                    routing_keys: vec![],
                },
                AgentStatus {
                    id: "tokens".to_string(),
                    routing_keys: vec!["token.create".to_string(), "token.update".to_string()],
                },
            ],
            fix_history: 3,
            fixes_applied: 2,
            fixes_failed: 1,
            pending_fixes: 0,
        };
        let md = render_status_md(&status);
        assert!(md.contains("- History: 3 (applied 2, failed 1)\n- Pending: 0\n"));
        assert!(md.contains("- `motion`\n- `tokens`: token.create, token.update\n"));
    }
}
