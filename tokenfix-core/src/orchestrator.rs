//! Routing table, batch fix processing and status.

use crate::error::RouteError;
use crate::ids::fix_request_id;
use crate::policy::FixPolicy;
use diffy::PatchFormatter;
use std::collections::{BTreeMap, HashSet};
use tokenfix_agents::{Agent, TokenAgent, agent_ids};
use tokenfix_tokens::TokenStore;
use tokenfix_types::cycle::{
    AgentStatus, FailedFix, ProcessReport, ProcessedFix, SkippedFix, SystemStatus, skip_tokens,
};
use tokenfix_types::envelope::{AgentRequest, AgentResponse};
use tokenfix_types::fix::{FixRequest, FixResult, FixStatus};
use tokenfix_types::schema;
use tracing::{debug, warn};

/// Path shown in dry-run previews for the serialized token tree.
const PREVIEW_PATH: &str = "tokens.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Skip requests that are not marked auto-fixable.
    pub auto_fix_only: bool,

    /// Simulate against a copy of the store and report a preview instead of applying.
    pub dry_run: bool,
}

/// Owns one token store and the collaborators registered against it.
///
/// The built-in [`TokenAgent`] is always registered under `tokens`.
pub struct Orchestrator {
    pub(crate) store: TokenStore,
    pub(crate) agents: BTreeMap<String, Box<dyn Agent>>,
    /// Routing key -> owning agent id.
    routes: BTreeMap<String, String>,
    policy: FixPolicy,
    history: Vec<FixResult>,
    pending: Vec<FixRequest>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store)
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("routes", &self.routes)
            .field("policy", &self.policy)
            .field("history", &self.history.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Orchestrator {
    pub fn new(store: TokenStore) -> Self {
        let mut routes = BTreeMap::new();
        let tokens = TokenAgent;
        for key in tokens.routing_keys() {
            routes.insert(key.to_string(), agent_ids::TOKENS.to_string());
        }
        let mut agents: BTreeMap<String, Box<dyn Agent>> = BTreeMap::new();
        agents.insert(agent_ids::TOKENS.to_string(), Box::new(tokens));

        Self {
            store,
            agents,
            routes,
            policy: FixPolicy::default(),
            history: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: FixPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Re-read the token source. Collaborator state is untouched.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        self.store.load()
    }

    pub fn history(&self) -> &[FixResult] {
        &self.history
    }

    /// Requests skipped by the most recent applying batch.
    pub fn pending(&self) -> &[FixRequest] {
        &self.pending
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Agent that owns `fix_type`, if any.
    pub fn owner_of(&self, fix_type: &str) -> Option<&str> {
        self.routes.get(fix_type).map(String::as_str)
    }

    /// Register `agent` under `id`.
    ///
    /// Re-registering an id replaces the previous agent and its routing keys. Claiming a key
    /// owned by a different id fails and leaves the registry unchanged.
    pub fn register_agent(
        &mut self,
        id: impl Into<String>,
        agent: Box<dyn Agent>,
    ) -> Result<(), RouteError> {
        let id = id.into();
        for key in agent.routing_keys() {
            if let Some(owner) = self.routes.get(*key)
                && *owner != id
            {
                return Err(RouteError::OwnershipConflict {
                    key: key.to_string(),
                    owner: owner.clone(),
                    claimant: id,
                });
            }
        }

        if self.agents.contains_key(&id) {
            warn!(agent = %id, "replacing registered agent");
            self.routes.retain(|_, owner| *owner != id);
        }
        for key in agent.routing_keys() {
            self.routes.insert(key.to_string(), id.clone());
        }
        debug!(agent = %id, keys = agent.routing_keys().len(), "registered agent");
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Send one request straight to `agent_id`.
    pub fn route_request(
        &mut self,
        agent_id: &str,
        request: AgentRequest,
    ) -> Result<AgentResponse, RouteError> {
        let agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| RouteError::UnknownTarget {
                target: agent_id.to_string(),
            })?;
        debug!(agent = %agent_id, action = %request.action(), "routing request");
        Ok(agent.handle_request(&mut self.store, request))
    }

    /// Process a batch sequentially, in order.
    ///
    /// Each request ends up in exactly one of `processed`, `skipped` or `failed`. Empty ids are
    /// filled with the deterministic request id and an empty target is resolved through the
    /// routing table.
    pub fn process_fixes(
        &mut self,
        fixes: Vec<FixRequest>,
        options: ProcessOptions,
    ) -> ProcessReport {
        let mut report = ProcessReport::new(options.dry_run);
        let mut preview = options.dry_run.then(|| self.store.clone());
        let mut seen = HashSet::new();

        for mut fix in fixes {
            if fix.target.is_empty()
                && let Some(owner) = self.routes.get(&fix.fix_type)
            {
                fix.target = owner.clone();
            }
            if fix.id.is_empty() {
                fix.id = fix_request_id(&fix).to_string();
            }

            if !seen.insert(fix.id.clone()) {
                report.skipped.push(skip(
                    fix,
                    "duplicate request id in batch".to_string(),
                    skip_tokens::DUPLICATE_REQUEST,
                ));
                continue;
            }

            if options.auto_fix_only && !fix.auto_fixable {
                report.skipped.push(skip(
                    fix,
                    "not auto-fixable".to_string(),
                    skip_tokens::NOT_AUTO_FIXABLE,
                ));
                continue;
            }

            if let Some(block) = self.policy.check(&fix.fix_type) {
                report.skipped.push(skip(fix, block.reason, block.token));
                continue;
            }

            if fix.target.is_empty() {
                let err = RouteError::Unrouted {
                    fix_type: fix.fix_type.clone(),
                };
                self.fail(&mut report, fix, err.to_string(), !options.dry_run);
                continue;
            }

            if !self.agents.contains_key(&fix.target) {
                let err = RouteError::UnknownTarget {
                    target: fix.target.clone(),
                };
                self.fail(&mut report, fix, err.to_string(), !options.dry_run);
                continue;
            }

            if self.routes.get(&fix.fix_type) != Some(&fix.target) {
                let reason = format!("'{}' does not own '{}'", fix.target, fix.fix_type);
                report
                    .skipped
                    .push(skip(fix, reason, skip_tokens::NOT_OWNER));
                continue;
            }

            if let Some(copy) = preview.as_mut() {
                // Token edits are replayed on the copy; other payloads are checked by their owner.
                let checked = if fix.fix.token_path().is_some() {
                    let simulated = copy.apply_fix(&fix);
                    if simulated.success {
                        Ok(())
                    } else {
                        Err(simulated.error.unwrap_or_default())
                    }
                } else {
                    match self.agents.get(&fix.target) {
                        Some(agent) => agent.check_fix(copy, &fix).map_err(|e| format!("{e:#}")),
                        None => Ok(()),
                    }
                };
                if let Err(error) = checked {
                    self.fail(&mut report, fix, error, false);
                    continue;
                }
                report.processed.push(ProcessedFix {
                    result: FixResult::simulated(fix.id.clone()),
                    request: fix,
                });
                continue;
            }

            self.apply_one(&mut report, fix);
        }

        if let Some(copy) = preview {
            report.preview = Some(render_preview(
                &self.store.to_raw_json(),
                &copy.to_raw_json(),
            ));
        } else {
            self.pending = report.skipped.iter().map(|s| s.request.clone()).collect();
        }

        debug!(summary = %report.summary(), "processed fix batch");
        report
    }

    fn apply_one(&mut self, report: &mut ProcessReport, mut fix: FixRequest) {
        let target = fix.target.clone();
        let response = self.route_request(
            &target,
            AgentRequest::ApplyFix {
                fix: Box::new(fix.clone()),
            },
        );

        let outcome = match response {
            Ok(response) => response.into_fix_result(),
            Err(err) => Err(err.to_string()),
        };

        match outcome {
            Ok(result) if result.success => {
                debug!(id = %fix.id, fix_type = %fix.fix_type, "applied fix");
                fix.status = FixStatus::Applied;
                self.history.push(result.clone());
                report.processed.push(ProcessedFix {
                    request: fix,
                    result,
                });
            }
            Ok(result) => {
                let error = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "fix reported failure".to_string());
                fix.status = FixStatus::Failed;
                self.history.push(result);
                warn!(id = %fix.id, error = %error, "fix failed");
                report.failed.push(FailedFix {
                    request: fix,
                    error,
                });
            }
            Err(error) => self.fail(report, fix, error, true),
        }
    }

    /// Record `fix` as failed. `record` also appends it to the history.
    fn fail(
        &mut self,
        report: &mut ProcessReport,
        mut fix: FixRequest,
        error: String,
        record: bool,
    ) {
        warn!(id = %fix.id, target = %fix.target, error = %error, "fix failed");
        if record {
            fix.status = FixStatus::Failed;
            self.history.push(FixResult::failed(fix.id.clone(), error.clone()));
        }
        report.failed.push(FailedFix {
            request: fix,
            error,
        });
    }

    /// Snapshot of the registry and counters. No side effects.
    pub fn system_status(&self) -> SystemStatus {
        let agents = self
            .agents
            .keys()
            .map(|id| AgentStatus {
                id: id.clone(),
                routing_keys: self
                    .routes
                    .iter()
                    .filter(|(_, owner)| *owner == id)
                    .map(|(key, _)| key.clone())
                    .collect(),
            })
            .collect();

        let fixes_applied = self.history.iter().filter(|r| r.success).count() as u64;
        SystemStatus {
            schema: schema::TOKENFIX_STATUS_V1.to_string(),
            agents,
            fix_history: self.history.len() as u64,
            fixes_applied,
            fixes_failed: self.history.len() as u64 - fixes_applied,
            pending_fixes: self.pending.len() as u64,
        }
    }
}

fn skip(request: FixRequest, reason: String, token: &str) -> SkippedFix {
    debug!(id = %request.id, reason = %reason, "skipped fix");
    SkippedFix {
        request,
        reason,
        reason_token: token.to_string(),
    }
}

/// Unified diff between two serialized token trees. Empty when nothing changed.
pub(crate) fn render_preview(old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    let formatter = PatchFormatter::new();
    let patch = diffy::create_patch(old, new);
    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", PREVIEW_PATH));
    out.push_str(&format!("{}", formatter.fmt_patch(&patch)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokenfix_agents::{ElementDescriptor, MarkupAgent};
    use tokenfix_tokens::InMemoryTokenSource;
    use tokenfix_types::fix::{FixPayload, fix_types};
    use tokenfix_types::issue::{Issue, Locator, Severity};

    fn orchestrator() -> Orchestrator {
        let store = TokenStore::open(InMemoryTokenSource::from_tiers([(
            "primitive",
            json!({
                "$type": "color",
                "primitive": { "color": { "blue": "#2563eb", "red": "#dc2626" } }
            }),
        )]))
        .unwrap();
        Orchestrator::new(store)
    }

    fn set(path: &str, value: &str) -> FixRequest {
        FixRequest::new(
            fix_types::TOKEN_UPDATE,
            "tokens",
            Issue::new("token", "t", Severity::Error, Locator::token(path), "m"),
            FixPayload::set_value(path, value),
            "d",
        )
        .auto_fixable(true)
    }

    #[test]
    fn tokens_agent_is_always_registered() {
        let status = orchestrator().system_status();
        assert_eq!(status.agents.len(), 1);
        assert_eq!(status.agents[0].id, "tokens");
        assert_eq!(
            status.agents[0].routing_keys,
            vec![
                "token.contrast",
                "token.create",
                "token.delete",
                "token.update"
            ]
        );
        assert_eq!(status.schema, "tokenfix.status.v1");
    }

    #[test]
    fn reregistering_an_id_replaces_it() {
        let mut orch = orchestrator();
        orch.register_agent("markup", Box::new(MarkupAgent::new(vec![])))
            .unwrap();
        orch.register_agent("markup", Box::new(MarkupAgent::new(vec![])))
            .unwrap();
        assert_eq!(orch.agent_ids().collect::<Vec<_>>(), vec!["markup", "tokens"]);
        assert_eq!(orch.owner_of("aria.set_attribute"), Some("markup"));
    }

    #[test]
    fn conflict_leaves_registry_unchanged() {
        let mut orch = orchestrator();
        let before = orch.system_status().agents;
        let err = orch
            .register_agent("tokens-2", Box::new(TokenAgent))
            .unwrap_err();
        assert!(err.is_ownership_conflict());
        assert_eq!(orch.system_status().agents, before);
    }

    #[test]
    fn route_to_unknown_agent_fails() {
        let mut orch = orchestrator();
        let err = orch
            .route_request("nobody", AgentRequest::Detect)
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::UnknownTarget {
                target: "nobody".to_string()
            }
        );
    }

    #[test]
    fn batch_partitions_in_order() {
        let mut orch =
            orchestrator().with_policy(FixPolicy::new(vec![], vec!["token.delete".into()]));
        orch.register_agent("markup", Box::new(MarkupAgent::new(vec![])))
            .unwrap();

        let applied = set("primitive.color.blue", "#1d4ed8");
        let manual = set("primitive.color.red", "#b91c1c").auto_fixable(false);
        let duplicate = applied.clone();
        let mut misrouted = set("primitive.color.red", "#000");
        misrouted.target = "markup".to_string();
        let mut unknown = set("primitive.color.red", "#111");
        unknown.target = "nobody".to_string();
        let mut denied = set("primitive.color.red", "#222");
        denied.fix_type = fix_types::TOKEN_DELETE.to_string();

        let report = orch.process_fixes(
            vec![applied, manual, duplicate, misrouted, unknown, denied],
            ProcessOptions {
                auto_fix_only: true,
                dry_run: false,
            },
        );

        assert_eq!(report.processed.len(), 1);
        let tokens: Vec<&str> = report
            .skipped
            .iter()
            .map(|s| s.reason_token.as_str())
            .collect();
        assert_eq!(
            tokens,
            vec![
                skip_tokens::NOT_AUTO_FIXABLE,
                skip_tokens::DUPLICATE_REQUEST,
                skip_tokens::NOT_OWNER,
                skip_tokens::DENYLIST,
            ]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].error, "unknown target 'nobody'");
        assert_eq!(report.processed[0].request.status, FixStatus::Applied);

        let status = orch.system_status();
        assert_eq!(status.fix_history, 2);
        assert_eq!(status.fixes_applied, 1);
        assert_eq!(status.fixes_failed, 1);
        assert_eq!(status.pending_fixes, 4);
        assert_eq!(
            orch.store()
                .get("primitive.color.blue")
                .unwrap()
                .unwrap()
                .resolved_value,
            "#1d4ed8"
        );
    }

    #[test]
    fn empty_target_is_resolved_by_routing_key() {
        let mut orch = orchestrator();
        let mut fix = set("primitive.color.blue", "#000000");
        fix.target = String::new();
        let report = orch.process_fixes(vec![fix], ProcessOptions::default());
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].request.target, "tokens");
        assert!(!report.processed[0].request.id.is_empty());
    }

    #[test]
    fn unrouted_fix_type_fails() {
        let mut orch = orchestrator();
        let mut fix = set("primitive.color.blue", "#000000");
        fix.target = String::new();
        fix.fix_type = "aria.set_attribute".to_string();
        let report = orch.process_fixes(vec![fix], ProcessOptions::default());
        assert_eq!(
            report.failed[0].error,
            "no collaborator owns fix type 'aria.set_attribute'"
        );
    }

    #[test]
    fn dry_run_previews_without_mutating() {
        let mut orch = orchestrator();
        let before = orch.store().fingerprint();
        let report = orch.process_fixes(
            vec![set("primitive.color.blue", "#1d4ed8")],
            ProcessOptions {
                auto_fix_only: false,
                dry_run: true,
            },
        );

        assert_eq!(orch.store().fingerprint(), before);
        assert_eq!(report.applied_count(), 0);
        assert!(report.processed[0].result.changes.is_none());
        let preview = report.preview.unwrap();
        assert!(preview.starts_with("diff --git a/tokens.json b/tokens.json\n"));
        assert!(preview.contains("-    \"value\": \"#2563eb\""));
        assert!(preview.contains("+    \"value\": \"#1d4ed8\""));
        assert_eq!(orch.system_status().fix_history, 0);
    }

    #[test]
    fn dry_run_reports_token_fixes_that_would_fail() {
        let mut orch = orchestrator();
        let report = orch.process_fixes(
            vec![set("primitive.color.green", "#16a34a")],
            ProcessOptions {
                auto_fix_only: false,
                dry_run: true,
            },
        );
        assert!(report.processed.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.preview.as_deref(), Some(""));
    }

    #[test]
    fn markup_fix_routes_to_markup_agent() {
        let mut orch = orchestrator();
        let element = ElementDescriptor::new("#logo", "img");
        orch.register_agent("markup", Box::new(MarkupAgent::new(vec![element])))
            .unwrap();

        let fix = FixRequest::new(
            fix_types::ARIA_SET_ATTRIBUTE,
            "",
            Issue::new("markup", "m", Severity::Error, Locator::element("#logo"), "m"),
            FixPayload::Transform {
                rule_id: "set_attribute".to_string(),
                args: Some(json!({ "selector": "#logo", "name": "alt", "value": "Logo" })),
            },
            "d",
        );
        let report = orch.process_fixes(vec![fix], ProcessOptions::default());
        assert_eq!(report.processed.len(), 1, "{:?}", report.failed);
        assert_eq!(report.processed[0].request.target, "markup");
    }

    #[test]
    fn dry_run_and_real_run_agree_on_non_token_payloads() {
        let batch = || {
            let transform = |fix_type: &str, target: &str, rule_id: &str, args| {
                FixRequest::new(
                    fix_type,
                    target,
                    Issue::new("t", "t", Severity::Error, Locator::element("#logo"), "m"),
                    FixPayload::Transform {
                        rule_id: rule_id.to_string(),
                        args: Some(args),
                    },
                    "d",
                )
            };
            vec![
                transform(
                    fix_types::TOKEN_CONTRAST,
                    "tokens",
                    "pick_color",
                    json!({ "foreground": "primitive.color.red" }),
                ),
                transform(
                    fix_types::ARIA_REMOVE_ATTRIBUTE,
                    "",
                    "remove_attribute",
                    json!({ "selector": "#logo", "name": "role" }),
                ),
                transform(
                    fix_types::ARIA_SET_ATTRIBUTE,
                    "",
                    "set_attribute",
                    json!({ "selector": "#logo", "name": "alt", "value": "Logo" }),
                ),
            ]
        };
        let partition = |dry_run: bool| {
            let mut orch = orchestrator();
            let element = ElementDescriptor::new("#logo", "img");
            orch.register_agent("markup", Box::new(MarkupAgent::new(vec![element])))
                .unwrap();
            let report = orch.process_fixes(
                batch(),
                ProcessOptions {
                    auto_fix_only: false,
                    dry_run,
                },
            );
            let processed: Vec<String> = report
                .processed
                .iter()
                .map(|p| p.request.fix_type.clone())
                .collect();
            let failed: Vec<(String, String)> = report
                .failed
                .iter()
                .map(|f| (f.request.fix_type.clone(), f.error.clone()))
                .collect();
            (processed, failed)
        };

        let dry = partition(true);
        assert_eq!(dry, partition(false));
        assert_eq!(dry.0, vec!["aria.set_attribute"]);
        assert_eq!(
            dry.1,
            vec![
                (
                    "token.contrast".to_string(),
                    "unsupported fix 'token.contrast' for the token store".to_string()
                ),
                (
                    "aria.remove_attribute".to_string(),
                    "'#logo' has no 'role' attribute".to_string()
                ),
            ]
        );
    }
}
