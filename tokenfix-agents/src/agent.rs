use serde_json::Value;
use tokenfix_tokens::TokenStore;
use tokenfix_types::envelope::{AgentRequest, AgentResponse, ResponseData};
use tokenfix_types::fix::{FixRequest, FixResult};
use tokenfix_types::issue::Issue;
use tracing::warn;

/// A validator collaborator.
///
/// Collaborators read the store freely but write to it only inside [`Agent::apply_fix`].
pub trait Agent: Send {
    /// Fix types this collaborator owns. Two registered collaborators may not share a key.
    fn routing_keys(&self) -> &[&'static str];

    fn detect(&self, store: &TokenStore) -> anyhow::Result<Vec<Issue>>;

    /// Proposals for `issues`, which are issues this collaborator detected.
    fn suggest_fixes(
        &self,
        store: &TokenStore,
        issues: &[Issue],
    ) -> anyhow::Result<Vec<FixRequest>>;

    fn apply_fix(&mut self, store: &mut TokenStore, fix: &FixRequest)
        -> anyhow::Result<FixResult>;

    /// Whether `fix` would apply, without applying it. Dry runs ask this for payloads that
    /// are not replayed on the token store copy.
    fn check_fix(&self, _store: &TokenStore, _fix: &FixRequest) -> anyhow::Result<()> {
        Ok(())
    }

    /// Collaborator-specific actions. None by default.
    fn custom(
        &mut self,
        _store: &mut TokenStore,
        name: &str,
        _params: &Value,
    ) -> anyhow::Result<Value> {
        anyhow::bail!("unsupported action '{name}'")
    }

    /// Single dispatch point. Errors become `success = false` responses.
    fn handle_request(&mut self, store: &mut TokenStore, request: AgentRequest) -> AgentResponse {
        let action = request.action().to_string();
        let result = match request {
            AgentRequest::Detect => self.detect(store).map(ResponseData::Issues),
            AgentRequest::SuggestFixes { issues } => {
                self.suggest_fixes(store, &issues).map(ResponseData::Fixes)
            }
            AgentRequest::ApplyFix { fix } => {
                self.apply_fix(store, &fix).map(ResponseData::FixResult)
            }
            AgentRequest::Custom { name, params } => {
                self.custom(store, &name, &params).map(ResponseData::Value)
            }
        };

        match result {
            Ok(data) => AgentResponse::ok(data),
            Err(err) => {
                warn!(action = %action, error = %err, "agent request failed");
                AgentResponse::failure(format!("{err:#}"))
            }
        }
    }
}
