//! Wiring: token source, built-in collaborators and policy.

use crate::orchestrator::Orchestrator;
use crate::settings::EngineSettings;
use anyhow::Context;
use tokenfix_agents::{
    ContrastAgent, ContrastTable, ConventionAgent, MarkupAgent, MotionAgent, agent_ids,
    load_elements,
};
use tokenfix_tokens::{FsTokenSource, TokenStore};
use tracing::info;

/// Load the filesystem token source and register every configured collaborator.
///
/// Conventions and motion are always on. Contrast needs at least one pair and markup needs a
/// descriptor file.
pub fn build_orchestrator(settings: &EngineSettings) -> anyhow::Result<Orchestrator> {
    let tokens_dir = settings.resolve(&settings.tokens_dir);
    let store = TokenStore::open(FsTokenSource::new(tokens_dir.clone()))
        .with_context(|| format!("load tokens from {tokens_dir}"))?;
    info!(dir = %tokens_dir, tokens = store.len(), "loaded token store");

    let mut orch = Orchestrator::new(store).with_policy(settings.policy());

    orch.register_agent(
        agent_ids::CONVENTIONS,
        Box::new(ConventionAgent::new(settings.tiers.clone())),
    )?;
    orch.register_agent(
        agent_ids::MOTION,
        Box::new(MotionAgent::new(settings.max_duration_ms)),
    )?;

    if !settings.contrast_pairs.is_empty() {
        let table = match &settings.contrast_measurements {
            Some(path) => ContrastTable::load(&settings.resolve(path))?,
            None => ContrastTable::default(),
        };
        orch.register_agent(
            agent_ids::CONTRAST,
            Box::new(ContrastAgent::new(
                settings.contrast_pairs.clone(),
                Box::new(table),
            )),
        )?;
    }

    if let Some(file) = &settings.markup_file {
        let elements = load_elements(&settings.resolve(file))?;
        orch.register_agent(agent_ids::MARKUP, Box::new(MarkupAgent::new(elements)))?;
    }

    Ok(orch)
}
