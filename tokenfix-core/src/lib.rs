//! Embeddable core library for tokenfix.
//!
//! Owns the fix router: a registry of collaborators keyed by id, a routing table from fix type
//! to owning collaborator, batch fix processing, and the bounded fix cycle. Clap-free; hosts
//! build an [`Orchestrator`] from [`EngineSettings`] or register collaborators by hand.
//!
//! # Entry points
//!
//! - [`build_orchestrator`] loads `tokens/` and registers the built-in collaborators
//! - [`Orchestrator::process_fixes`] applies (or previews) one batch of fix requests
//! - [`Orchestrator::run_fix_cycle`] validates and fixes until convergence or the iteration bound

pub mod config;
mod cycle;
mod engine;
mod error;
mod ids;
mod orchestrator;
mod policy;
pub mod settings;

pub use cycle::{Detected, FixCycleOptions};
pub use engine::build_orchestrator;
pub use error::RouteError;
pub use ids::{canonicalize_json, fix_request_id};
pub use orchestrator::{Orchestrator, ProcessOptions};
pub use policy::{FixPolicy, PolicyBlock};
pub use settings::EngineSettings;

// Re-export so embedders don't need the leaf crates directly.
pub use tokenfix_agents::{Agent, agent_ids};
pub use tokenfix_tokens::TokenStore;
