//! Validator collaborators.
//!
//! Every collaborator implements [`Agent`]: it detects issues in its domain, proposes fix
//! requests, and applies the requests it owns. The orchestrator talks to all of them through
//! [`Agent::handle_request`] only.

mod agent;
mod contrast;
mod conventions;
mod markup;
mod motion;
mod tokens;

pub use agent::Agent;
pub use contrast::{ContrastAgent, ContrastMeasurement, ContrastOracle, ContrastPair, ContrastTable};
pub use conventions::ConventionAgent;
pub use markup::{ElementDescriptor, MarkupAgent, load_elements};
pub use motion::{MotionAgent, parse_duration_ms};
pub use tokens::TokenAgent;

/// Ids the built-in collaborators register under.
pub mod agent_ids {
    pub const TOKENS: &str = "tokens";
    pub const CONTRAST: &str = "contrast";
    pub const MOTION: &str = "motion";
    pub const MARKUP: &str = "markup";
    pub const CONVENTIONS: &str = "conventions";
}

/// Citation strings attached to issues.
pub mod citations {
    pub const NON_TEXT_CONTENT: &str = "WCAG 2.1 SC 1.1.1";
    pub const CONTRAST_MINIMUM: &str = "WCAG 2.1 SC 1.4.3";
    pub const ANIMATION_FROM_INTERACTIONS: &str = "WCAG 2.1 SC 2.3.3";
    pub const NAME_ROLE_VALUE: &str = "WCAG 2.1 SC 4.1.2";
}
