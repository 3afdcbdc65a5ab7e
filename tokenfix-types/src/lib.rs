//! Shared DTOs (contract-as-code) for the tokenfix workspace.
//!
//! Every collaborator, the token store and the orchestrator exchange these shapes and nothing
//! else.
//!
//! # Design constraints
//! - Plain data only. Behaviour lives in the crates that produce or consume these types.
//! - Everything is serde-serialisable so hosts can marshal it over their own transports.
//! - Prefer adding optional fields over changing semantics.

pub mod cycle;
pub mod envelope;
pub mod fix;
pub mod issue;

/// Schema identifiers.
pub mod schema {
    pub const TOKENFIX_CYCLE_V1: &str = "tokenfix.cycle.v1";
    pub const TOKENFIX_PROCESS_V1: &str = "tokenfix.process.v1";
    pub const TOKENFIX_STATUS_V1: &str = "tokenfix.status.v1";
}
