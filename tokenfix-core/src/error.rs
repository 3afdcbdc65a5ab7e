use thiserror::Error;

/// Routing failures. Registration and direct dispatch return these; batch processing records them
/// in the `failed` list instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("unknown target '{target}'")]
    UnknownTarget { target: String },

    #[error("routing key '{key}' is owned by '{owner}', '{claimant}' cannot claim it")]
    OwnershipConflict {
        key: String,
        owner: String,
        claimant: String,
    },

    #[error("no collaborator owns fix type '{fix_type}'")]
    Unrouted { fix_type: String },
}

impl RouteError {
    pub fn is_ownership_conflict(&self) -> bool {
        matches!(self, RouteError::OwnershipConflict { .. })
    }
}
