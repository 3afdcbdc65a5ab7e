use thiserror::Error;

/// Why a token could not be resolved.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("circular reference at '{path}': {}", cycle.join(" -> "))]
    CircularReference { path: String, cycle: Vec<String> },

    #[error("unresolved reference '{{{reference}}}' in '{path}'")]
    UnresolvedReference { path: String, reference: String },

    #[error("reference depth limit {limit} exceeded while resolving '{path}'")]
    DepthExceeded { path: String, limit: usize },
}

impl ResolveError {
    /// The token whose value could not be resolved.
    pub fn path(&self) -> &str {
        match self {
            ResolveError::CircularReference { path, .. }
            | ResolveError::UnresolvedReference { path, .. }
            | ResolveError::DepthExceeded { path, .. } => path,
        }
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, ResolveError::CircularReference { .. })
    }
}

/// Why a write to the store was rejected. The store is untouched when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid token path '{path}'")]
    InvalidPath { path: String },

    #[error("'{path}' is a group; it cannot hold a value")]
    GroupConflict { path: String },

    #[error("'{path}' would be nested under token '{parent}'")]
    NestedUnderToken { path: String, parent: String },
}
