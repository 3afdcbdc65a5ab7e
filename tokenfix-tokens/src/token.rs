use serde::{Deserialize, Serialize};

/// A stored token: the raw value exactly as defined, plus optional metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            token_type: None,
            description: None,
        }
    }

    pub fn with_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }
}

/// Optional metadata accompanying [`crate::TokenStore::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMeta {
    pub token_type: Option<String>,
    pub description: Option<String>,
}

impl TokenMeta {
    pub fn typed(token_type: impl Into<String>) -> Self {
        Self {
            token_type: Some(token_type.into()),
            description: None,
        }
    }
}

/// A token view with references substituted. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedToken {
    pub path: String,
    pub raw_value: String,
    pub resolved_value: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Paths visited while resolving, in visit order, without the starting path.
    #[serde(default)]
    pub reference_chain: Vec<String>,
}
