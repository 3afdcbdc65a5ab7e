//! Structural checks over the whole tree.

use crate::error::ResolveError;
use crate::reference::{is_valid_path, references};
use crate::store::TokenStore;
use crate::value::infer_type;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tokenfix_types::issue::Severity;

/// Stable codes for structural issues.
pub mod codes {
    pub const UNRESOLVED_REFERENCE: &str = "reference.unresolved";
    pub const CIRCULAR_REFERENCE: &str = "reference.circular";
    pub const DEPTH_EXCEEDED: &str = "reference.depth";
    pub const MISSING_TYPE: &str = "type.missing";
    pub const AMBIGUOUS_TYPE: &str = "type.ambiguous";
    pub const DUPLICATE_KEY: &str = "key.duplicate_like";
    pub const INVALID_PATH: &str = "path.invalid";
    pub const NESTED_TOKEN: &str = "path.nested_under_token";
    pub const OVERRIDDEN: &str = "definition.overridden";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureIssue {
    pub path: String,
    pub error: String,
    pub severity: Severity,
    pub code: String,
}

impl StructureIssue {
    fn new(
        path: impl Into<String>,
        code: &str,
        severity: Severity,
        error: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            error: error.into(),
            severity,
            code: code.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureReport {
    /// False iff any issue has error severity.
    pub valid: bool,
    pub issues: Vec<StructureIssue>,
}

impl StructureReport {
    fn from_issues(mut issues: Vec<StructureIssue>) -> Self {
        issues.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.code.cmp(&b.code))
                .then_with(|| a.error.cmp(&b.error))
        });
        let valid = !issues.iter().any(|i| i.severity == Severity::Error);
        Self { valid, issues }
    }

    pub fn errors(&self) -> impl Iterator<Item = &StructureIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }
}

impl TokenStore {
    /// Check references, types, key hygiene and load overrides. Never fails; problems are data.
    pub fn validate(&self) -> StructureReport {
        let mut issues = Vec::new();

        for (path, token) in self.tokens() {
            if !is_valid_path(path) {
                issues.push(StructureIssue::new(
                    path,
                    codes::INVALID_PATH,
                    Severity::Warning,
                    format!("'{path}' is not a referenceable path"),
                ));
            }

            if let Err(err) = self.get(path) {
                issues.push(reference_issue(path, &err));
            }

            if token.token_type.is_none() && references(&token.value).is_empty() {
                issues.push(match infer_type(&token.value) {
                    Some(kind) => StructureIssue::new(
                        path,
                        codes::MISSING_TYPE,
                        Severity::Info,
                        format!("missing $type; value looks like {kind}"),
                    ),
                    None => StructureIssue::new(
                        path,
                        codes::AMBIGUOUS_TYPE,
                        Severity::Warning,
                        format!("missing $type and '{}' does not identify one", token.value),
                    ),
                });
            }
        }

        issues.extend(nested_tokens(self));
        issues.extend(duplicate_like_keys(self));

        for o in self.overrides() {
            issues.push(StructureIssue::new(
                &o.path,
                codes::OVERRIDDEN,
                Severity::Warning,
                format!("defined in {} and overridden by {}", o.previous, o.document),
            ));
        }

        StructureReport::from_issues(issues)
    }
}

fn reference_issue(path: &str, err: &ResolveError) -> StructureIssue {
    let code = match err {
        ResolveError::CircularReference { .. } => codes::CIRCULAR_REFERENCE,
        ResolveError::UnresolvedReference { .. } => codes::UNRESOLVED_REFERENCE,
        ResolveError::DepthExceeded { .. } => codes::DEPTH_EXCEEDED,
    };
    StructureIssue::new(path, code, Severity::Error, err.to_string())
}

/// Tokens that sit below another token, which can only come from merged documents.
fn nested_tokens(store: &TokenStore) -> Vec<StructureIssue> {
    store
        .paths()
        .filter_map(|path| {
            path.match_indices('.')
                .map(|(i, _)| &path[..i])
                .find(|parent| store.contains(parent))
                .map(|parent| {
                    StructureIssue::new(
                        path,
                        codes::NESTED_TOKEN,
                        Severity::Error,
                        format!("'{path}' is nested under token '{parent}'"),
                    )
                })
        })
        .collect()
}

/// Sibling keys that differ only by case, `-` or `_`. The first key in tree order is kept as
/// the reference; every later look-alike is reported.
fn duplicate_like_keys(store: &TokenStore) -> Vec<StructureIssue> {
    let mut nodes: BTreeSet<&str> = BTreeSet::new();
    for path in store.paths() {
        nodes.insert(path);
        for (i, _) in path.match_indices('.') {
            nodes.insert(&path[..i]);
        }
    }

    let mut by_shape: BTreeMap<(String, String), Vec<&str>> = BTreeMap::new();
    for node in nodes {
        let (parent, key) = node.rsplit_once('.').unwrap_or(("", node));
        by_shape
            .entry((parent.to_string(), normalize_key(key)))
            .or_default()
            .push(node);
    }

    let mut out = Vec::new();
    for group in by_shape.values() {
        if let [first, rest @ ..] = group.as_slice() {
            for dup in rest {
                out.push(StructureIssue::new(
                    *dup,
                    codes::DUPLICATE_KEY,
                    Severity::Warning,
                    format!("'{dup}' looks like a duplicate of '{first}'"),
                ));
            }
        }
    }
    out
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
