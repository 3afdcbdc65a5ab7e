use crate::agent::Agent;
use anyhow::Context;
use serde_json::Value;
use tokenfix_tokens::{StructureIssue, TokenStore, codes, infer_type, references};
use tokenfix_types::fix::{FixPayload, FixRequest, FixResult, fix_types};
use tokenfix_types::issue::{Issue, Locator, domains};

/// Structural validation of the token tree. Owns every `token.*` fix type and applies them
/// through [`TokenStore::apply_fix`].
#[derive(Debug, Default)]
pub struct TokenAgent;

impl TokenAgent {
    const ROUTING_KEYS: &'static [&'static str] = &[
        fix_types::TOKEN_UPDATE,
        fix_types::TOKEN_CREATE,
        fix_types::TOKEN_DELETE,
        fix_types::TOKEN_CONTRAST,
    ];

    fn to_issue(store: &TokenStore, s: StructureIssue) -> Issue {
        let suggestion = match s.code.as_str() {
            codes::MISSING_TYPE => store
                .token(&s.path)
                .and_then(|t| infer_type(&t.value))
                .map(|kind| format!("set $type to \"{kind}\"")),
            codes::UNRESOLVED_REFERENCE => Self::reference_rewrite(store, &s.path)
                .map(|(from, to)| format!("replace {{{from}}} with {{{to}}}")),
            _ => None,
        };

        let issue = Issue::new(
            domains::TOKEN,
            s.code,
            s.severity,
            Locator::token(s.path),
            s.error,
        );
        match suggestion {
            Some(text) => issue.with_suggestion(text),
            None => issue,
        }
    }

    /// The first dangling reference in `path`'s own value that names an existing token up to
    /// case and separators, with that token's path.
    fn reference_rewrite(store: &TokenStore, path: &str) -> Option<(String, String)> {
        let token = store.token(path)?;
        references(&token.value)
            .into_iter()
            .filter(|r| !store.contains(r))
            .find_map(|missing| {
                let wanted = loose_path(missing);
                let mut matches = store.paths().filter(|p| loose_path(p) == wanted);
                match (matches.next(), matches.next()) {
                    (Some(found), None) => Some((missing.to_string(), found.to_string())),
                    _ => None,
                }
            })
    }

    fn suggest_one(store: &TokenStore, issue: &Issue) -> Option<FixRequest> {
        let path = issue.locator.token_path()?;
        let token = store.token(path)?;

        match issue.code.as_str() {
            codes::MISSING_TYPE => {
                let kind = infer_type(&token.value)?;
                let payload = FixPayload::TokenSet {
                    path: path.to_string(),
                    value: token.value.clone(),
                    token_type: Some(kind.to_string()),
                    description: None,
                };
                Some(
                    FixRequest::new(
                        fix_types::TOKEN_UPDATE,
                        crate::agent_ids::TOKENS,
                        issue.clone(),
                        payload,
                        format!("set $type of {path} to {kind}"),
                    )
                    .auto_fixable(true),
                )
            }
            codes::UNRESOLVED_REFERENCE => {
                let (from, to) = Self::reference_rewrite(store, path)?;
                let value = token
                    .value
                    .replace(&format!("{{{from}}}"), &format!("{{{to}}}"));
                Some(
                    FixRequest::new(
                        fix_types::TOKEN_UPDATE,
                        crate::agent_ids::TOKENS,
                        issue.clone(),
                        FixPayload::set_value(path, value),
                        format!("point {path} at {to} instead of {from}"),
                    )
                    .auto_fixable(true),
                )
            }
            _ => None,
        }
    }
}

impl Agent for TokenAgent {
    fn routing_keys(&self) -> &[&'static str] {
        Self::ROUTING_KEYS
    }

    fn detect(&self, store: &TokenStore) -> anyhow::Result<Vec<Issue>> {
        Ok(store
            .validate()
            .issues
            .into_iter()
            .map(|s| Self::to_issue(store, s))
            .collect())
    }

    fn suggest_fixes(
        &self,
        store: &TokenStore,
        issues: &[Issue],
    ) -> anyhow::Result<Vec<FixRequest>> {
        Ok(issues
            .iter()
            .filter_map(|issue| Self::suggest_one(store, issue))
            .collect())
    }

    fn apply_fix(
        &mut self,
        store: &mut TokenStore,
        fix: &FixRequest,
    ) -> anyhow::Result<FixResult> {
        Ok(store.apply_fix(fix))
    }

    fn check_fix(&self, store: &TokenStore, fix: &FixRequest) -> anyhow::Result<()> {
        let result = store.clone().apply_fix(fix);
        if !result.success {
            anyhow::bail!(result.error.unwrap_or_else(|| "fix reported failure".to_string()));
        }
        Ok(())
    }

    fn custom(
        &mut self,
        store: &mut TokenStore,
        name: &str,
        _params: &Value,
    ) -> anyhow::Result<Value> {
        match name {
            "css" => Ok(Value::String(store.to_css().context("export css")?)),
            "flat_json" => store.to_flat_json().context("export flat json"),
            "fingerprint" => Ok(Value::String(store.fingerprint())),
            other => anyhow::bail!("unsupported action '{other}'"),
        }
    }
}

/// Lowercase, with `-` and `_` dropped from every segment.
fn loose_path(path: &str) -> String {
    path.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
