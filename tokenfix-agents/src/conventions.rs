use crate::agent::Agent;
use std::collections::BTreeMap;
use tokenfix_tokens::{TokenStore, references};
use tokenfix_types::fix::{FixPayload, FixRequest, FixResult, fix_types};
use tokenfix_types::issue::{Issue, Locator, Severity, domains};

/// Naming and layering conventions for token paths.
#[derive(Debug, Clone)]
pub struct ConventionAgent {
    /// Allowed first segments. The first entry is the primitive tier.
    tiers: Vec<String>,
}

impl Default for ConventionAgent {
    fn default() -> Self {
        Self::new(
            ["primitive", "semantic", "component"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }
}

impl ConventionAgent {
    pub const SEGMENT_CASE: &'static str = "convention.segment_case";
    pub const UNKNOWN_TIER: &'static str = "convention.unknown_tier";
    pub const LITERAL_MATCHES_PRIMITIVE: &'static str = "convention.literal_matches_primitive";

    pub fn new(tiers: Vec<String>) -> Self {
        Self { tiers }
    }

    /// Primitive paths by normalized literal value.
    fn primitives_by_value<'a>(&self, store: &'a TokenStore) -> BTreeMap<String, Vec<&'a str>> {
        let mut out: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        let Some(primitive) = self.tiers.first() else {
            return out;
        };
        for (path, token) in store.tokens() {
            if first_segment(path) == primitive && references(&token.value).is_empty() {
                out.entry(normalize_value(&token.value))
                    .or_default()
                    .push(path);
            }
        }
        out
    }

    /// The one primitive whose literal equals `path`'s literal value.
    fn matching_primitive<'a>(
        &self,
        store: &'a TokenStore,
        primitives: &BTreeMap<String, Vec<&'a str>>,
        path: &str,
    ) -> Option<&'a str> {
        if !self.tiers.iter().skip(1).any(|t| t == first_segment(path)) {
            return None;
        }
        let token = store.token(path)?;
        if !references(&token.value).is_empty() {
            return None;
        }
        match primitives.get(&normalize_value(&token.value))?.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

impl Agent for ConventionAgent {
    fn routing_keys(&self) -> &[&'static str] {
        &[]
    }

    fn detect(&self, store: &TokenStore) -> anyhow::Result<Vec<Issue>> {
        let primitives = self.primitives_by_value(store);
        let mut out = Vec::new();

        for path in store.paths() {
            let bad: Vec<&str> = path.split('.').filter(|s| !is_kebab_segment(s)).collect();
            if !bad.is_empty() {
                out.push(Issue::new(
                    domains::CONVENTION,
                    Self::SEGMENT_CASE,
                    Severity::Warning,
                    Locator::token(path),
                    format!(
                        "segments {} are not lowercase kebab-case",
                        bad.iter()
                            .map(|s| format!("'{s}'"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ));
            }

            let tier = first_segment(path);
            if !self.tiers.iter().any(|t| t == tier) {
                out.push(Issue::new(
                    domains::CONVENTION,
                    Self::UNKNOWN_TIER,
                    Severity::Warning,
                    Locator::token(path),
                    format!(
                        "'{tier}' is not a configured tier ({})",
                        self.tiers.join(", ")
                    ),
                ));
            }

            if let Some(primitive) = self.matching_primitive(store, &primitives, path) {
                out.push(
                    Issue::new(
                        domains::CONVENTION,
                        Self::LITERAL_MATCHES_PRIMITIVE,
                        Severity::Info,
                        Locator::token(path),
                        format!("literal value duplicates primitive '{primitive}'"),
                    )
                    .with_suggestion(format!("reference {{{primitive}}}")),
                );
            }
        }
        Ok(out)
    }

    fn suggest_fixes(
        &self,
        store: &TokenStore,
        issues: &[Issue],
    ) -> anyhow::Result<Vec<FixRequest>> {
        let primitives = self.primitives_by_value(store);
        Ok(issues
            .iter()
            .filter(|i| i.code == Self::LITERAL_MATCHES_PRIMITIVE)
            .filter_map(|issue| {
                let path = issue.locator.token_path()?;
                let primitive = self.matching_primitive(store, &primitives, path)?;
                Some(
                    FixRequest::new(
                        fix_types::TOKEN_UPDATE,
                        crate::agent_ids::TOKENS,
                        issue.clone(),
                        FixPayload::set_value(path, format!("{{{primitive}}}")),
                        format!("reference {primitive} from {path}"),
                    )
                    .auto_fixable(true),
                )
            })
            .collect())
    }

    fn apply_fix(
        &mut self,
        _store: &mut TokenStore,
        fix: &FixRequest,
    ) -> anyhow::Result<FixResult> {
        anyhow::bail!("conventions does not apply fixes; '{}' belongs to tokens", fix.fix_type)
    }
}

fn first_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// `blue`, `500`, `primary-hover`; not `Blue`, `primary_hover` or `a--b`.
fn is_kebab_segment(segment: &str) -> bool {
    segment.split('-').all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    })
}

fn normalize_value(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokenfix_tokens::InMemoryTokenSource;

    fn store(doc: serde_json::Value) -> TokenStore {
        TokenStore::open(InMemoryTokenSource::from_tiers([("all", doc)])).unwrap()
    }

    fn codes(issues: &[Issue]) -> Vec<(String, String)> {
        issues
            .iter()
            .map(|i| (i.locator.to_string(), i.code.clone()))
            .collect()
    }

    #[test]
    fn kebab_segments() {
        assert!(is_kebab_segment("primary-hover"));
        assert!(is_kebab_segment("500"));
        assert!(!is_kebab_segment("Primary"));
        assert!(!is_kebab_segment("primary_hover"));
        assert!(!is_kebab_segment("a--b"));
        assert!(!is_kebab_segment("-a"));
    }

    #[test]
    fn naming_and_tier_rules() {
        let store = store(json!({
            "$type": "color",
            "primitive": { "color": { "Blue_500": "#2563eb" } },
            "brand": { "accent": "#ff0000" }
        }));
        let issues = ConventionAgent::default().detect(&store).unwrap();
        assert_eq!(
            codes(&issues),
            vec![
                (
                    "brand.accent".to_string(),
                    ConventionAgent::UNKNOWN_TIER.to_string()
                ),
                (
                    "primitive.color.Blue_500".to_string(),
                    ConventionAgent::SEGMENT_CASE.to_string()
                ),
            ]
        );
        assert_eq!(
            issues[1].message,
            "segments 'Blue_500' are not lowercase kebab-case"
        );
    }

    #[test]
    fn semantic_literal_is_rewritten_to_unique_primitive() {
        let mut store = store(json!({
            "$type": "color",
            "primitive": { "color": { "blue": { "500": "#2563EB" }, "white": "#fff", "snow": "#fff" } },
            "semantic": { "link": "#2563eb", "surface": "#FFF" }
        }));
        let agent = ConventionAgent::default();
        let issues: Vec<Issue> = agent
            .detect(&store)
            .unwrap()
            .into_iter()
            .filter(|i| i.code == ConventionAgent::LITERAL_MATCHES_PRIMITIVE)
            .collect();
        assert_eq!(
            codes(&issues),
            vec![(
                "semantic.link".to_string(),
                ConventionAgent::LITERAL_MATCHES_PRIMITIVE.to_string()
            )]
        );

        let fixes = agent.suggest_fixes(&store, &issues).unwrap();
        assert_eq!(
            fixes[0].fix,
            FixPayload::set_value("semantic.link", "{primitive.color.blue.500}")
        );
        assert!(store.apply_fix(&fixes[0]).success);
        assert_eq!(
            store.get("semantic.link").unwrap().unwrap().resolved_value,
            "#2563EB"
        );
        assert!(agent.detect(&store).unwrap().is_empty());
    }
}
