use crate::agent::Agent;
use crate::citations;
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use tokenfix_tokens::TokenStore;
use tokenfix_types::fix::{FixPayload, FixRequest, FixResult, fix_types};
use tokenfix_types::issue::{Issue, Locator, Severity, domains};
use tracing::debug;

/// External color math. The agent never computes ratios itself.
pub trait ContrastOracle: Send {
    /// Contrast ratio between two resolved color values, or `None` if unknown.
    fn ratio(&self, foreground: &str, background: &str) -> Option<f64>;

    /// A replacement foreground that reaches `min_ratio` against `background`.
    fn candidate(&self, foreground: &str, background: &str, min_ratio: f64) -> Option<String>;
}

/// One foreground/background token pair to check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastPair {
    pub foreground: String,
    pub background: String,
    #[serde(default = "default_min_ratio")]
    pub min_ratio: f64,
}

fn default_min_ratio() -> f64 {
    4.5
}

/// A ratio measured by an external tool for a pair of color values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContrastMeasurement {
    pub foreground: String,
    pub background: String,
    pub ratio: f64,

    /// A foreground color the tool found that passes.
    #[serde(default)]
    pub candidate: Option<String>,
}

/// Oracle backed by precomputed measurements, matched case-insensitively on color values.
#[derive(Debug, Clone, Default)]
pub struct ContrastTable {
    measurements: Vec<ContrastMeasurement>,
}

impl ContrastTable {
    pub fn new(measurements: Vec<ContrastMeasurement>) -> Self {
        Self { measurements }
    }

    /// Read a JSON array of measurements.
    pub fn load(path: &Utf8Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("read {path}"))?;
        let measurements: Vec<ContrastMeasurement> = serde_json::from_str(&text)
            .with_context(|| format!("parse contrast measurements {path}"))?;
        debug!(path = %path, count = measurements.len(), "loaded contrast measurements");
        Ok(Self::new(measurements))
    }

    fn find(&self, foreground: &str, background: &str) -> Option<&ContrastMeasurement> {
        self.measurements.iter().find(|m| {
            m.foreground.eq_ignore_ascii_case(foreground)
                && m.background.eq_ignore_ascii_case(background)
        })
    }
}

impl ContrastOracle for ContrastTable {
    fn ratio(&self, foreground: &str, background: &str) -> Option<f64> {
        self.find(foreground, background).map(|m| m.ratio)
    }

    fn candidate(&self, foreground: &str, background: &str, _min_ratio: f64) -> Option<String> {
        self.find(foreground, background)
            .and_then(|m| m.candidate.clone())
    }
}

/// Minimum contrast between configured token pairs.
pub struct ContrastAgent {
    pairs: Vec<ContrastPair>,
    oracle: Box<dyn ContrastOracle>,
}

impl ContrastAgent {
    pub const MIN_RATIO: &'static str = "contrast.min_ratio";
    pub const UNMEASURED: &'static str = "contrast.unmeasured";
    pub const UNKNOWN_TOKEN: &'static str = "contrast.unknown_token";

    pub fn new(pairs: Vec<ContrastPair>, oracle: Box<dyn ContrastOracle>) -> Self {
        Self { pairs, oracle }
    }

    /// Resolved values of a pair, or `None` when either side does not resolve.
    fn resolve_pair(store: &TokenStore, pair: &ContrastPair) -> Option<(String, String)> {
        let fg = store.get(&pair.foreground).ok()??;
        let bg = store.get(&pair.background).ok()??;
        Some((fg.resolved_value, bg.resolved_value))
    }

    fn check_pair(&self, store: &TokenStore, pair: &ContrastPair) -> Option<Issue> {
        for path in [&pair.foreground, &pair.background] {
            if !store.contains(path) {
                return Some(Issue::new(
                    domains::CONTRAST,
                    Self::UNKNOWN_TOKEN,
                    Severity::Warning,
                    Locator::token(path.as_str()),
                    format!("contrast pair names missing token '{path}'"),
                ));
            }
        }

        // Reference problems are reported by the tokens collaborator.
        let (fg, bg) = Self::resolve_pair(store, pair)?;
        let locator = Locator::token(pair.foreground.as_str());

        let Some(ratio) = self.oracle.ratio(&fg, &bg) else {
            return Some(Issue::new(
                domains::CONTRAST,
                Self::UNMEASURED,
                Severity::Warning,
                locator,
                format!("no contrast measurement for {fg} on {bg}"),
            ));
        };

        if ratio >= pair.min_ratio {
            return None;
        }
        Some(
            Issue::new(
                domains::CONTRAST,
                Self::MIN_RATIO,
                Severity::Error,
                locator,
                format!(
                    "contrast {ratio:.2}:1 between {} and {} is below {}:1",
                    pair.foreground, pair.background, pair.min_ratio
                ),
            )
            .with_citation(citations::CONTRAST_MINIMUM)
            .with_suggestion(match self.oracle.candidate(&fg, &bg, pair.min_ratio) {
                Some(color) => format!("switch {} to {color}", pair.foreground),
                None => format!(
                    "choose a color for {} with at least {}:1 against {}",
                    pair.foreground, pair.min_ratio, pair.background
                ),
            }),
        )
    }
}

impl Agent for ContrastAgent {
    fn routing_keys(&self) -> &[&'static str] {
        &[]
    }

    fn detect(&self, store: &TokenStore) -> anyhow::Result<Vec<Issue>> {
        Ok(self
            .pairs
            .iter()
            .filter_map(|pair| self.check_pair(store, pair))
            .collect())
    }

    fn suggest_fixes(
        &self,
        store: &TokenStore,
        issues: &[Issue],
    ) -> anyhow::Result<Vec<FixRequest>> {
        let mut out = Vec::new();
        for issue in issues.iter().filter(|i| i.code == Self::MIN_RATIO) {
            // The pair that raised this exact issue. Pairs sharing a foreground differ in message.
            let Some(pair) = self
                .pairs
                .iter()
                .find(|p| self.check_pair(store, p).as_ref() == Some(issue))
            else {
                continue;
            };
            let Some((fg, bg)) = Self::resolve_pair(store, pair) else {
                continue;
            };
            // Without a candidate the issue's suggestion is all there is; nothing to route.
            let Some(color) = self.oracle.candidate(&fg, &bg, pair.min_ratio) else {
                continue;
            };
            let path = pair.foreground.as_str();
            out.push(
                FixRequest::new(
                    fix_types::TOKEN_CONTRAST,
                    crate::agent_ids::TOKENS,
                    issue.clone(),
                    FixPayload::set_value(path, color.as_str()),
                    format!("raise contrast of {path} against {} with {color}", pair.background),
                )
                .auto_fixable(true),
            );
        }
        Ok(out)
    }

    fn apply_fix(
        &mut self,
        _store: &mut TokenStore,
        fix: &FixRequest,
    ) -> anyhow::Result<FixResult> {
        anyhow::bail!("contrast does not apply fixes; '{}' belongs to tokens", fix.fix_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokenfix_tokens::InMemoryTokenSource;

    fn store() -> TokenStore {
        TokenStore::open(InMemoryTokenSource::from_tiers([(
            "semantic",
            json!({ "$type": "color", "text": "#9ca3af", "surface": "#ffffff" }),
        )]))
        .unwrap()
    }

    fn pair() -> ContrastPair {
        ContrastPair {
            foreground: "text".to_string(),
            background: "surface".to_string(),
            min_ratio: 4.5,
        }
    }

    fn table(candidate: Option<&str>) -> ContrastTable {
        ContrastTable::new(vec![
            ContrastMeasurement {
                foreground: "#9CA3AF".to_string(),
                background: "#FFFFFF".to_string(),
                ratio: 2.54,
                candidate: candidate.map(str::to_string),
            },
            ContrastMeasurement {
                foreground: "#4b5563".to_string(),
                background: "#ffffff".to_string(),
                ratio: 7.56,
                candidate: None,
            },
        ])
    }

    #[test]
    fn low_ratio_is_error_with_citation() {
        let agent = ContrastAgent::new(vec![pair()], Box::new(table(None)));
        let issues = agent.detect(&store()).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ContrastAgent::MIN_RATIO);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].citation.as_deref(), Some("WCAG 2.1 SC 1.4.3"));
        assert_eq!(
            issues[0].message,
            "contrast 2.54:1 between text and surface is below 4.5:1"
        );
    }

    #[test]
    fn candidate_makes_fix_auto_fixable() {
        let agent = ContrastAgent::new(vec![pair()], Box::new(table(Some("#4b5563"))));
        let mut store = store();
        let issues = agent.detect(&store).unwrap();
        let fixes = agent.suggest_fixes(&store, &issues).unwrap();
        assert_eq!(fixes.len(), 1);
        assert!(fixes[0].auto_fixable);
        assert_eq!(fixes[0].fix_type, "token.contrast");
        assert_eq!(fixes[0].target, "tokens");

        assert!(store.apply_fix(&fixes[0]).success);
        assert!(agent.detect(&store).unwrap().is_empty());
    }

    #[test]
    fn no_candidate_leaves_only_a_suggestion() {
        let agent = ContrastAgent::new(vec![pair()], Box::new(table(None)));
        let store = store();
        let issues = agent.detect(&store).unwrap();
        assert_eq!(
            issues[0].suggestion.as_deref(),
            Some("choose a color for text with at least 4.5:1 against surface")
        );
        assert!(agent.suggest_fixes(&store, &issues).unwrap().is_empty());
    }

    #[test]
    fn pairs_sharing_a_foreground_get_one_fix_each() {
        let store = TokenStore::open(InMemoryTokenSource::from_tiers([(
            "semantic",
            json!({
                "$type": "color",
                "text": "#9ca3af",
                "surface": "#ffffff",
                "muted": "#f3f4f6"
            }),
        )]))
        .unwrap();
        let mut on_muted = pair();
        on_muted.background = "muted".to_string();
        let table = ContrastTable::new(vec![
            ContrastMeasurement {
                foreground: "#9ca3af".to_string(),
                background: "#ffffff".to_string(),
                ratio: 2.54,
                candidate: Some("#4b5563".to_string()),
            },
            ContrastMeasurement {
                foreground: "#9ca3af".to_string(),
                background: "#f3f4f6".to_string(),
                ratio: 2.3,
                candidate: Some("#374151".to_string()),
            },
        ]);
        let agent = ContrastAgent::new(vec![pair(), on_muted], Box::new(table));

        let issues = agent.detect(&store).unwrap();
        assert_eq!(issues.len(), 2);
        let fixes = agent.suggest_fixes(&store, &issues).unwrap();
        let values: Vec<_> = fixes
            .iter()
            .map(|f| match &f.fix {
                FixPayload::TokenSet { value, .. } => value.as_str(),
                other => panic!("unexpected payload {other:?}"),
            })
            .collect();
        assert_eq!(values, vec!["#4b5563", "#374151"]);
        assert_eq!(fixes[0].issue, issues[0]);
        assert_eq!(fixes[1].issue, issues[1]);
    }

    #[test]
    fn missing_tokens_and_measurements_are_warnings() {
        let mut missing = pair();
        missing.background = "nope".to_string();
        let agent = ContrastAgent::new(vec![missing], Box::new(ContrastTable::default()));
        let issues = agent.detect(&store()).unwrap();
        assert_eq!(issues[0].code, ContrastAgent::UNKNOWN_TOKEN);

        let agent = ContrastAgent::new(vec![pair()], Box::new(ContrastTable::default()));
        let issues = agent.detect(&store()).unwrap();
        assert_eq!(issues[0].code, ContrastAgent::UNMEASURED);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn table_loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("contrast.json")).unwrap();
        std::fs::write(
            &path,
            r##"[{ "foreground": "#000", "background": "#fff", "ratio": 21.0 }]"##,
        )
        .unwrap();
        let table = ContrastTable::load(&path).unwrap();
        assert_eq!(table.ratio("#000", "#FFF"), Some(21.0));
        assert_eq!(table.candidate("#000", "#fff", 4.5), None);
    }
}
