use crate::agent::Agent;
use crate::citations;
use tokenfix_tokens::{Token, TokenStore, infer_type, references, split_number_unit};
use tokenfix_types::fix::{FixPayload, FixRequest, FixResult, fix_types};
use tokenfix_types::issue::{Issue, Locator, Severity, domains};

/// Parse `250ms`, `0.3s` or a bare millisecond count.
pub fn parse_duration_ms(value: &str) -> Option<f64> {
    match split_number_unit(value)? {
        (n, "ms" | "") => Some(n),
        (n, "s") => Some(n * 1000.0),
        _ => None,
    }
}

/// Caps animation durations.
#[derive(Debug, Clone)]
pub struct MotionAgent {
    max_duration_ms: u64,
}

impl Default for MotionAgent {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DURATION_MS)
    }
}

impl MotionAgent {
    pub const DEFAULT_MAX_DURATION_MS: u64 = 500;
    pub const TOO_LONG: &'static str = "motion.duration_exceeds_max";
    pub const UNPARSEABLE: &'static str = "motion.unparseable_duration";

    pub fn new(max_duration_ms: u64) -> Self {
        Self { max_duration_ms }
    }

    /// Literal duration tokens. Aliases are checked through the token they point at.
    fn is_duration_token(store: &TokenStore, path: &str, token: &Token) -> bool {
        if !references(&token.value).is_empty() {
            return false;
        }
        let has_segment = |name: &str| path.split('.').any(|s| s == name);
        match store.effective_type(path) {
            Some(kind) => kind == "duration",
            None => {
                has_segment("duration")
                    || (has_segment("motion") && infer_type(&token.value) == Some("duration"))
            }
        }
    }
}

impl Agent for MotionAgent {
    fn routing_keys(&self) -> &[&'static str] {
        &[]
    }

    fn detect(&self, store: &TokenStore) -> anyhow::Result<Vec<Issue>> {
        let max = self.max_duration_ms as f64;
        let mut out = Vec::new();

        for (path, token) in store.tokens() {
            if !Self::is_duration_token(store, path, token) {
                continue;
            }
            match parse_duration_ms(&token.value) {
                Some(ms) if ms > max => out.push(
                    Issue::new(
                        domains::MOTION,
                        Self::TOO_LONG,
                        Severity::Warning,
                        Locator::token(path),
                        format!(
                            "duration {} exceeds the {}ms maximum",
                            token.value, self.max_duration_ms
                        ),
                    )
                    .with_citation(citations::ANIMATION_FROM_INTERACTIONS)
                    .with_suggestion(format!("clamp to {}ms", self.max_duration_ms)),
                ),
                Some(_) => {}
                None => out.push(Issue::new(
                    domains::MOTION,
                    Self::UNPARSEABLE,
                    Severity::Warning,
                    Locator::token(path),
                    format!("cannot read '{}' as a duration", token.value),
                )),
            }
        }
        Ok(out)
    }

    fn suggest_fixes(
        &self,
        _store: &TokenStore,
        issues: &[Issue],
    ) -> anyhow::Result<Vec<FixRequest>> {
        Ok(issues
            .iter()
            .filter(|i| i.code == Self::TOO_LONG)
            .filter_map(|issue| {
                let path = issue.locator.token_path()?;
                Some(
                    FixRequest::new(
                        fix_types::TOKEN_UPDATE,
                        crate::agent_ids::TOKENS,
                        issue.clone(),
                        FixPayload::set_value(path, format!("{}ms", self.max_duration_ms)),
                        format!("clamp {path} to {}ms", self.max_duration_ms),
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
        anyhow::bail!("motion does not apply fixes; '{}' belongs to tokens", fix.fix_type)
    }
}
