//! Allow/deny policy over fix types.

use tokenfix_types::cycle::skip_tokens;

/// Glob patterns (`*`, `?`) matched against a request's fix type. Deny wins over allow; an
/// empty allowlist allows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixPolicy {
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

/// Why a fix type was held back: human reason and stable token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyBlock {
    pub reason: String,
    pub token: &'static str,
}

impl FixPolicy {
    pub fn new(allow: Vec<String>, deny: Vec<String>) -> Self {
        Self { allow, deny }
    }

    pub fn check(&self, fix_type: &str) -> Option<PolicyBlock> {
        if self.deny.iter().any(|pat| glob_match(pat, fix_type)) {
            return Some(PolicyBlock {
                reason: "denied by policy".to_string(),
                token: skip_tokens::DENYLIST,
            });
        }

        if !self.allow.is_empty() && !self.allow.iter().any(|pat| glob_match(pat, fix_type)) {
            return Some(PolicyBlock {
                reason: "not in allowlist".to_string(),
                token: skip_tokens::ALLOWLIST_MISSING,
            });
        }
        None
    }
}

pub(crate) fn glob_match(pat: &str, text: &str) -> bool {
    let p = pat.as_bytes();
    let t = text.as_bytes();
    let mut dp = vec![vec![false; t.len() + 1]; p.len() + 1];
    dp[0][0] = true;

    for i in 1..=p.len() {
        if p[i - 1] == b'*' {
            dp[i][0] = dp[i - 1][0];
        }
    }

    for i in 1..=p.len() {
        for j in 1..=t.len() {
            dp[i][j] = match p[i - 1] {
                b'*' => dp[i - 1][j] || dp[i][j - 1],
                b'?' => dp[i - 1][j - 1],
                c => dp[i - 1][j - 1] && c == t[j - 1],
            };
        }
    }

    dp[p.len()][t.len()]
}
