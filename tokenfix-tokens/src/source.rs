use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::{Pattern, glob};
use tracing::debug;

/// One token document as read from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDocument {
    /// Where the document came from, relative or absolute. Used for ordering and diagnostics.
    pub path: Utf8PathBuf,
    /// Tier directory the document belongs to, e.g. `primitive`.
    pub tier: String,
    pub contents: serde_json::Value,
}

impl TokenDocument {
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        tier: impl Into<String>,
        contents: serde_json::Value,
    ) -> Self {
        Self {
            path: path.into(),
            tier: tier.into(),
            contents,
        }
    }
}

/// Port through which a [`crate::TokenStore`] reads its documents.
///
/// Implementations return documents in any order; the store sorts them.
pub trait TokenSource: Send + Sync {
    fn load_documents(&self) -> anyhow::Result<Vec<TokenDocument>>;
}

/// Load order of a tier: primitive, semantic, component, then everything else.
pub fn tier_rank(tier: &str) -> u8 {
    match tier {
        "primitive" => 0,
        "semantic" => 1,
        "component" => 2,
        _ => 3,
    }
}

/// Reads `<root>/<tier>/**/*.json`.
#[derive(Debug, Clone)]
pub struct FsTokenSource {
    root: Utf8PathBuf,
}

impl FsTokenSource {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl TokenSource for FsTokenSource {
    fn load_documents(&self) -> anyhow::Result<Vec<TokenDocument>> {
        let pattern = Utf8PathBuf::from(Pattern::escape(self.root.as_str())).join("*/**/*.json");
        let pattern_str = pattern.as_str();

        debug!(pattern = %pattern_str, "scanning token directory");

        let mut out = Vec::new();
        for entry in glob(pattern_str).context("glob <tokens>/*/**/*.json")? {
            let path = entry
                .map_err(|e| anyhow::anyhow!("glob error: {e}"))?
                .to_string_lossy()
                .to_string();
            let path = Utf8PathBuf::from(path);

            let tier = path
                .strip_prefix(&self.root)
                .ok()
                .and_then(|rel| rel.components().next())
                .map(|c| c.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let text = fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
            let contents: serde_json::Value =
                serde_json::from_str(&text).with_context(|| format!("parse token file {path}"))?;

            debug!(path = %path, tier = %tier, "loaded token document");
            out.push(TokenDocument {
                path,
                tier,
                contents,
            });
        }

        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}

/// Documents held in memory. Used by tests and embedders that build tokens programmatically.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenSource {
    documents: Vec<TokenDocument>,
}

impl InMemoryTokenSource {
    pub fn new(documents: Vec<TokenDocument>) -> Self {
        Self { documents }
    }

    /// One document per tier, named `<tier>.json`.
    pub fn from_tiers<I, S>(tiers: I) -> Self
    where
        I: IntoIterator<Item = (S, serde_json::Value)>,
        S: Into<String>,
    {
        let documents = tiers
            .into_iter()
            .map(|(tier, contents)| {
                let tier = tier.into();
                TokenDocument::new(format!("{tier}.json"), tier, contents)
            })
            .collect();
        Self { documents }
    }

    pub fn push(&mut self, document: TokenDocument) {
        self.documents.push(document);
    }
}

impl TokenSource for InMemoryTokenSource {
    fn load_documents(&self) -> anyhow::Result<Vec<TokenDocument>> {
        Ok(self.documents.clone())
    }
}
