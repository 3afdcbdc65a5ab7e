use crate::error::{ResolveError, StoreError};
use crate::parse::flatten;
use crate::reference::{is_valid_path, references};
use crate::resolve::{effective_type, resolve};
use crate::source::{InMemoryTokenSource, TokenSource, tier_rank};
use crate::token::{ResolvedToken, Token, TokenMeta};
use anyhow::Context;
use camino::Utf8PathBuf;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;
use tokenfix_types::fix::{Change, FixPayload, FixRequest, FixResult, fix_types};
use tokenfix_types::issue::Locator;
use tracing::{debug, warn};

/// A path defined by more than one document during `load()`. The later document wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Override {
    pub path: String,
    pub previous: Utf8PathBuf,
    pub document: Utf8PathBuf,
}

/// The token tree of one engine instance.
///
/// Cloning is cheap relative to a reload: the source is shared, the tree is copied. Dry runs
/// operate on a clone.
#[derive(Clone)]
pub struct TokenStore {
    source: Arc<dyn TokenSource>,
    tokens: BTreeMap<String, Token>,
    overrides: Vec<Override>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("tokens", &self.tokens.len())
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(InMemoryTokenSource::default())
    }
}

impl TokenStore {
    /// An empty store reading from `source`. Call [`TokenStore::load`] to populate it.
    pub fn new(source: impl TokenSource + 'static) -> Self {
        Self::with_source(Arc::new(source))
    }

    pub fn with_source(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            tokens: BTreeMap::new(),
            overrides: Vec::new(),
        }
    }

    /// Create and load in one step.
    pub fn open(source: impl TokenSource + 'static) -> anyhow::Result<Self> {
        let mut store = Self::new(source);
        store.load()?;
        Ok(store)
    }

    /// Re-read every document from the source.
    ///
    /// Documents are applied in tier order (primitive, semantic, component, then other tiers by
    /// name), by path within a tier. If the source fails, the current tree is kept.
    pub fn load(&mut self) -> anyhow::Result<()> {
        let mut documents = self
            .source
            .load_documents()
            .context("load token documents")?;
        documents.sort_by(|a, b| {
            tier_rank(&a.tier)
                .cmp(&tier_rank(&b.tier))
                .then_with(|| a.tier.cmp(&b.tier))
                .then_with(|| a.path.cmp(&b.path))
        });

        let mut tokens = BTreeMap::new();
        let mut origins: HashMap<String, Utf8PathBuf> = HashMap::new();
        let mut overrides = Vec::new();

        for doc in &documents {
            for (path, token) in flatten(&doc.contents) {
                if let Some(previous) = origins.insert(path.clone(), doc.path.clone()) {
                    warn!(
                        path = %path,
                        previous = %previous,
                        document = %doc.path,
                        "token definition overridden"
                    );
                    overrides.push(Override {
                        path: path.clone(),
                        previous,
                        document: doc.path.clone(),
                    });
                }
                tokens.insert(path, token);
            }
        }

        self.tokens = tokens;
        self.overrides = overrides;
        debug!(
            tokens = self.tokens.len(),
            documents = documents.len(),
            "token store loaded"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.tokens.contains_key(path)
    }

    /// All token paths in tree order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    /// Raw tokens in tree order.
    pub fn tokens(&self) -> impl Iterator<Item = (&str, &Token)> {
        self.tokens.iter().map(|(path, token)| (path.as_str(), token))
    }

    pub fn token(&self, path: &str) -> Option<&Token> {
        self.tokens.get(path)
    }

    pub fn overrides(&self) -> &[Override] {
        &self.overrides
    }

    /// Resolve one token. `Ok(None)` when the path does not exist.
    pub fn get(&self, path: &str) -> Result<Option<ResolvedToken>, ResolveError> {
        let Some((key, token)) = self.tokens.get_key_value(path) else {
            return Ok(None);
        };
        let resolution = resolve(&self.tokens, key, &token.value)?;
        Ok(Some(ResolvedToken {
            path: key.clone(),
            raw_value: token.value.clone(),
            resolved_value: resolution.value,
            token_type: self.effective_type(key).map(str::to_string),
            description: token.description.clone(),
            reference_chain: resolution.chain,
        }))
    }

    /// The token without resolving references.
    pub fn get_raw(&self, path: &str) -> Option<ResolvedToken> {
        let (key, token) = self.tokens.get_key_value(path)?;
        Some(ResolvedToken {
            path: key.clone(),
            raw_value: token.value.clone(),
            resolved_value: token.value.clone(),
            token_type: token.token_type.clone(),
            description: token.description.clone(),
            reference_chain: Vec::new(),
        })
    }

    /// Resolved tokens at `prefix` or below it, in tree order. Matches whole segments only.
    pub fn get_by_prefix(&self, prefix: &str) -> Result<Vec<ResolvedToken>, ResolveError> {
        let group = format!("{prefix}.");
        self.tokens
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(path, _)| path.starts_with(prefix))
            .filter(|(path, _)| path.as_str() == prefix || path.starts_with(&group))
            .filter_map(|(path, _)| self.get(path).transpose())
            .collect()
    }

    /// Resolved tokens whose effective type is `token_type`, in tree order.
    pub fn get_by_type(&self, token_type: &str) -> Result<Vec<ResolvedToken>, ResolveError> {
        self.tokens
            .keys()
            .filter(|path| self.effective_type(path) == Some(token_type))
            .filter_map(|path| self.get(path).transpose())
            .collect()
    }

    /// Declared type, or the first declared type along a pure alias chain.
    pub fn effective_type(&self, path: &str) -> Option<&str> {
        effective_type(&self.tokens, path)
    }

    /// Tokens whose raw value references `path`.
    pub fn referrers(&self, path: &str) -> Vec<&str> {
        self.tokens
            .iter()
            .filter(|(_, token)| references(&token.value).contains(&path))
            .map(|(p, _)| p.as_str())
            .collect()
    }

    /// Create or overwrite a token. Returns `false`, leaving the store untouched, when the write
    /// is rejected; see [`TokenStore::try_set`].
    pub fn set(&mut self, path: &str, value: impl Into<String>, meta: TokenMeta) -> bool {
        match self.try_set(path, value, meta) {
            Ok(()) => true,
            Err(err) => {
                debug!(path = %path, error = %err, "token write rejected");
                false
            }
        }
    }

    /// Create or overwrite a token.
    ///
    /// Missing metadata on an overwrite keeps the existing type and description.
    pub fn try_set(
        &mut self,
        path: &str,
        value: impl Into<String>,
        meta: TokenMeta,
    ) -> Result<(), StoreError> {
        self.check_write(path)?;
        let value = value.into();
        match self.tokens.get_mut(path) {
            Some(token) => {
                token.value = value;
                if meta.token_type.is_some() {
                    token.token_type = meta.token_type;
                }
                if meta.description.is_some() {
                    token.description = meta.description;
                }
            }
            None => {
                self.tokens.insert(
                    path.to_string(),
                    Token {
                        value,
                        token_type: meta.token_type,
                        description: meta.description,
                    },
                );
            }
        }
        Ok(())
    }

    fn check_write(&self, path: &str) -> Result<(), StoreError> {
        if !is_valid_path(path) {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
            });
        }

        let group = format!("{path}.");
        let is_group = self
            .tokens
            .range::<str, _>((Bound::Included(group.as_str()), Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(&group));
        if is_group {
            return Err(StoreError::GroupConflict {
                path: path.to_string(),
            });
        }

        if let Some(parent) = path
            .match_indices('.')
            .map(|(i, _)| &path[..i])
            .find(|parent| self.tokens.contains_key(*parent))
        {
            return Err(StoreError::NestedUnderToken {
                path: path.to_string(),
                parent: parent.to_string(),
            });
        }
        Ok(())
    }

    /// Remove a token. Returns whether it existed.
    pub fn delete(&mut self, path: &str) -> bool {
        self.tokens.remove(path).is_some()
    }

    /// Apply a token-domain fix (`token.update`, `token.create`, `token.contrast`,
    /// `token.delete`). Either the whole change lands or nothing does.
    pub fn apply_fix(&mut self, fix: &FixRequest) -> FixResult {
        match self.apply_token_fix(fix) {
            Ok(changes) => {
                debug!(id = %fix.id, fix_type = %fix.fix_type, "token fix applied");
                FixResult::applied(fix.id.clone(), changes)
            }
            Err(message) => {
                debug!(id = %fix.id, fix_type = %fix.fix_type, error = %message, "token fix failed");
                FixResult::failed(fix.id.clone(), message)
            }
        }
    }

    fn apply_token_fix(&mut self, fix: &FixRequest) -> Result<Vec<Change>, String> {
        let fix_type = fix.fix_type.as_str();
        match (fix_type, &fix.fix) {
            (
                fix_types::TOKEN_UPDATE | fix_types::TOKEN_CONTRAST | fix_types::TOKEN_CREATE,
                FixPayload::TokenSet {
                    path,
                    value,
                    token_type,
                    description,
                },
            ) => {
                let before = self.tokens.get(path).cloned();
                match (fix_type, &before) {
                    (fix_types::TOKEN_CREATE, Some(_)) => {
                        return Err(format!("token '{path}' already exists"));
                    }
                    (fix_types::TOKEN_UPDATE | fix_types::TOKEN_CONTRAST, None) => {
                        return Err(format!("token '{path}' does not exist"));
                    }
                    _ => {}
                }

                let meta = TokenMeta {
                    token_type: token_type.clone(),
                    description: description.clone(),
                };
                self.try_set(path, value.as_str(), meta)
                    .map_err(|e| e.to_string())?;

                if let Err(err) = self.get(path) {
                    self.restore(path, before);
                    return Err(format!("rolled back '{path}': {err}"));
                }

                Ok(vec![Change {
                    locator: Locator::token(path.as_str()),
                    before: before.map(|t| t.value),
                    after: Some(value.clone()),
                }])
            }
            (fix_types::TOKEN_DELETE, FixPayload::TokenRemove { path }) => {
                let referrers = self.referrers(path);
                if !referrers.is_empty() {
                    return Err(format!(
                        "token '{path}' is still referenced by {}",
                        referrers.join(", ")
                    ));
                }
                match self.tokens.remove(path.as_str()) {
                    Some(token) => Ok(vec![Change {
                        locator: Locator::token(path.as_str()),
                        before: Some(token.value),
                        after: None,
                    }]),
                    None => Err(format!("token '{path}' does not exist")),
                }
            }
            (fix_type, _) => Err(format!(
                "unsupported fix '{fix_type}' for the token store"
            )),
        }
    }

    fn restore(&mut self, path: &str, before: Option<Token>) {
        match before {
            Some(token) => {
                self.tokens.insert(path.to_string(), token);
            }
            None => {
                self.tokens.remove(path);
            }
        }
    }

    /// sha256 of the raw tree as canonical JSON.
    pub fn fingerprint(&self) -> String {
        let s = serde_json::to_string(&self.tokens).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(s.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// The raw tree as pretty JSON, one field per line. Used for change previews.
    pub fn to_raw_json(&self) -> String {
        serde_json::to_string_pretty(&self.tokens).unwrap_or_default()
    }
}
