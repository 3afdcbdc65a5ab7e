//! Configuration file loading for tokenfix.
//!
//! Discovers and loads `tokenfix.toml` from the project root.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tokenfix_agents::{ContrastPair, MotionAgent};
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "tokenfix.toml";

/// Top-level configuration from tokenfix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenfixConfig {
    pub tokens: TokensConfig,
    pub cycle: CycleConfig,
    pub policy: PolicyConfig,
    pub motion: MotionConfig,
    pub markup: MarkupConfig,
    pub contrast: ContrastConfig,
}

/// Where token documents live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokensConfig {
    /// Source root, relative to the project root. Each subdirectory is a tier.
    pub dir: Utf8PathBuf,

    /// Known tiers, primitive first.
    pub tiers: Vec<String>,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from("tokens"),
            tiers: ["primitive", "semantic", "component"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    pub max_iterations: u32,
    pub auto_fix_only: bool,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            auto_fix_only: true,
        }
    }
}

/// Policy section of the config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Allowlist patterns over fix types. If non-empty, only matching types are applied.
    pub allow: Vec<String>,

    /// Denylist patterns over fix types.
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub max_duration_ms: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_duration_ms: MotionAgent::DEFAULT_MAX_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    /// JSON array of element descriptors. Markup checks are off when unset.
    pub file: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    pub pairs: Vec<ContrastPair>,

    /// JSON array of measured ratios for the configured pairs.
    pub measurements: Option<Utf8PathBuf>,
}

/// Discover the tokenfix.toml config file.
///
/// Returns `None` if `root` has no config file.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a tokenfix.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<TokenfixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

/// Parse a config file from a string.
pub fn parse_config(contents: &str) -> anyhow::Result<TokenfixConfig> {
    let config: TokenfixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `root`, or return the default if there is none.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<TokenfixConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(TokenfixConfig::default()),
    }
}
