//! Clap-free settings for building an engine.

use crate::config::TokenfixConfig;
use crate::cycle::FixCycleOptions;
use crate::policy::FixPolicy;
use camino::{Utf8Path, Utf8PathBuf};
use tokenfix_agents::{ContrastPair, MotionAgent};

/// Everything [`crate::build_orchestrator`] needs. Relative paths are taken from `root`.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub root: Utf8PathBuf,
    pub tokens_dir: Utf8PathBuf,
    pub tiers: Vec<String>,

    // Cycle
    pub max_iterations: u32,
    pub auto_fix_only: bool,

    // Policy
    pub allow: Vec<String>,
    pub deny: Vec<String>,

    // Collaborators
    pub max_duration_ms: u64,
    pub markup_file: Option<Utf8PathBuf>,
    pub contrast_pairs: Vec<ContrastPair>,
    pub contrast_measurements: Option<Utf8PathBuf>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            tokens_dir: Utf8PathBuf::from("tokens"),
            tiers: vec![
                "primitive".to_string(),
                "semantic".to_string(),
                "component".to_string(),
            ],
            max_iterations: 3,
            auto_fix_only: true,
            allow: Vec::new(),
            deny: Vec::new(),
            max_duration_ms: MotionAgent::DEFAULT_MAX_DURATION_MS,
            markup_file: None,
            contrast_pairs: Vec::new(),
            contrast_measurements: None,
        }
    }
}

impl EngineSettings {
    pub fn from_config(root: impl Into<Utf8PathBuf>, config: &TokenfixConfig) -> Self {
        Self {
            root: root.into(),
            tokens_dir: config.tokens.dir.clone(),
            tiers: config.tokens.tiers.clone(),
            max_iterations: config.cycle.max_iterations,
            auto_fix_only: config.cycle.auto_fix_only,
            allow: config.policy.allow.clone(),
            deny: config.policy.deny.clone(),
            max_duration_ms: config.motion.max_duration_ms,
            markup_file: config.markup.file.clone(),
            contrast_pairs: config.contrast.pairs.clone(),
            contrast_measurements: config.contrast.measurements.clone(),
        }
    }

    /// `path` joined onto `root` unless it is already absolute.
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn policy(&self) -> FixPolicy {
        FixPolicy::new(self.allow.clone(), self.deny.clone())
    }

    pub fn cycle_options(&self) -> FixCycleOptions {
        FixCycleOptions {
            auto_fix_only: self.auto_fix_only,
            max_iterations: self.max_iterations,
        }
    }
}
