use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RecallError, Result};
use crate::search::{ExpansionLevel, MemoryLayer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub confidence: ConfidenceConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Config {
    /// Defaults, then global or project TOML (or an explicit file), then
    /// `RECALL_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("RECALL_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(RecallError::MissingConfig(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(project_root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Path of the global config file, when a config directory exists
    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("recall/config.toml"))
    }

    #[must_use]
    pub fn project_path(project_root: &Path) -> PathBuf {
        project_root.join(".recall/config.toml")
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match Self::global_path() {
            Some(path) => Self::load_patch(&path),
            None => Ok(None),
        }
    }

    fn load_project(project_root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&Self::project_path(project_root))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| RecallError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| RecallError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.fallback {
            self.fallback.merge(patch);
        }
        if let Some(patch) = patch.confidence {
            self.confidence.merge(patch);
        }
        if let Some(patch) = patch.sources {
            self.sources.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(&|key| std::env::var(key).ok())
    }

    fn apply_overrides_from(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env_string(env, "RECALL_LAYER") {
            self.search.default_layer = value
                .parse()
                .map_err(|err| RecallError::Config(format!("invalid RECALL_LAYER: {err}")))?;
        }
        if let Some(value) = env_usize(env, "RECALL_LIMIT")? {
            self.search.limit = value;
        }
        if let Some(value) = env_usize(env, "RECALL_MAX_LIMIT")? {
            self.search.max_limit = value;
        }
        if let Some(value) = env_string(env, "RECALL_EXPANSION") {
            self.search.expansion = value
                .parse()
                .map_err(|err| RecallError::Config(format!("invalid RECALL_EXPANSION: {err}")))?;
        }
        if let Some(value) = env_u64(env, "RECALL_TIMEOUT_MS")? {
            self.search.strategy_timeout_ms = value;
        }
        if let Some(value) = env_f64(env, "RECALL_RRF_K")? {
            self.search.rrf_k = value;
        }
        if let Some(value) = env_usize(env, "RECALL_FETCH_MULTIPLIER")? {
            self.search.fetch_multiplier = value;
        }

        if let Some(value) = env_bool(env, "RECALL_FALLBACKS") {
            self.fallback.enabled = value;
        }
        if let Some(value) = env_bool(env, "RECALL_RECENCY") {
            self.fallback.recency_enabled = value;
        }
        if let Some(value) = env_usize(env, "RECALL_RECENCY_FILES")? {
            self.fallback.recency_files = value;
        }
        if let Some(value) = env_u64(env, "RECALL_RECENCY_TIMEOUT_MS")? {
            self.fallback.recency_timeout_ms = value;
        }
        if let Some(value) = env_bool(env, "RECALL_BRUTE_FORCE") {
            self.fallback.brute_force_enabled = value;
        }
        if let Some(value) = env_u64(env, "RECALL_BRUTE_FORCE_TIMEOUT_MS")? {
            self.fallback.brute_force_timeout_ms = value;
        }

        if let Some(value) = env_usize(env, "RECALL_CONFIDENCE_TOP_N")? {
            self.confidence.corroboration_top_n = value;
        }
        if let Some(value) = env_usize(env, "RECALL_CONFIDENCE_MIN_STRATEGIES")? {
            self.confidence.min_corroborating_strategies = value;
        }
        if let Some(value) = env_f32(env, "RECALL_CONFIDENCE_THRESHOLD")? {
            self.confidence.high_score_threshold = value;
        }

        if let Some(value) = env_string(env, "RECALL_SESSIONS_DIR") {
            self.sources.sessions_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = env_usize(env, "RECALL_MAX_SESSIONS")? {
            self.sources.max_sessions = value;
        }
        if let Some(value) = env_usize(env, "RECALL_MAX_COMMITS")? {
            self.sources.max_commits = value;
        }
        if let Some(value) = env_bool(env, "RECALL_GIT") {
            self.sources.git = value;
        }
        if let Some(value) = env_bool(env, "RECALL_SEMANTIC") {
            self.sources.semantic = value;
        }

        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.search.limit == 0 {
            return Err(RecallError::Config("search.limit must be at least 1".to_string()));
        }
        if self.search.limit > self.search.max_limit {
            return Err(RecallError::Config(format!(
                "search.limit {} exceeds search.max_limit {}",
                self.search.limit, self.search.max_limit
            )));
        }
        if self.search.strategy_timeout_ms == 0 {
            return Err(RecallError::Config(
                "search.strategy_timeout_ms must be at least 1".to_string(),
            ));
        }
        if !self.search.rrf_k.is_finite() || self.search.rrf_k <= 0.0 {
            return Err(RecallError::Config(format!(
                "search.rrf_k must be a positive number, got {}",
                self.search.rrf_k
            )));
        }
        if self.search.fetch_multiplier == 0 {
            return Err(RecallError::Config(
                "search.fetch_multiplier must be at least 1".to_string(),
            ));
        }
        if self.fallback.recency_timeout_ms == 0 || self.fallback.brute_force_timeout_ms == 0 {
            return Err(RecallError::Config(
                "fallback timeouts must be at least 1ms".to_string(),
            ));
        }
        if self.fallback.recency_files == 0 {
            return Err(RecallError::Config(
                "fallback.recency_files must be at least 1".to_string(),
            ));
        }
        if self.confidence.corroboration_top_n == 0 {
            return Err(RecallError::Config(
                "confidence.corroboration_top_n must be at least 1".to_string(),
            ));
        }
        if self.confidence.min_corroborating_strategies < 2 {
            return Err(RecallError::Config(
                "confidence.min_corroborating_strategies must be at least 2".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence.high_score_threshold) {
            return Err(RecallError::Config(format!(
                "confidence.high_score_threshold must be within 0..=1, got {}",
                self.confidence.high_score_threshold
            )));
        }
        Ok(())
    }
}

/// Engine defaults applied to every request that leaves a field unset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_layer")]
    pub default_layer: MemoryLayer,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Largest `limit` a request may ask for
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default)]
    pub expansion: ExpansionLevel,
    #[serde(default = "default_strategy_timeout_ms")]
    pub strategy_timeout_ms: u64,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,
    /// Each strategy is asked for `limit * fetch_multiplier` hits
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,
}

const fn default_layer() -> MemoryLayer {
    MemoryLayer::Transcripts
}

const fn default_limit() -> usize {
    10
}

const fn default_max_limit() -> usize {
    1000
}

const fn default_strategy_timeout_ms() -> u64 {
    5000
}

const fn default_rrf_k() -> f64 {
    60.0
}

const fn default_fetch_multiplier() -> usize {
    2
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_layer: default_layer(),
            limit: default_limit(),
            max_limit: default_max_limit(),
            expansion: ExpansionLevel::default(),
            strategy_timeout_ms: default_strategy_timeout_ms(),
            rrf_k: default_rrf_k(),
            fetch_multiplier: default_fetch_multiplier(),
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub const fn strategy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.strategy_timeout_ms)
    }

    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.default_layer {
            self.default_layer = value;
        }
        if let Some(value) = patch.limit {
            self.limit = value;
        }
        if let Some(value) = patch.max_limit {
            self.max_limit = value;
        }
        if let Some(value) = patch.expansion {
            self.expansion = value;
        }
        if let Some(value) = patch.strategy_timeout_ms {
            self.strategy_timeout_ms = value;
        }
        if let Some(value) = patch.rrf_k {
            self.rrf_k = value;
        }
        if let Some(value) = patch.fetch_multiplier {
            self.fetch_multiplier = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Whether plain CLI searches escalate through fallbacks
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub recency_enabled: bool,
    /// Newest session files examined by the recency scan
    #[serde(default = "default_recency_files")]
    pub recency_files: usize,
    #[serde(default = "default_recency_timeout_ms")]
    pub recency_timeout_ms: u64,
    #[serde(default)]
    pub brute_force_enabled: bool,
    #[serde(default = "default_brute_force_timeout_ms")]
    pub brute_force_timeout_ms: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_recency_files() -> usize {
    10
}

const fn default_recency_timeout_ms() -> u64 {
    3000
}

const fn default_brute_force_timeout_ms() -> u64 {
    5000
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recency_enabled: true,
            recency_files: default_recency_files(),
            recency_timeout_ms: default_recency_timeout_ms(),
            brute_force_enabled: false,
            brute_force_timeout_ms: default_brute_force_timeout_ms(),
        }
    }
}

impl FallbackConfig {
    fn merge(&mut self, patch: FallbackPatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.recency_enabled {
            self.recency_enabled = value;
        }
        if let Some(value) = patch.recency_files {
            self.recency_files = value;
        }
        if let Some(value) = patch.recency_timeout_ms {
            self.recency_timeout_ms = value;
        }
        if let Some(value) = patch.brute_force_enabled {
            self.brute_force_enabled = value;
        }
        if let Some(value) = patch.brute_force_timeout_ms {
            self.brute_force_timeout_ms = value;
        }
    }
}

/// Agreement thresholds for the confidence signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Window of each strategy's list checked for corroboration
    #[serde(default = "default_top_n")]
    pub corroboration_top_n: usize,
    #[serde(default = "default_min_corroborating")]
    pub min_corroborating_strategies: usize,
    /// Native score a lone strategy's top hit must exceed for `high`
    #[serde(default = "default_high_score_threshold")]
    pub high_score_threshold: f32,
}

const fn default_top_n() -> usize {
    3
}

const fn default_min_corroborating() -> usize {
    2
}

const fn default_high_score_threshold() -> f32 {
    0.5
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            corroboration_top_n: default_top_n(),
            min_corroborating_strategies: default_min_corroborating(),
            high_score_threshold: default_high_score_threshold(),
        }
    }
}

impl ConfidenceConfig {
    fn merge(&mut self, patch: ConfidencePatch) {
        if let Some(value) = patch.corroboration_top_n {
            self.corroboration_top_n = value;
        }
        if let Some(value) = patch.min_corroborating_strategies {
            self.min_corroborating_strategies = value;
        }
        if let Some(value) = patch.high_score_threshold {
            self.high_score_threshold = value;
        }
    }
}

/// Where the bundled back-ends load their corpus from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Root holding transcript JSONL files. Defaults to `~/.claude/projects`.
    #[serde(default)]
    pub sessions_dir: Option<PathBuf>,
    /// Newest session files indexed
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Commits indexed from the project repository
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    #[serde(default = "default_true")]
    pub git: bool,
    /// Bind the hash-embedding index to each layer
    #[serde(default = "default_true")]
    pub semantic: bool,
}

const fn default_max_sessions() -> usize {
    200
}

const fn default_max_commits() -> usize {
    500
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            sessions_dir: None,
            max_sessions: default_max_sessions(),
            max_commits: default_max_commits(),
            git: true,
            semantic: true,
        }
    }
}

impl SourcesConfig {
    /// Effective sessions root
    #[must_use]
    pub fn sessions_root(&self) -> Option<PathBuf> {
        self.sessions_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".claude/projects")))
    }

    fn merge(&mut self, patch: SourcesPatch) {
        if let Some(value) = patch.sessions_dir {
            self.sessions_dir = Some(value);
        }
        if let Some(value) = patch.max_sessions {
            self.max_sessions = value;
        }
        if let Some(value) = patch.max_commits {
            self.max_commits = value;
        }
        if let Some(value) = patch.git {
            self.git = value;
        }
        if let Some(value) = patch.semantic {
            self.semantic = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub search: Option<SearchPatch>,
    pub fallback: Option<FallbackPatch>,
    pub confidence: Option<ConfidencePatch>,
    pub sources: Option<SourcesPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub default_layer: Option<MemoryLayer>,
    pub limit: Option<usize>,
    pub max_limit: Option<usize>,
    pub expansion: Option<ExpansionLevel>,
    pub strategy_timeout_ms: Option<u64>,
    pub rrf_k: Option<f64>,
    pub fetch_multiplier: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FallbackPatch {
    pub enabled: Option<bool>,
    pub recency_enabled: Option<bool>,
    pub recency_files: Option<usize>,
    pub recency_timeout_ms: Option<u64>,
    pub brute_force_enabled: Option<bool>,
    pub brute_force_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfidencePatch {
    pub corroboration_top_n: Option<usize>,
    pub min_corroborating_strategies: Option<usize>,
    pub high_score_threshold: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SourcesPatch {
    pub sessions_dir: Option<PathBuf>,
    pub max_sessions: Option<usize>,
    pub max_commits: Option<usize>,
    pub git: Option<bool>,
    pub semantic: Option<bool>,
}

fn env_string(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_bool(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    env(key).map(|value| {
        matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_usize(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<usize>> {
    match env_string(env, key) {
        Some(value) => value.parse::<usize>().map(Some).map_err(|err| {
            RecallError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}

fn env_u64(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    match env_string(env, key) {
        Some(value) => value.parse::<u64>().map(Some).map_err(|err| {
            RecallError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}

fn env_f32(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<f32>> {
    match env_string(env, key) {
        Some(value) => value.parse::<f32>().map(Some).map_err(|err| {
            RecallError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}

fn env_f64(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<f64>> {
    match env_string(env, key) {
        Some(value) => value.parse::<f64>().map(Some).map_err(|err| {
            RecallError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        None => Ok(None),
    }
}
