use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinpointConfig {
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Best-so-far score that ends the retry loop
    #[serde(default = "default_accept_score")]
    pub accept_score: f64,
    /// A strategy's top score at or above this skips the remaining strategies
    #[serde(default = "default_early_stop_score")]
    pub early_stop_score: f64,
    #[serde(default = "default_backoff_cap_secs")]
    pub backoff_cap_secs: u64,
    #[serde(default = "default_content_ready_timeout_ms")]
    pub content_ready_timeout_ms: u64,
    #[serde(default = "default_network_idle_timeout_ms")]
    pub network_idle_timeout_ms: u64,
    /// Similarity a cached node's text must keep to be trusted
    #[serde(default = "default_cache_validation_score")]
    pub cache_validation_score: f64,
    #[serde(default)]
    pub debug: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            accept_score: default_accept_score(),
            early_stop_score: default_early_stop_score(),
            backoff_cap_secs: default_backoff_cap_secs(),
            content_ready_timeout_ms: default_content_ready_timeout_ms(),
            network_idle_timeout_ms: default_network_idle_timeout_ms(),
            cache_validation_score: default_cache_validation_score(),
            debug: false,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_accept_score() -> f64 {
    0.5
}

fn default_early_stop_score() -> f64 {
    0.9
}

fn default_backoff_cap_secs() -> u64 {
    5
}

fn default_content_ready_timeout_ms() -> u64 {
    5000
}

fn default_network_idle_timeout_ms() -> u64 {
    3000
}

fn default_cache_validation_score() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Persist after every N-th write
    #[serde(default = "default_save_every")]
    pub save_every: usize,
    /// Writes scoring at least this much are persisted immediately
    #[serde(default = "default_immediate_save_score")]
    pub immediate_save_score: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
            fuzzy_threshold: default_fuzzy_threshold(),
            save_every: default_save_every(),
            immediate_save_score: default_immediate_save_score(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("page_models")
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    1000
}

fn default_fuzzy_threshold() -> f64 {
    0.8
}

fn default_save_every() -> usize {
    5
}

fn default_immediate_save_score() -> f64 {
    0.8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_discovery_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_elements")]
    pub max_elements: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_discovery_dir(),
            max_elements: default_max_elements(),
            min_score: default_min_score(),
        }
    }
}

fn default_discovery_dir() -> PathBuf {
    PathBuf::from(".page_models")
}

fn default_max_elements() -> usize {
    200
}

fn default_min_score() -> f64 {
    0.5
}
