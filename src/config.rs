use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    #[serde(default = "default_civic_data_path")]
    pub civic_data_path: PathBuf,
    #[serde(default = "default_pincode_path")]
    pub pincode_path: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            civic_data_path: default_civic_data_path(),
            pincode_path: default_pincode_path(),
        }
    }
}

fn default_civic_data_path() -> PathBuf {
    PathBuf::from("./data/civic_data.json")
}
fn default_pincode_path() -> PathBuf {
    PathBuf::from("./data/pincodes.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Entries older than this are invalid and must not be served.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
    /// Most-recently-created entries kept in the memory index.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
    /// Durable records kept on disk; oldest by modification time are
    /// deleted beyond this bound.
    #[serde(default = "default_durable_capacity")]
    pub durable_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl_hours: default_ttl_hours(),
            memory_capacity: default_memory_capacity(),
            durable_capacity: default_durable_capacity(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}
fn default_ttl_hours() -> i64 {
    24
}
fn default_memory_capacity() -> usize {
    1000
}
fn default_durable_capacity() -> usize {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// `disabled` or `openai`.
    #[serde(default = "default_gen_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_gen_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_gen_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_gen_provider(),
            model: None,
            timeout_secs: default_gen_timeout_secs(),
            max_retries: default_gen_max_retries(),
        }
    }
}

fn default_gen_provider() -> String {
    "disabled".to_string()
}
fn default_gen_timeout_secs() -> u64 {
    30
}
fn default_gen_max_retries() -> u32 {
    2
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Attempt live fetches from civic portals on each miss.
    #[serde(default)]
    pub live_fetch: bool,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Reference texts returned by similarity ranking.
    #[serde(default = "default_max_snippets")]
    pub max_snippets: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            live_fetch: false,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_snippets: default_max_snippets(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    5
}
fn default_max_snippets() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Cache eviction and re-tuning run every this many queries.
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            maintenance_interval: default_maintenance_interval(),
        }
    }
}

fn default_maintenance_interval() -> u64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate cache
    if config.cache.ttl_hours < 0 {
        anyhow::bail!("cache.ttl_hours must be >= 0");
    }
    if config.cache.memory_capacity == 0 {
        anyhow::bail!("cache.memory_capacity must be >= 1");
    }
    if config.cache.durable_capacity < config.cache.memory_capacity {
        anyhow::bail!("cache.durable_capacity must be >= cache.memory_capacity");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.generation.is_enabled() && config.generation.model.is_none() {
        anyhow::bail!(
            "generation.model must be specified when provider is '{}'",
            config.generation.provider
        );
    }

    // Validate retrieval
    if config.retrieval.fetch_timeout_secs == 0 {
        anyhow::bail!("retrieval.fetch_timeout_secs must be >= 1");
    }

    // Validate pipeline
    if config.pipeline.maintenance_interval == 0 {
        anyhow::bail!("pipeline.maintenance_interval must be >= 1");
    }

    Ok(config)
}

/// Load the config file if present, falling back to defaults so the
/// binary works without any setup.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}
