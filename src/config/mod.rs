use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub corpus: CorpusConfig,
    pub features: FeatureConfig,
    pub index: IndexConfig,
    pub resolver: ResolverConfig,
    pub recommendation: RecommendationConfig,
    pub cache: CacheConfig,
    pub poster: PosterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads for the HTTP server.
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub path: PathBuf,
    /// Number of cast names kept from a structured cast list.
    pub max_cast: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub min_token_len: usize,
    pub remove_stop_words: bool,
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStrategy {
    Dense,
    Lazy,
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    pub strategy: IndexStrategy,
    /// Largest corpus for which `Auto` still precomputes the N x N matrix.
    pub dense_max_items: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Fuzzy fallback is disabled when unset.
    pub fuzzy_max_distance: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub default_count: usize,
    pub max_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosterConfig {
    /// Catalog API key; without one every poster is a placeholder.
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub placeholder_base_url: String,
    /// Upper bound on one poster lookup before the placeholder is used.
    pub lookup_timeout_ms: u64,
}

pub const API_KEY_SENTINEL: &str = "your_tmdb_api_key_here";

impl PosterConfig {
    pub fn lookup_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && *key != API_KEY_SENTINEL)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            corpus: CorpusConfig::default(),
            features: FeatureConfig::default(),
            index: IndexConfig::default(),
            resolver: ResolverConfig::default(),
            recommendation: RecommendationConfig::default(),
            cache: CacheConfig::default(),
            poster: PosterConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: num_cpus::get(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/movies.csv"),
            max_cast: 3,
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            min_token_len: 1,
            remove_stop_words: false,
            max_features: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            strategy: IndexStrategy::Auto,
            dense_max_items: 5_000,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fuzzy_max_distance: None,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            default_count: 6,
            max_count: 50,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1024,
            snapshot_dir: None,
        }
    }
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: "https://api.themoviedb.org/3".to_string(),
            placeholder_base_url: "https://via.placeholder.com/300x450".to_string(),
            lookup_timeout_ms: 5_000,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MOVIEREC").separator("__"))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        crate::utils::validation::validate_config(self)
    }
}
