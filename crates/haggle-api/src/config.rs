use config::{Config as ConfigLoader, ConfigError, Environment, File};
use haggle_advisor::{AdvisorConfig, AdvisorTimeouts};
use haggle_market::LedgerConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub advisor: AdvisorSettings,
    pub offers: OfferSettings,
    #[serde(default)]
    pub events: EventSettings,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: Option<String>,
    #[serde(default)]
    pub advisor_api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// OpenAI-compatible endpoint; defaults to the Gemini endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    pub price_analysis_timeout_secs: u64,
    pub market_research_timeout_secs: u64,
    pub chat_reply_timeout_secs: u64,
}

impl From<&AdvisorSettings> for AdvisorConfig {
    fn from(settings: &AdvisorSettings) -> Self {
        AdvisorConfig::new(settings.model.clone())
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
            .with_timeouts(AdvisorTimeouts {
                price_analysis: Duration::from_secs(settings.price_analysis_timeout_secs),
                market_research: Duration::from_secs(settings.market_research_timeout_secs),
                chat_reply: Duration::from_secs(settings.chat_reply_timeout_secs),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferSettings {
    pub ttl_hours: u64,
    pub sweep_interval_secs: u64,
}

impl From<&OfferSettings> for LedgerConfig {
    fn from(settings: &OfferSettings) -> Self {
        LedgerConfig::default()
            .with_offer_ttl(Duration::from_secs(settings.ttl_hours * 3600))
            .with_sweep_interval(Duration::from_secs(settings.sweep_interval_secs.max(1)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    pub capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. {CONFIG_DIR}/default.toml
    /// 2. {CONFIG_DIR}/{ENV}.toml (if ENV is set)
    /// 3. Environment variables: `HAGGLE_<SECTION>__<KEY>`, e.g. `HAGGLE_SERVER__PORT`
    ///
    /// `CONFIG_DIR` defaults to `config`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());
        let dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("{}/{}", dir, env)).required(false))
            // 3. Environment variables override everything
            .add_source(
                Environment::with_prefix("HAGGLE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Load secrets from ENV (not in TOML)
        cfg.mongodb_uri = non_empty_env("MONGODB_URI");
        cfg.advisor_api_key = non_empty_env("ADVISOR_API_KEY");

        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Mongodb && self.mongodb_uri.is_none() {
            return Err(ConfigError::Message(
                "MONGODB_URI environment variable is required for the mongodb backend".to_string(),
            ));
        }
        if self.offers.ttl_hours == 0 {
            return Err(ConfigError::Message("offers.ttl_hours must be positive".to_string()));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
