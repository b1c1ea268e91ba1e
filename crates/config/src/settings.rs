//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::persona::PersonaConfig;
use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Catalog store configuration
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Cart store configuration
    #[serde(default)]
    pub cart: CartConfig,

    /// Audio bridge configuration
    #[serde(default)]
    pub audio: AudioConfig,

    /// Session policy constants
    #[serde(default)]
    pub session: SessionPolicy,

    /// Sommelier persona, injected into the voice session at start
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Avatar provider configuration
    #[serde(default)]
    pub avatar: AvatarConfig,
}

/// Avatar provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarConfig {
    /// Session creation endpoint.
    #[serde(default = "default_avatar_endpoint")]
    pub endpoint: String,
    /// Provider API key; sessions without an avatar leave this unset.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Maximum avatar session length in seconds.
    #[serde(default = "default_max_session_length_secs")]
    pub max_session_length_secs: u64,
    /// Idle cutoff for the avatar stream in seconds.
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,
}

fn default_avatar_endpoint() -> String {
    "https://api.simli.ai/startAudioToVideoSession".to_string()
}

fn default_max_session_length_secs() -> u64 {
    3600
}

fn default_max_idle_secs() -> u64 {
    300
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            endpoint: default_avatar_endpoint(),
            api_key: None,
            max_session_length_secs: default_max_session_length_secs(),
            max_idle_secs: default_max_idle_secs(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty defaults to localhost for safety.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Maximum concurrently live sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Idle session expiry in seconds.
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_max_sessions() -> usize {
    64
}

fn default_session_timeout_secs() -> u64 {
    900
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            cors_enabled: default_true(),
            max_sessions: default_max_sessions(),
            session_timeout_secs: default_session_timeout_secs(),
        }
    }
}

/// Deterministic tie-break for equal-price catalog results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Stable id-ascending order.
    #[default]
    IdAscending,
    /// Alphabetical by wine name.
    NameAscending,
}

/// Catalog store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite database path. `:memory:` for tests.
    #[serde(default = "default_catalog_path")]
    pub database_path: String,
    /// Equal-price tie-break policy.
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Result limit for search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    /// Result limit for recommendations.
    #[serde(default = "default_recommend_limit")]
    pub recommend_limit: usize,
}

fn default_catalog_path() -> String {
    "data/catalog.db".to_string()
}

fn default_search_limit() -> usize {
    5
}

fn default_recommend_limit() -> usize {
    3
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database_path: default_catalog_path(),
            tie_break: TieBreak::default(),
            search_limit: default_search_limit(),
            recommend_limit: default_recommend_limit(),
        }
    }
}

/// Cart store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Durable cart database path, independent of session lifetime.
    #[serde(default = "default_cart_path")]
    pub database_path: String,
}

fn default_cart_path() -> String {
    "data/cart.db".to_string()
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            database_path: default_cart_path(),
        }
    }
}

/// Audio bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate delivered by the voice service.
    #[serde(default = "default_source_rate")]
    pub source_sample_rate: u32,
    /// Sample rate the avatar renderer requires.
    #[serde(default = "default_target_rate")]
    pub target_sample_rate: u32,
}

fn default_source_rate() -> u32 {
    48_000
}

fn default_target_rate() -> u32 {
    16_000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            source_sample_rate: default_source_rate(),
            target_sample_rate: default_target_rate(),
        }
    }
}

/// Session policy constants
///
/// The observed design left both of these unbounded; they are configurable
/// policy here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPolicy {
    /// Capacity of the discussed-wines shelf.
    #[serde(default = "default_discussed_capacity")]
    pub discussed_capacity: usize,
    /// Session establishment timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Per-tool-call execution timeout in seconds.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

fn default_discussed_capacity() -> usize {
    12
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_tool_timeout_secs() -> u64 {
    30
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            discussed_capacity: default_discussed_capacity(),
            connect_timeout_ms: default_connect_timeout_ms(),
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.source_sample_rate == 0 || self.audio.target_sample_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "audio".into(),
                message: "sample rates must be positive".into(),
            });
        }
        if self.session.discussed_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.discussed_capacity".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.catalog.search_limit == 0 || self.catalog.recommend_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "catalog".into(),
                message: "result limits must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority: env vars (`SOMMELIER_` prefix, `__` separator) >
/// `config/{env}.toml` > `config/default.toml` > built-in defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    if Path::new("config/default.toml").exists() {
        builder = builder.add_source(File::with_name("config/default"));
    }
    if let Some(env_name) = env {
        let env_file = format!("config/{env_name}");
        if Path::new(&format!("{env_file}.toml")).exists() {
            builder = builder.add_source(File::with_name(&env_file));
        } else {
            tracing::warn!(env = env_name, "environment config file not found, skipping");
        }
    }
    builder = builder.add_source(Environment::with_prefix("SOMMELIER").separator("__"));

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
