//! Configuration management for the sommelier voice shop
//!
//! Supports loading configuration from:
//! - TOML files (`config/default.toml`, `config/{env}.toml`)
//! - Environment variables (`SOMMELIER_` prefix)
//! - Runtime defaults
//!
//! Policy constants the observed design left implicit (discussed-shelf
//! capacity, session establishment timeout) live here rather than as
//! hardcoded values, as does the sommelier persona prompt, which is
//! injected at session start instead of being a module global.

pub mod persona;
pub mod settings;

pub use persona::PersonaConfig;
pub use settings::{
    load_settings, AudioConfig, AvatarConfig, CatalogConfig, CartConfig, ServerConfig,
    SessionPolicy, Settings, TieBreak,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
