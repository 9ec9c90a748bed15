//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// An OpenAI-compatible chat endpoint that can generate test cases.
struct KnownProvider {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    api_base: &'static str,
    key_var: &'static str,
    model_var: &'static str,
    default_model: &'static str,
}

/// Listing order of the providers; the mock provider is always appended last.
const KNOWN_PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        id: "openrouter",
        name: "OpenRouter (DeepSeek)",
        description: "Free: DeepSeek model",
        api_base: "https://openrouter.ai/api/v1",
        key_var: "OPENROUTER_API_KEY",
        model_var: "OPENROUTER_MODEL",
        default_model: "deepseek/deepseek-chat-free",
    },
    KnownProvider {
        id: "gemini",
        name: "Google Gemini",
        description: "Free: 1,500 requests/day",
        api_base: "https://generativelanguage.googleapis.com/v1beta/openai",
        key_var: "GOOGLE_API_KEY",
        model_var: "GEMINI_MODEL",
        default_model: "gemini-1.5-flash",
    },
    KnownProvider {
        id: "groq",
        name: "Groq (Llama 3.1)",
        description: "Free: 14,400 requests/day",
        api_base: "https://api.groq.com/openai/v1",
        key_var: "GROQ_API_KEY",
        model_var: "GROQ_MODEL",
        default_model: "llama-3.1-70b-versatile",
    },
    KnownProvider {
        id: "together",
        name: "Together AI",
        description: "Free: $1 credit on signup",
        api_base: "https://api.together.xyz/v1",
        key_var: "TOGETHER_API_KEY",
        model_var: "TOGETHER_MODEL",
        default_model: "meta-llama/Llama-3-70b-chat-hf",
    },
    KnownProvider {
        id: "anthropic",
        name: "Anthropic Claude",
        description: "Paid: Pay per token",
        api_base: "https://api.anthropic.com/v1",
        key_var: "ANTHROPIC_API_KEY",
        model_var: "ANTHROPIC_MODEL",
        default_model: "claude-sonnet-4-20250514",
    },
];

/// Connection settings for one configured AI provider.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub id: String,
    pub name: String,
    pub description: String,
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub log_level: Level,
    pub cors_origin: String,
    pub token_ttl: chrono::Duration,
    pub generation_timeout: Duration,
    pub max_upload_bytes: usize,
    pub default_provider: String,
    /// Only providers with an API key are listed here.
    pub providers: Vec<ProviderSettings>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var("DATABASE_URL");

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Sessions, Generation and Uploads ---
        let token_hours: i64 = parse_number(&var, "TOKEN_EXPIRY_HOURS", 24)?;
        if token_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_EXPIRY_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }
        let timeout_secs: u64 = parse_number(&var, "GENERATION_TIMEOUT_SECS", 120)?;
        let max_upload_bytes: usize = parse_number(&var, "MAX_UPLOAD_BYTES", 16 * 1024 * 1024)?;

        // --- AI Providers (each optional) ---
        let default_provider =
            var("DEFAULT_AI_PROVIDER").unwrap_or_else(|| "openrouter".to_string());
        let providers = KNOWN_PROVIDERS
            .iter()
            .filter_map(|known| {
                let api_key = var(known.key_var)?;
                Some(ProviderSettings {
                    id: known.id.to_string(),
                    name: known.name.to_string(),
                    description: known.description.to_string(),
                    api_base: known.api_base.to_string(),
                    api_key,
                    model: var(known.model_var).unwrap_or_else(|| known.default_model.to_string()),
                })
            })
            .collect();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            token_ttl: chrono::Duration::hours(token_hours),
            generation_timeout: Duration::from_secs(timeout_secs),
            max_upload_bytes,
            default_provider,
            providers,
        })
    }
}

fn parse_number<T, F>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
