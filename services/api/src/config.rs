use sciscroll_core::{llm_client::OrchestratorSettings, sources::SourceSettings};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Language model services that can act as the content orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    /// Any service speaking the OpenAI chat completions API.
    OpenAI,
}

impl Provider {
    fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-5-20250929",
            Provider::OpenAI => "gpt-4o",
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub orchestrator_model: String,
    pub orchestrator_max_tokens: u32,
    pub orchestrator_timeout: Duration,
    pub media_timeout: Duration,
    pub unsplash_access_key: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,
    pub twitter_bearer_token: Option<String>,
    pub imgflip_username: Option<String>,
    pub imgflip_password: Option<String>,
    pub log_level: Level,
}

/// Reads a variable, treating an empty value as unset.
fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{raw}': {e}"))),
    }
}

/// Both halves of a credential pair, or neither.
fn credential_pair(
    first: &str,
    second: &str,
) -> Result<(Option<String>, Option<String>), ConfigError> {
    match (var(first), var(second)) {
        (Some(_), None) => Err(ConfigError::MissingVar(format!(
            "{second} must be set together with {first}"
        ))),
        (None, Some(_)) => Err(ConfigError::MissingVar(format!(
            "{first} must be set together with {second}"
        ))),
        pair => Ok(pair),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider_str = var("ORCHESTRATOR_PROVIDER").unwrap_or_else(|| "anthropic".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "anthropic" | "claude" => Provider::Anthropic,
            "openai" => Provider::OpenAI,
            other => {
                return Err(ConfigError::InvalidValue(
                    "ORCHESTRATOR_PROVIDER".to_string(),
                    format!("'{other}' is not one of: anthropic, openai"),
                ));
            }
        };

        let orchestrator_model =
            var("ORCHESTRATOR_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let orchestrator_max_tokens = parse_number("ORCHESTRATOR_MAX_TOKENS", 2048u32)?;
        let orchestrator_timeout =
            Duration::from_secs(parse_number("ORCHESTRATOR_TIMEOUT_SECS", 60u64)?);
        let media_timeout = Duration::from_secs(parse_number("MEDIA_TIMEOUT_SECS", 10u64)?);

        let (reddit_client_id, reddit_client_secret) =
            credential_pair("REDDIT_CLIENT_ID", "REDDIT_CLIENT_SECRET")?;
        let (imgflip_username, imgflip_password) =
            credential_pair("IMGFLIP_USERNAME", "IMGFLIP_PASSWORD")?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            provider,
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_api_base: var("OPENAI_API_BASE")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            orchestrator_model,
            orchestrator_max_tokens,
            orchestrator_timeout,
            media_timeout,
            unsplash_access_key: var("UNSPLASH_ACCESS_KEY"),
            reddit_client_id,
            reddit_client_secret,
            reddit_user_agent: var("REDDIT_USER_AGENT").unwrap_or_else(|| "SciScroll/1.0".to_string()),
            twitter_bearer_token: var("TWITTER_BEARER_TOKEN"),
            imgflip_username,
            imgflip_password,
            log_level,
        })
    }

    /// Credentials of the configured provider, if present.
    pub fn orchestrator_api_key(&self) -> Option<String> {
        match self.provider {
            Provider::Anthropic => self.anthropic_api_key.clone(),
            Provider::OpenAI => self.openai_api_key.clone(),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            model: self.orchestrator_model.clone(),
            max_tokens: self.orchestrator_max_tokens,
            timeout: self.orchestrator_timeout,
        }
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            timeout: self.media_timeout,
            unsplash_access_key: self.unsplash_access_key.clone(),
            reddit_client_id: self.reddit_client_id.clone(),
            reddit_client_secret: self.reddit_client_secret.clone(),
            reddit_user_agent: self.reddit_user_agent.clone(),
            twitter_bearer_token: self.twitter_bearer_token.clone(),
            imgflip_username: self.imgflip_username.clone(),
            imgflip_password: self.imgflip_password.clone(),
        }
    }
}
