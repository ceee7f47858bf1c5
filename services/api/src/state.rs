//! Shared Application State
//!
//! This module defines the `AppState` struct and builds the feed pipeline from
//! the loaded configuration.

use crate::config::{Config, Provider};
use anyhow::Context;
use sciscroll_core::{
    ExplorationFeed,
    dispatcher::MediaDispatcher,
    llm_client::{AnthropicOrchestrator, OpenAICompatibleOrchestrator, Orchestrator},
    sources,
};
use std::sync::Arc;
use tracing::{info, warn};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<ExplorationFeed>,
}

/// Builds the orchestrator for the configured provider. A missing key yields
/// an orchestrator that reports itself unavailable.
pub fn build_orchestrator(config: &Config) -> anyhow::Result<Arc<dyn Orchestrator>> {
    let api_key = config.orchestrator_api_key();
    if api_key.is_none() {
        warn!(provider = ?config.provider, "No orchestrator API key configured; content endpoints will answer 503");
    }
    let settings = config.orchestrator_settings();
    let orchestrator: Arc<dyn Orchestrator> = match config.provider {
        Provider::Anthropic => Arc::new(
            AnthropicOrchestrator::new(api_key, settings)
                .context("Failed to create Anthropic orchestrator")?,
        ),
        Provider::OpenAI => Arc::new(
            OpenAICompatibleOrchestrator::new(api_key, &config.openai_api_base, settings)
                .context("Failed to create OpenAI-compatible orchestrator")?,
        ),
    };
    Ok(orchestrator)
}

/// Builds the exploration feed with every media source.
pub fn build_feed(config: &Config) -> anyhow::Result<ExplorationFeed> {
    let orchestrator = build_orchestrator(config)?;
    let sources = sources::build_all(&config.source_settings())
        .context("Failed to create media sources")?;
    let feed = ExplorationFeed::new(orchestrator, MediaDispatcher::new(sources));
    info!(availability = ?feed.availability(), "Exploration feed ready");
    Ok(feed)
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            feed: Arc::new(build_feed(config)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(provider: Provider, key: Option<&str>) -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            provider,
            anthropic_api_key: key.map(str::to_string),
            openai_api_key: key.map(str::to_string),
            openai_api_base: "http://localhost:11434/v1".to_string(),
            orchestrator_model: "test-model".to_string(),
            orchestrator_max_tokens: 256,
            orchestrator_timeout: Duration::from_secs(1),
            media_timeout: Duration::from_secs(1),
            unsplash_access_key: None,
            reddit_client_id: None,
            reddit_client_secret: None,
            reddit_user_agent: "SciScroll/1.0".to_string(),
            twitter_bearer_token: None,
            imgflip_username: None,
            imgflip_password: None,
            log_level: tracing::Level::INFO,
        }
    }

    #[test]
    fn test_state_without_orchestrator_key() {
        let state = AppState::from_config(&config(Provider::Anthropic, None)).unwrap();
        let availability = state.feed.availability();
        assert!(!availability["orchestrator"]);
        assert!(availability["wikipedia"]);
        assert!(!availability["reddit"]);
    }

    #[test]
    fn test_orchestrator_follows_provider() {
        for provider in [Provider::Anthropic, Provider::OpenAI] {
            assert!(build_orchestrator(&config(provider, Some("key"))).unwrap().available());
            assert!(!build_orchestrator(&config(provider, None)).unwrap().available());
        }
    }
}
