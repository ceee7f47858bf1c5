//! External content sources, one per [`MediaKind`].
//!
//! Every source is optional. A source without credentials reports itself
//! unavailable, and a failed lookup surfaces as an error that the dispatcher
//! logs and discards.

use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

pub mod imgflip;
pub mod reddit;
pub mod twitter;
pub mod unsplash;
pub mod wikimedia;
pub mod wikipedia;
pub mod xkcd;

pub use imgflip::ImgflipSource;
pub use reddit::RedditSource;
pub use twitter::TwitterSource;
pub use unsplash::UnsplashSource;
pub use wikimedia::WikimediaSource;
pub use wikipedia::WikipediaSource;
pub use xkcd::XkcdSource;

/// User agent sent to the public wiki APIs.
pub const WIKI_USER_AGENT: &str = "SciScroll/1.0 (educational project)";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// The media kind this source serves.
    fn kind(&self) -> MediaKind;

    /// Whether the source has the credentials it needs.
    fn available(&self) -> bool;

    /// Looks up one media item. `Ok(None)` means nothing matched.
    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>>;
}

pub(crate) fn http_client(timeout: Duration, user_agent: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent);
    }
    builder.build().context("failed to build media HTTP client")
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Credentials and limits for every media source.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub timeout: Duration,
    pub unsplash_access_key: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,
    pub twitter_bearer_token: Option<String>,
    pub imgflip_username: Option<String>,
    pub imgflip_password: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            unsplash_access_key: None,
            reddit_client_id: None,
            reddit_client_secret: None,
            reddit_user_agent: reddit::DEFAULT_USER_AGENT.to_string(),
            twitter_bearer_token: None,
            imgflip_username: None,
            imgflip_password: None,
        }
    }
}

/// Builds one source per media kind, in [`MediaKind::ALL`] order.
pub fn build_all(settings: &SourceSettings) -> Result<Vec<Arc<dyn MediaSource>>> {
    let timeout = settings.timeout;
    let sources: Vec<Arc<dyn MediaSource>> = vec![
        Arc::new(UnsplashSource::new(settings.unsplash_access_key.clone(), timeout)?),
        Arc::new(WikipediaSource::new(timeout)?),
        Arc::new(WikimediaSource::new(timeout)?),
        Arc::new(RedditSource::new(
            settings.reddit_client_id.clone(),
            settings.reddit_client_secret.clone(),
            &settings.reddit_user_agent,
            timeout,
        )?),
        Arc::new(XkcdSource::new(timeout)?),
        Arc::new(ImgflipSource::new(
            settings.imgflip_username.clone(),
            settings.imgflip_password.clone(),
            timeout,
        )?),
        Arc::new(TwitterSource::new(settings.twitter_bearer_token.clone(), timeout)?),
    ];
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_all_covers_every_kind() {
        let sources = build_all(&SourceSettings::default()).unwrap();
        let kinds: Vec<MediaKind> = sources.iter().map(|s| s.kind()).collect();
        assert_eq!(kinds, MediaKind::ALL.to_vec());
    }

    #[test]
    fn test_keyless_sources_are_always_available() {
        let sources = build_all(&SourceSettings::default()).unwrap();
        let available: Vec<MediaKind> = sources
            .iter()
            .filter(|s| s.available())
            .map(|s| s.kind())
            .collect();
        assert_eq!(
            available,
            vec![MediaKind::WikipediaImage, MediaKind::Wikimedia, MediaKind::Xkcd]
        );
    }

    #[test]
    fn test_credentials_enable_sources() {
        let settings = SourceSettings {
            unsplash_access_key: Some("key".into()),
            reddit_client_id: Some("id".into()),
            reddit_client_secret: Some("secret".into()),
            twitter_bearer_token: Some("token".into()),
            imgflip_username: Some("user".into()),
            imgflip_password: Some("pass".into()),
            ..Default::default()
        };
        let sources = build_all(&settings).unwrap();
        assert!(sources.iter().all(|s| s.available()));
    }

    #[test]
    fn test_blank_credentials_count_as_missing() {
        let settings = SourceSettings {
            unsplash_access_key: Some("   ".into()),
            reddit_client_id: Some("id".into()),
            reddit_client_secret: Some("".into()),
            ..Default::default()
        };
        let sources = build_all(&settings).unwrap();
        assert!(!sources[0].available());
        assert!(!sources[3].available());
    }
}
