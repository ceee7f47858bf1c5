use super::{MediaSource, http_client, non_empty};
use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = "SciScroll/1.0";

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const SEARCH_URL: &str = "https://oauth.reddit.com/search";
const SEARCH_LIMIT: &str = "5";
const MIN_SCORE: i64 = 10;
const SUBREDDITS: [&str; 5] = ["science", "askscience", "EverythingScience", "Physics", "biology"];

/// Discussion search over science communities.
pub struct RedditSource {
    credentials: Option<(String, String)>,
    http: reqwest::Client,
    /// Client-credentials token, fetched on first use.
    token: Mutex<Option<String>>,
}

impl RedditSource {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let credentials = non_empty(client_id).zip(non_empty(client_secret));
        Ok(Self {
            credentials,
            http: http_client(timeout, Some(user_agent))?,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self, id: &str, secret: &str) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .basic_auth(id, Some(secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Reddit token request failed")?
            .error_for_status()
            .context("Reddit token request was rejected")?
            .json()
            .await
            .context("failed to parse Reddit token response")?;
        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .context("Reddit token response has no access_token")?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl MediaSource for RedditSource {
    fn kind(&self) -> MediaKind {
        MediaKind::Reddit
    }

    fn available(&self) -> bool {
        self.credentials.is_some()
    }

    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>> {
        let Some((id, secret)) = self.credentials.as_ref() else {
            return Ok(None);
        };
        let token = self.access_token(id, secret).await?;
        let response: Listing = self
            .http
            .get(SEARCH_URL)
            .query(&[
                ("q", search_query(&request.query).as_str()),
                ("sort", "relevance"),
                ("limit", SEARCH_LIMIT),
                ("type", "link"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .context("Reddit search request failed")?
            .error_for_status()?
            .json()
            .await
            .context("failed to parse Reddit search response")?;
        debug!(query = %request.query, posts = response.data.children.len(), "Reddit search");
        Ok(first_popular_post(response))
    }
}

fn search_query(query: &str) -> String {
    let filter = SUBREDDITS
        .iter()
        .map(|s| format!("subreddit:{s}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("{query} ({filter})")
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    permalink: String,
    subreddit: Option<String>,
    author: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    score: i64,
}

fn first_popular_post(listing: Listing) -> Option<MediaResult> {
    let post = listing
        .data
        .children
        .into_iter()
        .map(|c| c.data)
        .find(|p| p.score > MIN_SCORE)?;
    let subreddit = post.subreddit.as_deref().unwrap_or("science");
    let author = post.author.as_deref().unwrap_or("unknown");
    Some(
        MediaResult::new(
            format!("https://reddit.com{}", post.permalink),
            format!("r/{subreddit}"),
            format!("Posted by u/{author} in r/{subreddit}"),
        )
        .with_extra("title", post.title)
        .with_extra("score", post.score),
    )
}
