use super::{MediaSource, http_client, non_empty};
use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::{collections::HashMap, time::Duration};

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const MAX_RESULTS: &str = "10";

/// Recent short-post search.
pub struct TwitterSource {
    bearer_token: Option<String>,
    http: reqwest::Client,
}

impl TwitterSource {
    pub fn new(bearer_token: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            bearer_token: non_empty(bearer_token),
            http: http_client(timeout, None)?,
        })
    }
}

#[async_trait]
impl MediaSource for TwitterSource {
    fn kind(&self) -> MediaKind {
        MediaKind::Tweet
    }

    fn available(&self) -> bool {
        self.bearer_token.is_some()
    }

    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>> {
        let Some(token) = self.bearer_token.as_deref() else {
            return Ok(None);
        };
        let query = format!(
            "{} (science OR research OR study) -is:retweet lang:en",
            request.query
        );
        let response: SearchResponse = self
            .http
            .get(SEARCH_URL)
            .query(&[
                ("query", query.as_str()),
                ("max_results", MAX_RESULTS),
                ("tweet.fields", "author_id,created_at,public_metrics,text"),
                ("expansions", "author_id"),
                ("user.fields", "name,username"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .context("Twitter search request failed")?
            .error_for_status()?
            .json()
            .await
            .context("failed to parse Twitter search response")?;
        Ok(first_tweet(response))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: String,
    author_id: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    public_metrics: Metrics,
}

#[derive(Debug, Default, Deserialize)]
struct Metrics {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    retweet_count: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    name: String,
    username: Option<String>,
}

fn first_tweet(response: SearchResponse) -> Option<MediaResult> {
    let users: HashMap<&str, &User> = response
        .includes
        .users
        .iter()
        .map(|u| (u.id.as_str(), u))
        .collect();
    let tweet = response.data.first()?;
    let author = tweet.author_id.as_deref().and_then(|id| users.get(id));
    let username = author
        .and_then(|u| u.username.as_deref())
        .unwrap_or("unknown");
    let name = author.map(|u| u.name.as_str()).unwrap_or_default();
    Some(
        MediaResult::new(
            format!("https://twitter.com/{username}/status/{}", tweet.id),
            "Twitter/X",
            format!("@{username} ({name})"),
        )
        .with_extra("text", tweet.text.clone())
        .with_extra("likes", tweet.public_metrics.like_count)
        .with_extra("retweets", tweet.public_metrics.retweet_count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_tweet_with_author() {
        let response: SearchResponse = serde_json::from_value(json!({
            "data": [
                {"id": "177", "author_id": "9", "text": "New CRISPR base editors!", "public_metrics": {"like_count": 52, "retweet_count": 7}},
                {"id": "178", "author_id": "9", "text": "second"}
            ],
            "includes": {"users": [{"id": "9", "name": "Jane Lab", "username": "janelab"}]}
        }))
        .unwrap();
        let result = first_tweet(response).unwrap();
        assert_eq!(result.url, "https://twitter.com/janelab/status/177");
        assert_eq!(result.source, "Twitter/X");
        assert_eq!(result.attribution, "@janelab (Jane Lab)");
        assert_eq!(result.extras["text"], "New CRISPR base editors!");
        assert_eq!(result.extras["likes"], 52);
        assert_eq!(result.extras["retweets"], 7);
    }

    #[test]
    fn test_unknown_author_and_empty_results() {
        let response: SearchResponse =
            serde_json::from_value(json!({"data": [{"id": "5", "text": "hi"}]})).unwrap();
        let result = first_tweet(response).unwrap();
        assert_eq!(result.url, "https://twitter.com/unknown/status/5");
        assert_eq!(result.attribution, "@unknown ()");

        let empty: SearchResponse = serde_json::from_value(json!({"meta": {"result_count": 0}})).unwrap();
        assert!(first_tweet(empty).is_none());
    }
}
