use super::{MediaSource, http_client, non_empty};
use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const SEARCH_URL: &str = "https://api.unsplash.com/search/photos";
const PER_PAGE: u32 = 5;

/// Photo search.
pub struct UnsplashSource {
    access_key: Option<String>,
    http: reqwest::Client,
}

impl UnsplashSource {
    pub fn new(access_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            access_key: non_empty(access_key),
            http: http_client(timeout, None)?,
        })
    }
}

#[async_trait]
impl MediaSource for UnsplashSource {
    fn kind(&self) -> MediaKind {
        MediaKind::Unsplash
    }

    fn available(&self) -> bool {
        self.access_key.is_some()
    }

    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>> {
        let Some(key) = self.access_key.as_deref() else {
            return Ok(None);
        };
        let per_page = PER_PAGE.to_string();
        let response: SearchResponse = self
            .http
            .get(SEARCH_URL)
            .query(&[
                ("query", request.query.as_str()),
                ("per_page", per_page.as_str()),
                ("orientation", "landscape"),
            ])
            .header("Authorization", format!("Client-ID {key}"))
            .send()
            .await
            .context("Unsplash search request failed")?
            .error_for_status()
            .context("Unsplash search returned an error status")?
            .json()
            .await
            .context("failed to parse Unsplash search response")?;
        debug!(query = %request.query, hits = response.results.len(), "Unsplash search");
        Ok(first_photo(response))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
    user: PhotoUser,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct PhotoUser {
    name: String,
}

fn first_photo(response: SearchResponse) -> Option<MediaResult> {
    let photo = response.results.into_iter().next()?;
    Some(
        MediaResult::new(
            photo.urls.regular,
            "Unsplash",
            format!("Photo by {} on Unsplash", photo.user.name),
        )
        .with_size(photo.width, photo.height),
    )
}
