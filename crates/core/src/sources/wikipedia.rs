use super::{MediaSource, WIKI_USER_AGENT, http_client};
use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, time::Duration};
use tracing::debug;

const API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Lead image of an encyclopedia article. Needs no credentials.
pub struct WikipediaSource {
    http: reqwest::Client,
}

impl WikipediaSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout, Some(WIKI_USER_AGENT))?,
        })
    }

    async fn page_image(&self, title: &str) -> Result<Option<MediaResult>> {
        let response: PageImageResponse = self
            .http
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("prop", "pageimages"),
                ("format", "json"),
                ("piprop", "original"),
                ("titles", title),
            ])
            .send()
            .await
            .context("Wikipedia page image request failed")?
            .error_for_status()?
            .json()
            .await
            .context("failed to parse Wikipedia page image response")?;
        Ok(original_image(response, title))
    }

    async fn resolve_title(&self, query: &str) -> Result<Option<String>> {
        let response: Value = self
            .http
            .get(API_URL)
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", "1"),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Wikipedia open search request failed")?
            .error_for_status()?
            .json()
            .await
            .context("failed to parse Wikipedia open search response")?;
        Ok(first_search_title(&response))
    }
}

#[async_trait]
impl MediaSource for WikipediaSource {
    fn kind(&self) -> MediaKind {
        MediaKind::WikipediaImage
    }

    fn available(&self) -> bool {
        true
    }

    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>> {
        let query = request.query.trim();
        if let Some(found) = self.page_image(query).await? {
            return Ok(Some(found));
        }
        match self.resolve_title(query).await? {
            Some(title) if !title.eq_ignore_ascii_case(query) => {
                debug!(%query, %title, "Retrying Wikipedia image with resolved title");
                self.page_image(&title).await
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PageImageResponse {
    #[serde(default)]
    query: PageImageQuery,
}

#[derive(Debug, Default, Deserialize)]
struct PageImageQuery {
    #[serde(default)]
    pages: HashMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    original: Option<OriginalImage>,
}

#[derive(Debug, Deserialize)]
struct OriginalImage {
    source: String,
    width: Option<u32>,
    height: Option<u32>,
}

fn original_image(response: PageImageResponse, title: &str) -> Option<MediaResult> {
    let image = response
        .query
        .pages
        .into_values()
        .find_map(|page| page.original)?;
    Some(
        MediaResult::new(
            image.source,
            "Wikipedia",
            format!("Image from Wikipedia article: {title}"),
        )
        .with_size(image.width, image.height),
    )
}

/// Open search replies with `[query, [titles], [descriptions], [urls]]`.
fn first_search_title(response: &Value) -> Option<String> {
    response
        .get(1)?
        .as_array()?
        .first()?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_original_image() {
        let response: PageImageResponse = serde_json::from_value(json!({
            "batchcomplete": "",
            "query": {"pages": {"4650": {
                "pageid": 4650,
                "title": "Black hole",
                "original": {"source": "https://upload.wikimedia.org/bh.jpg", "width": 1920, "height": 1080}
            }}}
        }))
        .unwrap();
        let result = original_image(response, "Black hole").unwrap();
        assert_eq!(result.url, "https://upload.wikimedia.org/bh.jpg");
        assert_eq!(result.source, "Wikipedia");
        assert_eq!(result.attribution, "Image from Wikipedia article: Black hole");
        assert_eq!((result.width, result.height), (Some(1920), Some(1080)));
    }

    #[test]
    fn test_missing_page_has_no_image() {
        let response: PageImageResponse = serde_json::from_value(json!({
            "query": {"pages": {"-1": {"ns": 0, "title": "Blak hol", "missing": ""}}}
        }))
        .unwrap();
        assert!(original_image(response, "Blak hol").is_none());

        let empty: PageImageResponse = serde_json::from_value(json!({})).unwrap();
        assert!(original_image(empty, "x").is_none());
    }

    #[test]
    fn test_first_search_title() {
        let hit = json!(["blak hol", ["Black hole"], [""], ["https://en.wikipedia.org/wiki/Black_hole"]]);
        assert_eq!(first_search_title(&hit).as_deref(), Some("Black hole"));
        assert_eq!(first_search_title(&json!(["zzzz", [], [], []])), None);
        assert_eq!(first_search_title(&json!({"error": "bad"})), None);
    }
}
