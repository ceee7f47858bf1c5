use super::{MediaSource, WIKI_USER_AGENT, http_client};
use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::{collections::HashMap, sync::LazyLock, time::Duration};

const API_URL: &str = "https://commons.wikimedia.org/w/api.php";
const SEARCH_LIMIT: &str = "10";
const DESCRIPTION_MAX_CHARS: usize = 200;

/// Title fragments of files that are rarely diagrams.
const SKIPPED_TITLE_WORDS: [&str; 11] = [
    "photo",
    "portrait",
    "logo",
    "flag",
    "championship",
    "competition",
    "tournament",
    "award",
    "ceremony",
    "screenshot",
    "map of",
];

const IMAGE_EXTENSIONS: [&str; 5] = [".svg", ".png", ".jpg", ".jpeg", ".gif"];

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid HTML tag pattern"));

/// Diagram search on the media commons. Needs no credentials.
pub struct WikimediaSource {
    http: reqwest::Client,
}

impl WikimediaSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout, Some(WIKI_USER_AGENT))?,
        })
    }

    async fn search(&self, search: &str) -> Result<Vec<FilePage>> {
        let response: SearchResponse = self
            .http
            .get(API_URL)
            .query(&[
                ("action", "query"),
                ("generator", "search"),
                ("gsrsearch", search),
                ("gsrnamespace", "6"),
                ("gsrlimit", SEARCH_LIMIT),
                ("prop", "imageinfo"),
                ("iiprop", "url|size|extmetadata"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Wikimedia Commons search failed")?
            .error_for_status()?
            .json()
            .await
            .context("failed to parse Wikimedia Commons response")?;
        Ok(response
            .query
            .map(|q| q.pages.into_values().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl MediaSource for WikimediaSource {
    fn kind(&self) -> MediaKind {
        MediaKind::Wikimedia
    }

    fn available(&self) -> bool {
        true
    }

    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>> {
        let query = request.query.trim();
        let focused = format!(
            "\"{query}\" filetype:svg OR filetype:png (diagram OR schematic OR illustration OR physics OR science)"
        );
        let mut pages = self.search(&focused).await?;
        if pages.is_empty() {
            pages = self.search(&format!("{query} diagram")).await?;
        }
        Ok(pick_diagram(pages))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    pages: HashMap<String, FilePage>,
}

#[derive(Debug, Deserialize)]
struct FilePage {
    #[serde(default)]
    title: String,
    /// Search rank.
    index: Option<u32>,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    extmetadata: ExtMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ExtMetadata {
    #[serde(rename = "ImageDescription")]
    image_description: Option<MetadataValue>,
}

#[derive(Debug, Deserialize)]
struct MetadataValue {
    #[serde(default)]
    value: String,
}

fn pick_diagram(mut pages: Vec<FilePage>) -> Option<MediaResult> {
    pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));
    pages.into_iter().find_map(|page| {
        let title = page.title.to_lowercase();
        if SKIPPED_TITLE_WORDS.iter().any(|w| title.contains(w)) {
            return None;
        }
        let info = page.imageinfo.into_iter().next()?;
        let url = info.url?;
        let lower_url = url.to_lowercase();
        if !IMAGE_EXTENSIONS.iter().any(|ext| lower_url.ends_with(ext)) {
            return None;
        }
        let description = info
            .extmetadata
            .image_description
            .map(|d| clean_description(&d.value))
            .unwrap_or_default();
        let file = if page.title.is_empty() { "File" } else { page.title.as_str() };
        Some(
            MediaResult::new(url, "Wikimedia Commons", format!("Wikimedia Commons: {file}"))
                .with_size(info.width, info.height)
                .with_extra("description", description),
        )
    })
}

fn clean_description(html: &str) -> String {
    HTML_TAG
        .replace_all(html, "")
        .chars()
        .take(DESCRIPTION_MAX_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pages(value: serde_json::Value) -> Vec<FilePage> {
        let response: SearchResponse = serde_json::from_value(value).unwrap();
        response.query.unwrap().pages.into_values().collect()
    }

    #[test]
    fn test_pick_diagram_prefers_rank_and_skips_photos() {
        let found = pick_diagram(pages(json!({"query": {"pages": {
            "1": {"title": "File:Photo of a lab.jpg", "index": 1,
                  "imageinfo": [{"url": "https://upload.wikimedia.org/lab.jpg"}]},
            "2": {"title": "File:DNA structure.svg", "index": 2,
                  "imageinfo": [{"url": "https://upload.wikimedia.org/dna.svg", "width": 800, "height": 600,
                                 "extmetadata": {"ImageDescription": {"value": "<b>Double</b> helix"}}}]},
            "3": {"title": "File:DNA other.png", "index": 3,
                  "imageinfo": [{"url": "https://upload.wikimedia.org/other.png"}]}
        }}})))
        .unwrap();
        assert_eq!(found.url, "https://upload.wikimedia.org/dna.svg");
        assert_eq!(found.source, "Wikimedia Commons");
        assert_eq!(found.attribution, "Wikimedia Commons: File:DNA structure.svg");
        assert_eq!(found.extras["description"], "Double helix");
        assert_eq!(found.width, Some(800));
    }

    #[test]
    fn test_pick_diagram_rejects_other_formats() {
        let found = pick_diagram(pages(json!({"query": {"pages": {
            "1": {"title": "File:Lecture.pdf", "index": 1,
                  "imageinfo": [{"url": "https://upload.wikimedia.org/lecture.pdf"}]},
            "2": {"title": "File:Noinfo.svg", "index": 2}
        }}})));
        assert!(found.is_none());
    }

    #[test]
    fn test_empty_search() {
        let response: SearchResponse = serde_json::from_value(json!({"batchcomplete": ""})).unwrap();
        assert!(response.query.is_none());
        assert!(pick_diagram(Vec::new()).is_none());
    }

    #[test]
    fn test_clean_description_truncates() {
        let long = format!("<p>{}</p>", "a".repeat(300));
        assert_eq!(clean_description(&long).chars().count(), 200);
        assert_eq!(clean_description("<i>x</i> &lt;y"), "x &lt;y");
    }
}
