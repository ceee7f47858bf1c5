//! Media kinds, media requests from the orchestrator and resolved media results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Substring that marks a stub or fabricated media URL.
pub const PLACEHOLDER_MARKER: &str = "placeholder";

/// The category of an external content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Photo search.
    Unsplash,
    /// Lead image of an encyclopedia article.
    WikipediaImage,
    /// Diagram search on the media commons.
    Wikimedia,
    /// Discussion post.
    Reddit,
    /// Comic.
    Xkcd,
    /// Captioned image.
    Meme,
    /// Short post.
    Tweet,
}

impl MediaKind {
    pub const ALL: [MediaKind; 7] = [
        MediaKind::Unsplash,
        MediaKind::WikipediaImage,
        MediaKind::Wikimedia,
        MediaKind::Reddit,
        MediaKind::Xkcd,
        MediaKind::Meme,
        MediaKind::Tweet,
    ];

    /// Wire name used in plans and content blocks.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Unsplash => "unsplash",
            MediaKind::WikipediaImage => "wikipedia_image",
            MediaKind::Wikimedia => "wikimedia",
            MediaKind::Reddit => "reddit",
            MediaKind::Xkcd => "xkcd",
            MediaKind::Meme => "meme",
            MediaKind::Tweet => "tweet",
        }
    }

    /// Name of the collaborator that serves this kind, as reported by health checks.
    pub fn source_name(&self) -> &'static str {
        match self {
            MediaKind::Unsplash => "unsplash",
            MediaKind::WikipediaImage => "wikipedia",
            MediaKind::Wikimedia => "wikimedia",
            MediaKind::Reddit => "reddit",
            MediaKind::Xkcd => "xkcd",
            MediaKind::Meme => "imgflip",
            MediaKind::Tweet => "twitter",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }

    pub fn from_source_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.source_name() == name)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a text block inside its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextRole {
    #[default]
    Explanation,
    Caption,
    Context,
    Funfact,
}

impl TextRole {
    pub const ALL: [TextRole; 4] = [
        TextRole::Explanation,
        TextRole::Caption,
        TextRole::Context,
        TextRole::Funfact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TextRole::Explanation => "explanation",
            TextRole::Caption => "caption",
            TextRole::Context => "context",
            TextRole::Funfact => "funfact",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

/// Role of a media block inside its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaRole {
    #[default]
    Visual,
    Diagram,
    Discussion,
    Humor,
    Social,
}

impl MediaRole {
    pub const ALL: [MediaRole; 5] = [
        MediaRole::Visual,
        MediaRole::Diagram,
        MediaRole::Discussion,
        MediaRole::Humor,
        MediaRole::Social,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaRole::Visual => "visual",
            MediaRole::Diagram => "diagram",
            MediaRole::Discussion => "discussion",
            MediaRole::Humor => "humor",
            MediaRole::Social => "social",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

/// A media item the orchestrator wants placed in a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaRequest {
    pub kind: MediaKind,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_top: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_bottom: Option<String>,
}

impl MediaRequest {
    pub fn new(kind: MediaKind, query: impl Into<String>) -> Self {
        Self {
            kind,
            query: query.into(),
            caption_top: None,
            caption_bottom: None,
        }
    }

    pub fn with_captions(mut self, top: impl Into<String>, bottom: impl Into<String>) -> Self {
        self.caption_top = Some(top.into());
        self.caption_bottom = Some(bottom.into());
        self
    }
}

/// A media item resolved by one of the content sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaResult {
    pub url: String,
    pub source: String,
    pub attribution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Kind-specific fields such as a post title or a comic's alt text.
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl MediaResult {
    pub fn new(
        url: impl Into<String>,
        source: impl Into<String>,
        attribution: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
            attribution: attribution.into(),
            width: None,
            height: None,
            extras: Map::new(),
        }
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extras.insert(key.to_string(), value.into());
        self
    }

    /// Whether the URL carries the placeholder marker (case-insensitive).
    pub fn is_placeholder(&self) -> bool {
        self.url.to_lowercase().contains(PLACEHOLDER_MARKER)
    }

    /// A result is usable when it has a real URL and a source.
    pub fn is_usable(&self) -> bool {
        !self.url.trim().is_empty() && !self.source.trim().is_empty() && !self.is_placeholder()
    }
}
