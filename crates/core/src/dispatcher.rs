//! Media Dispatching
//!
//! Routes each [`MediaRequest`] to the source that serves its kind. Every failure
//! (missing source, missing credentials, transport error, empty or placeholder
//! result) is logged and reported as "no media".

use crate::{
    media::{MediaKind, MediaRequest, MediaResult},
    sources::MediaSource,
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tracing::{debug, warn};

/// Encyclopedia queries longer than this many words are treated as sentences.
pub const MAX_ENCYCLOPEDIA_QUERY_WORDS: usize = 3;

#[derive(Clone, Default)]
pub struct MediaDispatcher {
    sources: HashMap<MediaKind, Arc<dyn MediaSource>>,
}

impl MediaDispatcher {
    pub fn new(sources: impl IntoIterator<Item = Arc<dyn MediaSource>>) -> Self {
        let mut dispatcher = Self::default();
        for source in sources {
            dispatcher = dispatcher.with_source(source);
        }
        dispatcher
    }

    /// Registers a source for its kind, replacing any earlier one.
    pub fn with_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.sources.insert(source.kind(), source);
        self
    }

    /// Availability per source name, covering every media kind.
    pub fn availability(&self) -> BTreeMap<String, bool> {
        MediaKind::ALL
            .iter()
            .map(|kind| (kind.source_name().to_string(), self.is_available(*kind)))
            .collect()
    }

    /// Kinds whose source is registered and available, in [`MediaKind::ALL`] order.
    pub fn available_kinds(&self) -> Vec<MediaKind> {
        MediaKind::ALL
            .into_iter()
            .filter(|kind| self.is_available(*kind))
            .collect()
    }

    fn is_available(&self, kind: MediaKind) -> bool {
        self.sources.get(&kind).is_some_and(|s| s.available())
    }

    /// Resolves one request to a usable media result.
    pub async fn resolve(&self, request: &MediaRequest, topic_label: &str) -> Option<MediaResult> {
        let Some(source) = self.sources.get(&request.kind) else {
            debug!(kind = %request.kind, "No source registered for media kind");
            return None;
        };
        if !source.available() {
            debug!(kind = %request.kind, "Media source unavailable");
            return None;
        }

        let request = normalize_request(request, topic_label);
        match source.fetch(&request).await {
            Ok(Some(result)) if result.is_usable() => Some(result),
            Ok(Some(result)) => {
                warn!(kind = %request.kind, url = %result.url, "Discarding unusable media result");
                None
            }
            Ok(None) => {
                debug!(kind = %request.kind, query = %request.query, "No media found");
                None
            }
            Err(e) => {
                warn!(kind = %request.kind, query = %request.query, error = ?e, "Media lookup failed");
                None
            }
        }
    }
}

/// Encyclopedia lookups need an article title, so sentence-like queries fall
/// back to the topic label.
fn normalize_request(request: &MediaRequest, topic_label: &str) -> MediaRequest {
    let mut normalized = request.clone();
    if request.kind == MediaKind::WikipediaImage
        && request.query.split_whitespace().count() > MAX_ENCYCLOPEDIA_QUERY_WORDS
    {
        debug!(query = %request.query, topic = %topic_label, "Replacing long encyclopedia query");
        normalized.query = topic_label.to_string();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockMediaSource;
    use anyhow::anyhow;
    use mockall::predicate::*;

    fn mock(kind: MediaKind, available: bool) -> MockMediaSource {
        let mut source = MockMediaSource::new();
        source.expect_kind().return_const(kind);
        source.expect_available().return_const(available);
        source
    }

    fn dispatcher(source: MockMediaSource) -> MediaDispatcher {
        MediaDispatcher::new([Arc::new(source) as Arc<dyn MediaSource>])
    }

    #[tokio::test]
    async fn test_resolves_through_matching_source() {
        let mut source = mock(MediaKind::Xkcd, true);
        source
            .expect_fetch()
            .with(eq(MediaRequest::new(MediaKind::Xkcd, "gravity")))
            .times(1)
            .returning(|_| Ok(Some(MediaResult::new("https://imgs.xkcd.com/comics/a.png", "xkcd", "xkcd #1"))));

        let result = dispatcher(source)
            .resolve(&MediaRequest::new(MediaKind::Xkcd, "gravity"), "Gravity")
            .await;
        assert_eq!(result.unwrap().source, "xkcd");
    }

    #[tokio::test]
    async fn test_missing_or_unavailable_source_yields_nothing() {
        let empty = MediaDispatcher::default();
        assert!(empty.resolve(&MediaRequest::new(MediaKind::Tweet, "x"), "X").await.is_none());

        let mut source = mock(MediaKind::Tweet, false);
        source.expect_fetch().never();
        let dispatcher = dispatcher(source);
        assert!(dispatcher.resolve(&MediaRequest::new(MediaKind::Tweet, "x"), "X").await.is_none());
    }

    #[tokio::test]
    async fn test_errors_and_placeholders_are_discarded() {
        let mut failing = mock(MediaKind::Reddit, true);
        failing.expect_fetch().returning(|_| Err(anyhow!("connection reset")));
        assert!(dispatcher(failing)
            .resolve(&MediaRequest::new(MediaKind::Reddit, "q"), "Q")
            .await
            .is_none());

        let mut fake = mock(MediaKind::Unsplash, true);
        fake.expect_fetch()
            .returning(|_| Ok(Some(MediaResult::new("https://via.placeholder.com/600", "Unsplash", ""))));
        assert!(dispatcher(fake)
            .resolve(&MediaRequest::new(MediaKind::Unsplash, "q"), "Q")
            .await
            .is_none());

        let mut empty = mock(MediaKind::Wikimedia, true);
        empty.expect_fetch().returning(|_| Ok(None));
        assert!(dispatcher(empty)
            .resolve(&MediaRequest::new(MediaKind::Wikimedia, "q"), "Q")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_long_encyclopedia_query_uses_topic_label() {
        let mut source = mock(MediaKind::WikipediaImage, true);
        source
            .expect_fetch()
            .with(eq(MediaRequest::new(MediaKind::WikipediaImage, "Black Holes")))
            .times(1)
            .returning(|_| Ok(Some(MediaResult::new("https://upload.wikimedia.org/bh.jpg", "Wikipedia", ""))));
        let result = dispatcher(source)
            .resolve(
                &MediaRequest::new(MediaKind::WikipediaImage, "how light bends around a black hole"),
                "Black Holes",
            )
            .await;
        assert!(result.is_some());
    }

    #[test]
    fn test_short_queries_and_other_kinds_are_untouched() {
        let short = MediaRequest::new(MediaKind::WikipediaImage, "Event horizon telescope");
        assert_eq!(normalize_request(&short, "Black Holes"), short);
        let long_photo = MediaRequest::new(MediaKind::Unsplash, "a very long photo search query");
        assert_eq!(normalize_request(&long_photo, "Black Holes"), long_photo);
    }

    #[test]
    fn test_availability_covers_every_source_name() {
        let dispatcher = MediaDispatcher::new([
            Arc::new(mock(MediaKind::Xkcd, true)) as Arc<dyn MediaSource>,
            Arc::new(mock(MediaKind::Meme, false)) as Arc<dyn MediaSource>,
        ]);
        let availability = dispatcher.availability();
        assert_eq!(availability.len(), MediaKind::ALL.len());
        assert_eq!(availability["xkcd"], true);
        assert_eq!(availability["imgflip"], false);
        assert_eq!(availability["wikipedia"], false);
        assert_eq!(dispatcher.available_kinds(), vec![MediaKind::Xkcd]);
    }
}
