use super::{MediaSource, http_client, non_empty};
use crate::media::{MediaKind, MediaRequest, MediaResult};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};
use serde::Deserialize;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const TEMPLATES_URL: &str = "https://api.imgflip.com/get_memes";
const CAPTION_URL: &str = "https://api.imgflip.com/caption_image";
/// Only the most popular templates are recognisable enough to use.
const POPULAR_TEMPLATES: usize = 30;

/// Captioned images built from popular meme templates.
pub struct ImgflipSource {
    credentials: Option<(String, String)>,
    http: reqwest::Client,
    templates: CatalogCache<Vec<Template>>,
    rng: std::sync::Mutex<StdRng>,
}

impl ImgflipSource {
    pub fn new(username: Option<String>, password: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_rng(username, password, timeout, StdRng::from_os_rng())
    }

    pub fn with_rng(
        username: Option<String>,
        password: Option<String>,
        timeout: Duration,
        rng: StdRng,
    ) -> Result<Self> {
        Ok(Self {
            credentials: non_empty(username).zip(non_empty(password)),
            http: http_client(timeout, None)?,
            templates: CatalogCache::default(),
            rng: std::sync::Mutex::new(rng),
        })
    }

    /// Forgets the cached template catalog.
    pub async fn reset(&self) {
        self.templates.reset().await;
    }

    async fn templates(&self) -> Result<Arc<Vec<Template>>> {
        self.templates
            .get_or_fetch(move || async move {
                let response: TemplatesResponse = self
                    .http
                    .get(TEMPLATES_URL)
                    .send()
                    .await
                    .context("Imgflip template request failed")?
                    .error_for_status()?
                    .json()
                    .await
                    .context("failed to parse Imgflip templates")?;
                debug!(count = response.data.memes.len(), "Cached Imgflip templates");
                Ok::<_, anyhow::Error>(response.data.memes)
            })
            .await
    }

    fn pick<'a>(&self, templates: &'a [Template]) -> Option<&'a Template> {
        let popular = &templates[..templates.len().min(POPULAR_TEMPLATES)];
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        popular.choose(&mut *rng)
    }

    async fn caption(&self, template: &Template, top: &str, bottom: &str) -> Result<String> {
        let Some((username, password)) = self.credentials.as_ref() else {
            bail!("Imgflip credentials are not configured");
        };
        let response: CaptionResponse = self
            .http
            .post(CAPTION_URL)
            .form(&[
                ("template_id", template.id.as_str()),
                ("username", username.as_str()),
                ("password", password.as_str()),
                ("text0", top),
                ("text1", bottom),
            ])
            .send()
            .await
            .context("Imgflip caption request failed")?
            .error_for_status()?
            .json()
            .await
            .context("failed to parse Imgflip caption response")?;
        match response {
            CaptionResponse {
                success: true,
                data: Some(data),
                ..
            } => Ok(data.url),
            CaptionResponse { error_message, .. } => bail!(
                "Imgflip refused caption: {}",
                error_message.unwrap_or_else(|| "unknown error".to_string())
            ),
        }
    }
}

/// A value fetched at most once. Concurrent callers wait for the same fetch;
/// failed fetches are not cached.
struct CatalogCache<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for CatalogCache<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T> CatalogCache<T> {
    async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Held across the fetch so that only one caller populates the slot.
        let mut slot = self.slot.lock().await;
        if let Some(value) = slot.as_ref() {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(fetch().await?);
        *slot = Some(Arc::clone(&value));
        Ok(value)
    }

    #[cfg(test)]
    async fn seed(&self, value: T) {
        *self.slot.lock().await = Some(Arc::new(value));
    }

    async fn reset(&self) {
        *self.slot.lock().await = None;
    }

    #[cfg(test)]
    async fn is_empty(&self) -> bool {
        self.slot.lock().await.is_none()
    }
}

#[async_trait]
impl MediaSource for ImgflipSource {
    fn kind(&self) -> MediaKind {
        MediaKind::Meme
    }

    fn available(&self) -> bool {
        self.credentials.is_some()
    }

    async fn fetch(&self, request: &MediaRequest) -> Result<Option<MediaResult>> {
        let templates = self.templates().await?;
        let Some(template) = self.pick(&templates) else {
            return Ok(None);
        };

        let mut url = template.url.clone();
        if let (Some(top), Some(bottom)) = (&request.caption_top, &request.caption_bottom) {
            match self.caption(template, top, bottom).await {
                Ok(captioned) => url = captioned,
                Err(e) => warn!(error = ?e, template = %template.name, "Falling back to bare meme template"),
            }
        }
        Ok(Some(template.to_result(url)))
    }
}

#[derive(Debug, Deserialize)]
struct TemplatesResponse {
    data: TemplatesData,
}

#[derive(Debug, Deserialize)]
struct TemplatesData {
    #[serde(default)]
    memes: Vec<Template>,
}

#[derive(Debug, Clone, Deserialize)]
struct Template {
    id: String,
    name: String,
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

impl Template {
    fn to_result(&self, url: String) -> MediaResult {
        MediaResult::new(url, "Imgflip", format!("Meme template: {}", self.name))
            .with_size(self.width, self.height)
    }
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    #[serde(default)]
    success: bool,
    data: Option<CaptionData>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionData {
    url: String,
}
