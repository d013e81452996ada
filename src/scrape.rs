use crate::config::FetchOptions;
use crate::fetcher::collect_stream;
use crate::redirect::{RedirectPolicy, RedirectState};
use crate::{MetadataExtractor, PreviewError};
use async_trait::async_trait;
use futures::stream::{StreamExt, TryStreamExt};
use reqwest::{header, redirect, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

const DEFAULT_MAX_CONTENT_SIZE: usize = 10 * 1024 * 1024;

/// Metadata found for a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    /// Final location after accepted redirects.
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub fetch: FetchOptions,
    pub redirects: RedirectPolicy,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    /// Looks up preview metadata for `url`.
    ///
    /// Every redirect hop must be offered to `options.redirects` together with
    /// `redirects`; a rejected hop ends redirect following. Implementations
    /// signal "nothing to preview" with [`PreviewError::NoPreviewFound`].
    async fn scrape(
        &self,
        url: &str,
        options: &ScrapeOptions,
        redirects: &mut RedirectState,
    ) -> Result<ScrapedPage, PreviewError>;
}

/// Fetches HTML over HTTP and follows redirects by hand so each hop goes
/// through the redirect policy.
#[derive(Clone)]
pub struct HtmlScraper {
    extractor: MetadataExtractor,
    max_content_size: usize,
}

impl Default for HtmlScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlScraper {
    pub fn new() -> Self {
        Self {
            extractor: MetadataExtractor::new(),
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }

    pub fn with_max_content_size(mut self, max_content_size: usize) -> Self {
        self.max_content_size = max_content_size;
        self
    }

    async fn read_page(&self, response: Response, url: Url) -> Result<ScrapedPage, PreviewError> {
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase());

        if let Some(content_type) = &content_type {
            if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
                debug!(url = %url, content_type = %content_type, "Response is not HTML");
                return Ok(ScrapedPage {
                    url: url.to_string(),
                    ..Default::default()
                });
            }
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_content_size {
                return Err(PreviewError::ContentTooLarge {
                    size: length as usize,
                    limit: self.max_content_size,
                });
            }
        }

        let body = response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(PreviewError::from_reqwest_error)
            .boxed();
        let bytes = collect_stream(body, self.max_content_size).await?;
        let html = String::from_utf8_lossy(&bytes);

        Ok(self.extractor.extract(&html, &url))
    }
}

#[async_trait]
impl Scraper for HtmlScraper {
    #[instrument(level = "debug", skip(self, options, redirects), err)]
    async fn scrape(
        &self,
        url: &str,
        options: &ScrapeOptions,
        redirects: &mut RedirectState,
    ) -> Result<ScrapedPage, PreviewError> {
        let mut current = Url::parse(url)
            .map_err(|e| PreviewError::NoPreviewFound(format!("{url}: {e}")))?;
        if !matches!(current.scheme(), "http" | "https") || current.host_str().is_none() {
            return Err(PreviewError::NoPreviewFound(url.to_string()));
        }

        let client = options.fetch.build_client(redirect::Policy::none())?;

        loop {
            debug!(url = %current, "Fetching page");
            let response = client
                .get(current.clone())
                .send()
                .await
                .map_err(PreviewError::from_reqwest_error)?;

            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|loc| current.join(loc).ok());

                if let Some(next) = location {
                    if options.redirects.accept(redirects, &current, &next) {
                        debug!(from = %current, to = %next, "Following redirect");
                        current = next;
                        continue;
                    }
                    debug!(from = %current, to = %next, "Redirect not followed");
                } else {
                    warn!(status = %status, url = %current, "Redirect without usable Location header");
                }
            } else if !status.is_success() {
                debug!(status = %status, url = %current, "Non-success status, parsing body anyway");
            }

            return self.read_page(response, current).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unparseable_url_is_no_preview() {
        let scraper = HtmlScraper::new();
        let mut state = RedirectState::new();
        let result = scraper
            .scrape(
                "https://check this out example.com/page",
                &ScrapeOptions::default(),
                &mut state,
            )
            .await;

        assert!(matches!(result, Err(PreviewError::NoPreviewFound(_))));
        assert_eq!(state.accepted(), 0);
    }

    #[tokio::test]
    async fn test_non_http_scheme_is_no_preview() {
        let scraper = HtmlScraper::new();
        let mut state = RedirectState::new();
        let result = scraper
            .scrape("ftp://example.com/file", &ScrapeOptions::default(), &mut state)
            .await;

        assert!(result.unwrap_err().is_no_preview());
    }
}
