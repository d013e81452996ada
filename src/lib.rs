use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod config;
mod error;
mod extractor;
mod fetcher;
#[cfg(feature = "logging")]
mod logging;
mod media;
mod redirect;
mod resolver;
mod scrape;
mod thumbnail;
mod utils;

pub use config::{
    FetchOptions, UrlGenerationOptions, DEFAULT_TIMEOUT_MS, MAX_REDIRECTS, MAX_THUMBNAIL_BYTES,
    THUMBNAIL_WIDTH_PX,
};
pub use error::PreviewError;
pub use extractor::MetadataExtractor;
pub use fetcher::{collect_stream, ByteStream, HttpStreamFetcher, StreamFetcher};
#[cfg(feature = "logging")]
pub use logging::{log_url_info_card, setup_logging, LogConfig, LogLevelGuard};
pub use media::{
    ImageMessage, MediaPreparer, MediaSource, MediaType, MediaUploader, PrepareOptions,
    PreparedMedia, UploadedMedia, UploadingPreparer,
};
pub use redirect::{is_same_site, RedirectPolicy, RedirectState};
pub use resolver::UrlInfoResolver;
pub use scrape::{HtmlScraper, ScrapeOptions, ScrapedPage, Scraper};
pub use thumbnail::{cap_thumbnail, JpegThumbnailer, Thumbnail, ThumbnailExtractor};
pub use utils::ensure_scheme;

/// A resolved link preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlInfo {
    #[serde(rename = "canonical-url")]
    pub canonical_url: String,
    /// The caller's text, untouched by scheme normalization.
    #[serde(rename = "matched-text")]
    pub matched_text: String,
    pub title: String,
    pub description: Option<String>,
    pub original_thumbnail_url: Option<String>,
    pub thumbnail: Thumbnail,
    /// Requested width, not a measurement of the decoded image.
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl UrlInfo {
    pub fn jpeg_thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.jpeg()
    }

    pub fn high_quality_thumbnail(&self) -> Option<&ImageMessage> {
        self.thumbnail.attachment()
    }
}

#[async_trait]
pub trait PreviewGenerator {
    /// `Ok(None)` means the text has no preview; it is not a failure.
    async fn get_url_info(
        &self,
        text: &str,
        opts: &UrlGenerationOptions,
    ) -> Result<Option<UrlInfo>, PreviewError>;
}
