use crate::config::UrlGenerationOptions;
use crate::fetcher::{HttpStreamFetcher, StreamFetcher};
use crate::media::{MediaPreparer, MediaSource, MediaType, MediaUploader, PrepareOptions, UploadingPreparer};
use crate::redirect::{RedirectPolicy, RedirectState};
use crate::scrape::{HtmlScraper, ScrapeOptions, Scraper};
use crate::thumbnail::{cap_thumbnail, JpegThumbnailer, Thumbnail, ThumbnailExtractor};
use crate::utils::ensure_scheme;
use crate::{PreviewError, PreviewGenerator, UrlInfo};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns text holding a URL into a [`UrlInfo`].
///
/// Holds only shared, immutable collaborators, so one resolver can serve any
/// number of concurrent calls.
#[derive(Clone)]
pub struct UrlInfoResolver {
    scraper: Arc<dyn Scraper>,
    stream_fetcher: Arc<dyn StreamFetcher>,
    thumbnailer: Arc<dyn ThumbnailExtractor>,
    preparer: Arc<dyn MediaPreparer>,
}

impl Default for UrlInfoResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlInfoResolver {
    pub fn new() -> Self {
        let stream_fetcher: Arc<dyn StreamFetcher> = Arc::new(HttpStreamFetcher::new());
        let thumbnailer: Arc<dyn ThumbnailExtractor> = Arc::new(JpegThumbnailer::new());
        let preparer = UploadingPreparer::new()
            .with_fetcher(Arc::clone(&stream_fetcher))
            .with_thumbnailer(Arc::clone(&thumbnailer));

        Self {
            scraper: Arc::new(HtmlScraper::new()),
            stream_fetcher,
            thumbnailer,
            preparer: Arc::new(preparer),
        }
    }

    pub fn with_scraper(mut self, scraper: Arc<dyn Scraper>) -> Self {
        self.scraper = scraper;
        self
    }

    pub fn with_stream_fetcher(mut self, stream_fetcher: Arc<dyn StreamFetcher>) -> Self {
        self.stream_fetcher = stream_fetcher;
        self
    }

    pub fn with_thumbnailer(mut self, thumbnailer: Arc<dyn ThumbnailExtractor>) -> Self {
        self.thumbnailer = thumbnailer;
        self
    }

    pub fn with_preparer(mut self, preparer: Arc<dyn MediaPreparer>) -> Self {
        self.preparer = preparer;
        self
    }

    /// Resolves `text` to a preview.
    ///
    /// Returns `Ok(None)` when the scraper reports nothing to preview or the page
    /// has no title. Scrape failures and upload failures are returned as errors;
    /// a failed direct thumbnail fetch only drops the thumbnail.
    #[instrument(level = "debug", skip(self, opts))]
    pub async fn get_url_info(
        &self,
        text: &str,
        opts: &UrlGenerationOptions,
    ) -> Result<Option<UrlInfo>, PreviewError> {
        match self.resolve(text, opts).await {
            Err(e) if e.is_no_preview() => {
                debug!(error = %e, "No preview for text");
                Ok(None)
            }
            other => other,
        }
    }

    /// Resolves several texts concurrently. Results keep the input order.
    pub async fn get_url_infos(
        &self,
        texts: &[&str],
        opts: &UrlGenerationOptions,
    ) -> Vec<Result<Option<UrlInfo>, PreviewError>> {
        let futures = texts.iter().map(|text| self.get_url_info(text, opts));
        futures::future::join_all(futures).await
    }

    async fn resolve(
        &self,
        text: &str,
        opts: &UrlGenerationOptions,
    ) -> Result<Option<UrlInfo>, PreviewError> {
        let preview_link = ensure_scheme(text);
        let scrape_options = ScrapeOptions {
            fetch: opts.fetch.clone(),
            redirects: RedirectPolicy::new(opts.max_redirects),
        };
        let mut redirects = RedirectState::new();

        let page = self
            .scraper
            .scrape(&preview_link, &scrape_options, &mut redirects)
            .await?;

        debug!(
            url = %page.url,
            redirects = redirects.accepted(),
            "Scraped page metadata"
        );

        let Some(title) = page.title.filter(|title| !title.is_empty()) else {
            return Ok(None);
        };
        let image = page.images.into_iter().next();

        let thumbnail = match image.as_deref() {
            Some(image_url) => match &opts.uploader {
                Some(uploader) => self.upload_thumbnail(image_url, uploader, opts).await?,
                None => self.direct_thumbnail(image_url, &preview_link, opts).await,
            },
            None => Thumbnail::None,
        };

        Ok(Some(UrlInfo {
            canonical_url: page.url,
            matched_text: text.to_string(),
            title,
            description: page.description,
            original_thumbnail_url: image,
            thumbnail,
            thumbnail_width: opts.thumbnail_width,
            thumbnail_height: opts.thumbnail_width,
        }))
    }

    async fn upload_thumbnail(
        &self,
        image_url: &str,
        uploader: &Arc<dyn MediaUploader>,
        opts: &UrlGenerationOptions,
    ) -> Result<Thumbnail, PreviewError> {
        let options = PrepareOptions {
            uploader: Arc::clone(uploader),
            media_type: MediaType::ThumbnailLink,
            fetch: opts.fetch.clone(),
        };
        let prepared = self
            .preparer
            .prepare(MediaSource::Url(image_url.to_string()), &options)
            .await?;

        let jpeg = prepared
            .image
            .as_ref()
            .and_then(|image| image.jpeg_thumbnail.clone())
            .map(|thumb| cap_thumbnail(thumb, opts.max_thumbnail_bytes));

        Ok(Thumbnail::Uploaded {
            jpeg,
            attachment: prepared.image,
        })
    }

    async fn direct_thumbnail(
        &self,
        image_url: &str,
        preview_link: &str,
        opts: &UrlGenerationOptions,
    ) -> Thumbnail {
        match self.compressed_jpeg_thumbnail(image_url, opts).await {
            Ok(thumb) => Thumbnail::Direct(thumb),
            Err(e) => {
                debug!(
                    error = %e,
                    url = %preview_link,
                    image_url = %image_url,
                    "error in generating thumbnail"
                );
                Thumbnail::None
            }
        }
    }

    async fn compressed_jpeg_thumbnail(
        &self,
        image_url: &str,
        opts: &UrlGenerationOptions,
    ) -> Result<Vec<u8>, PreviewError> {
        let stream = self.stream_fetcher.open_stream(image_url, &opts.fetch).await?;
        let thumb = self.thumbnailer.extract(stream, opts.thumbnail_width).await?;
        Ok(cap_thumbnail(thumb, opts.max_thumbnail_bytes))
    }
}

#[async_trait]
impl PreviewGenerator for UrlInfoResolver {
    async fn get_url_info(
        &self,
        text: &str,
        opts: &UrlGenerationOptions,
    ) -> Result<Option<UrlInfo>, PreviewError> {
        UrlInfoResolver::get_url_info(self, text, opts).await
    }
}
