use crate::config::FetchOptions;
use crate::fetcher::{collect_stream, HttpStreamFetcher, StreamFetcher};
use crate::thumbnail::{JpegThumbnailer, ThumbnailExtractor};
use crate::PreviewError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const EMBEDDED_THUMBNAIL_WIDTH: u32 = 32;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Media classification handed to the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Image,
    ThumbnailLink,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::ThumbnailLink => "thumbnail-link",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    Bytes(Vec<u8>),
}

/// Where an upload landed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub media_url: String,
    pub direct_path: Option<String>,
}

/// Stores media bytes somewhere the receiving client can download them from.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(
        &self,
        data: Vec<u8>,
        media_type: MediaType,
        fetch: &FetchOptions,
    ) -> Result<UploadedMedia, PreviewError>;
}

/// An uploaded image attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMessage {
    pub url: String,
    pub direct_path: Option<String>,
    pub mimetype: String,
    pub file_length: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub jpeg_thumbnail: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedMedia {
    pub image: Option<ImageMessage>,
}

#[derive(Clone)]
pub struct PrepareOptions {
    pub uploader: Arc<dyn MediaUploader>,
    pub media_type: MediaType,
    pub fetch: FetchOptions,
}

#[async_trait]
pub trait MediaPreparer: Send + Sync {
    async fn prepare(
        &self,
        source: MediaSource,
        options: &PrepareOptions,
    ) -> Result<PreparedMedia, PreviewError>;
}

/// Downloads the image, derives a small embedded thumbnail, and uploads the
/// original bytes through the configured uploader.
#[derive(Clone)]
pub struct UploadingPreparer {
    fetcher: Arc<dyn StreamFetcher>,
    thumbnailer: Arc<dyn ThumbnailExtractor>,
    thumbnail_width: u32,
    max_upload_bytes: usize,
}

impl Default for UploadingPreparer {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadingPreparer {
    pub fn new() -> Self {
        Self {
            fetcher: Arc::new(HttpStreamFetcher::new()),
            thumbnailer: Arc::new(JpegThumbnailer::new()),
            thumbnail_width: EMBEDDED_THUMBNAIL_WIDTH,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn StreamFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_thumbnailer(mut self, thumbnailer: Arc<dyn ThumbnailExtractor>) -> Self {
        self.thumbnailer = thumbnailer;
        self
    }

    pub fn with_thumbnail_width(mut self, thumbnail_width: u32) -> Self {
        self.thumbnail_width = thumbnail_width;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    async fn load(&self, source: MediaSource, fetch: &FetchOptions) -> Result<Vec<u8>, PreviewError> {
        match source {
            MediaSource::Bytes(bytes) => Ok(bytes),
            MediaSource::Url(url) => {
                let stream = self.fetcher.open_stream(&url, fetch).await?;
                collect_stream(stream, self.max_upload_bytes).await
            }
        }
    }
}

#[async_trait]
impl MediaPreparer for UploadingPreparer {
    #[instrument(level = "debug", skip_all, fields(media_type = %options.media_type))]
    async fn prepare(
        &self,
        source: MediaSource,
        options: &PrepareOptions,
    ) -> Result<PreparedMedia, PreviewError> {
        let data = self.load(source, &options.fetch).await?;

        let format = image::guess_format(&data).map_err(|e| {
            PreviewError::InvalidContentType(format!("Media is not a recognized image: {e}"))
        })?;
        let (width, height) = match image::ImageReader::with_format(Cursor::new(&data), format)
            .into_dimensions()
        {
            Ok((w, h)) => (Some(w), Some(h)),
            Err(e) => {
                debug!(error = %e, "Could not read image dimensions");
                (None, None)
            }
        };

        let thumb_source = stream::iter(vec![Ok(data.clone())]).boxed();
        let jpeg_thumbnail = match self
            .thumbnailer
            .extract(thumb_source, self.thumbnail_width)
            .await
        {
            Ok(thumb) => Some(thumb),
            Err(e) => {
                warn!(error = %e, "Failed to generate embedded thumbnail");
                None
            }
        };

        let file_length = data.len() as u64;
        let uploaded = options
            .uploader
            .upload(data, options.media_type, &options.fetch)
            .await?;

        debug!(url = %uploaded.media_url, file_length, "Media uploaded");

        Ok(PreparedMedia {
            image: Some(ImageMessage {
                url: uploaded.media_url,
                direct_path: uploaded.direct_path,
                mimetype: format.to_mime_type().to_string(),
                file_length,
                width,
                height,
                jpeg_thumbnail,
            }),
        })
    }
}
