use crate::fetcher::{collect_stream, ByteStream};
use crate::media::ImageMessage;
use crate::PreviewError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_JPEG_QUALITY: u8 = 50;
const DEFAULT_MAX_OUTPUT_DIMENSION: u32 = 4096;

/// Outcome of thumbnail acquisition for one preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Thumbnail {
    #[default]
    None,
    /// Fetched and resized directly, already capped.
    Direct(Vec<u8>),
    /// Produced by the media upload path. `jpeg` is the capped embedded
    /// thumbnail of `attachment`, when it had one.
    Uploaded {
        jpeg: Option<Vec<u8>>,
        attachment: Option<ImageMessage>,
    },
}

impl Thumbnail {
    pub fn jpeg(&self) -> Option<&[u8]> {
        match self {
            Thumbnail::None => None,
            Thumbnail::Direct(jpeg) => Some(jpeg.as_slice()),
            Thumbnail::Uploaded { jpeg, .. } => jpeg.as_deref(),
        }
    }

    pub fn attachment(&self) -> Option<&ImageMessage> {
        match self {
            Thumbnail::Uploaded { attachment, .. } => attachment.as_ref(),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Thumbnail::None)
    }
}

/// Truncates `thumb` to at most `max_bytes`. This slices the encoded bytes and
/// can leave an invalid JPEG tail.
pub fn cap_thumbnail(mut thumb: Vec<u8>, max_bytes: usize) -> Vec<u8> {
    if thumb.len() > max_bytes {
        debug!(
            original = thumb.len(),
            max = max_bytes,
            "Truncating oversized thumbnail"
        );
        thumb.truncate(max_bytes);
    }
    thumb
}

#[async_trait]
pub trait ThumbnailExtractor: Send + Sync {
    /// Decodes the image in `stream` and re-encodes it as a JPEG `width` pixels wide.
    async fn extract(&self, stream: ByteStream, width: u32) -> Result<Vec<u8>, PreviewError>;
}

/// Decodes any format the `image` crate recognizes, scales to the requested
/// width keeping the aspect ratio, and encodes a JPEG. Output is bounded to
/// `max_output_dimension` on each side; very tall images are scaled down to fit.
#[derive(Debug, Clone)]
pub struct JpegThumbnailer {
    max_image_bytes: usize,
    max_output_dimension: u32,
    quality: u8,
}

impl Default for JpegThumbnailer {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegThumbnailer {
    pub fn new() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_output_dimension: DEFAULT_MAX_OUTPUT_DIMENSION,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    pub fn with_max_output_dimension(mut self, max_output_dimension: u32) -> Self {
        self.max_output_dimension = max_output_dimension.max(1);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    pub fn encode(&self, bytes: &[u8], width: u32) -> Result<Vec<u8>, PreviewError> {
        let img = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PreviewError::ImageError(format!("Failed to detect image format: {e}")))?
            .decode()
            .map_err(|e| PreviewError::ImageError(format!("Failed to decode image: {e}")))?;

        let width = width.max(1);
        if width > self.max_output_dimension {
            return Err(PreviewError::ImageError(format!(
                "Requested thumbnail width {width} exceeds {}",
                self.max_output_dimension
            )));
        }
        let resized = img.resize(width, self.max_output_dimension, FilterType::Triangle);

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode_image(&resized.to_rgb8())
            .map_err(|e| PreviewError::ImageError(format!("Failed to encode JPEG: {e}")))?;

        Ok(jpeg)
    }
}

#[async_trait]
impl ThumbnailExtractor for JpegThumbnailer {
    async fn extract(&self, stream: ByteStream, width: u32) -> Result<Vec<u8>, PreviewError> {
        let bytes = collect_stream(stream, self.max_image_bytes).await?;
        let encoder = self.clone();

        tokio::task::spawn_blocking(move || encoder.encode(&bytes, width))
            .await
            .map_err(|e| PreviewError::ImageError(format!("Thumbnail task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};
    use image::{ImageFormat, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 30, 30]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_cap_thumbnail() {
        let original: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
        let capped = cap_thumbnail(original.clone(), 256_000);
        assert_eq!(capped.len(), 256_000);
        assert_eq!(&capped[..], &original[..256_000]);

        let small = vec![7u8; 256_000];
        assert_eq!(cap_thumbnail(small.clone(), 256_000), small);

        assert!(cap_thumbnail(Vec::new(), 256_000).is_empty());
    }

    #[test]
    fn test_thumbnail_accessors() {
        assert!(Thumbnail::None.jpeg().is_none());
        assert!(Thumbnail::None.is_none());
        assert_eq!(Thumbnail::Direct(vec![1, 2]).jpeg(), Some(&[1u8, 2][..]));

        let uploaded = Thumbnail::Uploaded {
            jpeg: None,
            attachment: Some(ImageMessage {
                url: "https://media.example.com/a".into(),
                ..Default::default()
            }),
        };
        assert!(uploaded.jpeg().is_none());
        assert_eq!(
            uploaded.attachment().map(|a| a.url.as_str()),
            Some("https://media.example.com/a")
        );
    }

    #[test]
    fn test_encode_scales_to_width() {
        let jpeg = JpegThumbnailer::new().encode(&png(100, 50), 40).unwrap();

        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 20);
    }

    #[test]
    fn test_encode_bounds_tall_images() {
        let jpeg = JpegThumbnailer::new().encode(&png(1, 20_000), 720).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.height(), DEFAULT_MAX_OUTPUT_DIMENSION);
        assert!(decoded.width() <= 720);
    }

    #[test]
    fn test_encode_rejects_oversized_width() {
        let result = JpegThumbnailer::new()
            .with_max_output_dimension(64)
            .encode(&png(10, 10), 65);
        assert!(matches!(result, Err(PreviewError::ImageError(_))));
    }

    #[tokio::test]
    async fn test_extract_rejects_garbage() {
        let stream = stream::iter(vec![Ok(b"<html>not an image</html>".to_vec())]).boxed();
        let result = JpegThumbnailer::new().extract(stream, 720).await;
        assert!(matches!(result, Err(PreviewError::ImageError(_))));
    }

    #[tokio::test]
    async fn test_extract_respects_input_limit() {
        let stream = stream::iter(vec![Ok(png(64, 64))]).boxed();
        let result = JpegThumbnailer::new()
            .with_max_image_bytes(16)
            .extract(stream, 32)
            .await;
        assert!(matches!(result, Err(PreviewError::ContentTooLarge { .. })));
    }
}
