use crate::config::FetchOptions;
use crate::PreviewError;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::redirect;
use tracing::{debug, instrument};

/// Body chunks of a streamed HTTP response.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, PreviewError>>;

#[async_trait]
pub trait StreamFetcher: Send + Sync {
    async fn open_stream(&self, url: &str, fetch: &FetchOptions)
        -> Result<ByteStream, PreviewError>;
}

/// Streams response bodies with reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpStreamFetcher;

impl HttpStreamFetcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamFetcher for HttpStreamFetcher {
    #[instrument(level = "debug", skip(self, fetch), err)]
    async fn open_stream(
        &self,
        url: &str,
        fetch: &FetchOptions,
    ) -> Result<ByteStream, PreviewError> {
        let client = fetch.build_client(redirect::Policy::default())?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(PreviewError::from_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::HttpError {
                status: status.as_u16(),
                message: format!("unexpected status fetching {url}"),
            });
        }

        debug!(url = %url, content_length = ?response.content_length(), "Streaming response body");

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(PreviewError::from_reqwest_error)
            .boxed())
    }
}

/// Collects a stream into memory, failing once more than `limit` bytes arrive.
pub async fn collect_stream(mut stream: ByteStream, limit: usize) -> Result<Vec<u8>, PreviewError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buffer.len() + chunk.len() > limit {
            return Err(PreviewError::ContentTooLarge {
                size: buffer.len() + chunk.len(),
                limit,
            });
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}
