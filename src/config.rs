use crate::media::MediaUploader;
use crate::PreviewError;
use reqwest::{header::HeaderMap, redirect, Client, Proxy};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Requested thumbnail width, also echoed back as the declared width and height.
pub const THUMBNAIL_WIDTH_PX: u32 = 720;

/// Inline JPEG thumbnails above this size are silently dropped by messaging clients.
pub const MAX_THUMBNAIL_BYTES: usize = 256_000;

pub const MAX_REDIRECTS: usize = 5;

pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

const DEFAULT_USER_AGENT: &str = "link-preview-resolver/0.1.0";

/// HTTP options shared by the metadata scrape, the image fetch and the upload path.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub proxy_url: Option<String>,
    pub headers: Option<HeaderMap>,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            proxy_url: None,
            headers: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchOptions {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Duration::from_millis(timeout_ms);
        self
    }

    pub fn with_proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Builds a client for a single call. Proxies come only from `proxy_url`,
    /// never from the environment.
    pub fn build_client(&self, redirect_policy: redirect::Policy) -> Result<Client, PreviewError> {
        let mut client_builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .timeout(self.timeout)
            .redirect(redirect_policy);

        if let Some(headers) = &self.headers {
            client_builder = client_builder.default_headers(headers.clone());
        }

        client_builder = match &self.proxy_url {
            Some(proxy_url) => {
                let proxy = Proxy::all(proxy_url.as_str()).map_err(|e| {
                    PreviewError::FetchError(format!("Invalid proxy url {proxy_url}: {e}"))
                })?;
                client_builder.proxy(proxy)
            }
            None => client_builder.no_proxy(),
        };

        client_builder
            .build()
            .map_err(|e| PreviewError::FetchError(format!("Failed to build HTTP client: {e}")))
    }
}

/// Per-call configuration for [`UrlInfoResolver::get_url_info`](crate::UrlInfoResolver::get_url_info).
///
/// # Examples
/// ```ignore
/// let opts = UrlGenerationOptions::default()
///     .with_thumbnail_width(480)
///     .with_fetch(FetchOptions::default().with_timeout_ms(5000))
///     .with_uploader(Arc::new(my_uploader));
/// ```
#[derive(Clone)]
pub struct UrlGenerationOptions {
    pub thumbnail_width: u32,
    pub fetch: FetchOptions,
    /// Presence selects the upload-mediated thumbnail path.
    pub uploader: Option<Arc<dyn MediaUploader>>,
    pub max_redirects: usize,
    pub max_thumbnail_bytes: usize,
}

impl Default for UrlGenerationOptions {
    fn default() -> Self {
        Self {
            thumbnail_width: THUMBNAIL_WIDTH_PX,
            fetch: FetchOptions::default(),
            uploader: None,
            max_redirects: MAX_REDIRECTS,
            max_thumbnail_bytes: MAX_THUMBNAIL_BYTES,
        }
    }
}

impl fmt::Debug for UrlGenerationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlGenerationOptions")
            .field("thumbnail_width", &self.thumbnail_width)
            .field("fetch", &self.fetch)
            .field("uploader", &self.uploader.is_some())
            .field("max_redirects", &self.max_redirects)
            .field("max_thumbnail_bytes", &self.max_thumbnail_bytes)
            .finish()
    }
}

impl UrlGenerationOptions {
    pub fn with_thumbnail_width(mut self, thumbnail_width: u32) -> Self {
        self.thumbnail_width = thumbnail_width;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn MediaUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn with_max_thumbnail_bytes(mut self, max_thumbnail_bytes: usize) -> Self {
        self.max_thumbnail_bytes = max_thumbnail_bytes;
        self
    }
}
