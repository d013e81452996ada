use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Raised by a scraper when there is nothing to preview. The resolver turns
    /// this kind into an absent result instead of an error.
    #[error("Link preview did not receive a valid url or text: {0}")]
    NoPreviewFound(String),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("Request timeout: {0}")]
    TimeoutError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Content too large: {size} bytes exceeds limit of {limit} bytes")]
    ContentTooLarge { size: usize, limit: usize },

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("Failed to process image: {0}")]
    ImageError(String),

    #[error("Media upload failed: {0}")]
    UploadError(String),

    #[error("External service error: {service} - {message}")]
    ExternalServiceError { service: String, message: String },
}

impl PreviewError {
    /// Classifies a reqwest failure into the closest variant.
    pub fn from_reqwest_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            PreviewError::TimeoutError(e.to_string())
        } else if e.is_connect() {
            PreviewError::ConnectionError(e.to_string())
        } else if let Some(status) = e.status() {
            PreviewError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            PreviewError::FetchError(e.to_string())
        }
    }

    pub fn is_no_preview(&self) -> bool {
        matches!(self, PreviewError::NoPreviewFound(_))
    }

    pub fn log(&self) {
        match self {
            PreviewError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            PreviewError::NoPreviewFound(e) => {
                debug!(reason = %e, "No preview available");
            }
            PreviewError::FetchError(e) => {
                error!(error = %e, "Content fetch failed");
            }
            PreviewError::TimeoutError(e) => {
                warn!(error = %e, "Request timed out");
            }
            PreviewError::ConnectionError(e) => {
                warn!(error = %e, "Connection failed");
            }
            PreviewError::HttpError { status, message } => {
                warn!(status = %status, error = %message, "HTTP request failed");
            }
            PreviewError::InvalidContentType(e) => {
                warn!(error = %e, "Invalid content type received");
            }
            PreviewError::ContentTooLarge { size, limit } => {
                warn!(size = %size, limit = %limit, "Content exceeds size limit");
            }
            PreviewError::ExtractError(e) => {
                error!(error = %e, "Metadata extraction failed");
            }
            PreviewError::ImageError(e) => {
                warn!(error = %e, "Image processing failed");
            }
            PreviewError::UploadError(e) => {
                error!(error = %e, "Media upload failed");
            }
            PreviewError::ExternalServiceError { service, message } => {
                error!(
                    service = %service,
                    error = %message,
                    "External service error occurred"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_preview_classification() {
        let err = PreviewError::NoPreviewFound("not a url".into());
        assert!(err.is_no_preview());
        assert!(err.to_string().contains("receive a valid"));

        let err = PreviewError::FetchError("did not receive a valid response".into());
        assert!(!err.is_no_preview());
    }

    #[test]
    fn test_url_parse_error_conversion() {
        let err: PreviewError = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, PreviewError::UrlParseError(_)));
        assert!(!err.is_no_preview());
    }
}
