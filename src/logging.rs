use crate::utils::truncate_str;
use crate::UrlInfo;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: true,
        }
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    let mut wrapped = String::new();
    let mut line_length = 0;

    for word in text.split_whitespace() {
        if line_length + word.len() + 1 > width {
            wrapped.push('\n');
            wrapped.push_str("  ");
            wrapped.push_str(word);
            line_length = word.len() + 2;
        } else {
            if line_length > 0 {
                wrapped.push(' ');
                line_length += 1;
            }
            wrapped.push_str(word);
            line_length += word.len();
        }
    }
    wrapped
}

pub fn log_url_info_card(info: &UrlInfo) {
    const CARD_WIDTH: usize = 80;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 2;

    let thumbnail = match info.jpeg_thumbnail() {
        Some(jpeg) => format!(
            "{} bytes ({}x{})",
            jpeg.len(),
            info.thumbnail_width,
            info.thumbnail_height
        ),
        None => "N/A".to_string(),
    };

    let horizontal_line = "═".repeat(CARD_WIDTH - 2);

    info!(
        "\n╔{}╗\n\
         URL: {}\n\
         Text: {}\n\
         Title: {}\n\
         Desc: {}\n\
         Image: {}\n\
         Thumb: {}\n\
         ╚{}╝",
        horizontal_line,
        wrap_text(&info.canonical_url, CONTENT_WIDTH - 5),
        wrap_text(&info.matched_text, CONTENT_WIDTH - 6),
        truncate_str(&info.title, CONTENT_WIDTH - 7),
        wrap_text(info.description.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 6),
        wrap_text(
            info.original_thumbnail_url.as_deref().unwrap_or("N/A"),
            CONTENT_WIDTH - 7
        ),
        thumbnail,
        horizontal_line,
    );
}

pub fn setup_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .pretty();
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = RollingFileAppender::new(
            Rotation::DAILY,
            &config.log_dir,
            "link-preview-resolver.log",
        );

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}

/// Installs a thread-local subscriber at `level` until dropped.
pub struct LogLevelGuard {
    _guard: tracing::subscriber::DefaultGuard,
}

impl LogLevelGuard {
    pub fn set_level(level: &str) -> Self {
        let filter = EnvFilter::new(level);
        let subscriber = tracing_subscriber::registry()
            .with(subscriber_fmt::layer().with_test_writer())
            .with(filter);

        LogLevelGuard {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("short text", 20), "short text");
        assert_eq!(wrap_text("aaaa bbbb cccc", 9), "aaaa bbbb\n  cccc");
    }
}
