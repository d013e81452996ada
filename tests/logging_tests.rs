#![cfg(feature = "logging")]

use link_preview_resolver::{log_url_info_card, LogLevelGuard, PreviewError, Thumbnail, UrlInfo};

#[test]
fn test_cards_render_under_debug_subscriber() {
    let _guard = LogLevelGuard::set_level("debug");

    let info = UrlInfo {
        canonical_url: "https://example.com/page".into(),
        matched_text: "example.com/page".into(),
        title: "Example".into(),
        description: Some("A page with a rather long description that needs wrapping".into()),
        original_thumbnail_url: Some("https://example.com/img.jpg".into()),
        thumbnail: Thumbnail::Direct(vec![0xFF, 0xD8, 0xFF]),
        thumbnail_width: 720,
        thumbnail_height: 720,
    };
    log_url_info_card(&info);

    let long_title = UrlInfo {
        title: "链接预览".repeat(40),
        ..info
    };
    log_url_info_card(&long_title);

    let error = PreviewError::HttpError {
        status: 503,
        message: "service unavailable".into(),
    };
    error.log();
}
