use crate::scrape::ScrapedPage;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

/// Metadata extractor, responsible for extracting preview information from webpage content
#[derive(Clone)]
pub struct MetadataExtractor;

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Builds a page record from HTML served at `page_url`. Image URLs are
    /// resolved against `page_url`.
    pub fn extract(&self, html: &str, page_url: &Url) -> ScrapedPage {
        let document = Html::parse_document(html);

        let title = self.extract_title(&document);
        let description = self.extract_description(&document);
        let images = self.extract_images(&document, page_url);

        debug!(
            url = %page_url,
            title = ?title,
            image_count = images.len(),
            "Extracted page metadata"
        );

        ScrapedPage {
            url: page_url.to_string(),
            title,
            description,
            images,
        }
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        let title_selector = Selector::parse("title").ok()?;

        first_meta_content(document, "meta[property='og:title']")
            .or_else(|| first_meta_content(document, "meta[name='twitter:title']"))
            .or_else(|| {
                document
                    .select(&title_selector)
                    .next()
                    .map(|el| el.text().collect::<String>())
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn extract_description(&self, document: &Html) -> Option<String> {
        first_meta_content(document, "meta[property='og:description']")
            .or_else(|| first_meta_content(document, "meta[name='twitter:description']"))
            .or_else(|| first_meta_content(document, "meta[name='description']"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Meta images first, then `link[rel=image_src]`, then plain `<img>` tags.
    fn extract_images(&self, document: &Html, page_url: &Url) -> Vec<String> {
        let sources = [
            (
                "meta[property='og:image'], meta[property='og:image:url'], \
                 meta[name='twitter:image'], meta[itemprop='image']",
                "content",
            ),
            ("link[rel='image_src']", "href"),
            ("img[src]", "src"),
        ];

        for (selector_str, attr) in sources {
            let Ok(selector) = Selector::parse(selector_str) else {
                continue;
            };

            let mut images: Vec<String> = Vec::new();
            for candidate in document
                .select(&selector)
                .filter_map(|el| el.value().attr(attr))
                .filter_map(|raw| resolve_url(page_url, raw))
            {
                if !images.contains(&candidate) {
                    images.push(candidate);
                }
            }

            if !images.is_empty() {
                return images;
            }
        }

        Vec::new()
    }
}

fn first_meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn resolve_url(page_url: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    page_url.join(raw).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://example.com/articles/1").unwrap()
    }

    #[test]
    fn test_open_graph_metadata() {
        let html = r#"<!DOCTYPE html>
<html>
<head>
    <title>Fallback Title</title>
    <meta property="og:title" content=" Test Title ">
    <meta property="og:description" content="Test Description">
    <meta property="og:image" content="https://cdn.example.com/image.jpg">
    <meta property="og:image" content="/second.png">
</head>
<body><img src="/ignored.png"></body>
</html>"#;

        let page = MetadataExtractor::new().extract(html, &page_url());

        assert_eq!(page.url, "https://example.com/articles/1");
        assert_eq!(page.title.as_deref(), Some("Test Title"));
        assert_eq!(page.description.as_deref(), Some("Test Description"));
        assert_eq!(
            page.images,
            vec![
                "https://cdn.example.com/image.jpg".to_string(),
                "https://example.com/second.png".to_string(),
            ]
        );
    }

    #[test]
    fn test_fallbacks() {
        let html = r#"<html><head>
            <title>  Plain Title </title>
            <meta name="description" content="Plain description">
        </head><body>
            <img src="pics/a.png"><img src="pics/a.png"><img src="data:image/png;base64,AAAA">
        </body></html>"#;

        let page = MetadataExtractor::new().extract(html, &page_url());

        assert_eq!(page.title.as_deref(), Some("Plain Title"));
        assert_eq!(page.description.as_deref(), Some("Plain description"));
        assert_eq!(
            page.images,
            vec!["https://example.com/articles/pics/a.png".to_string()]
        );
    }

    #[test]
    fn test_image_src_link() {
        let html = r#"<html><head><link rel="image_src" href="//static.example.com/x.jpg"></head></html>"#;
        let page = MetadataExtractor::new().extract(html, &page_url());
        assert_eq!(page.images, vec!["https://static.example.com/x.jpg".to_string()]);
    }

    #[test]
    fn test_empty_document() {
        let page = MetadataExtractor::new().extract("", &page_url());
        assert!(page.title.is_none());
        assert!(page.description.is_none());
        assert!(page.images.is_empty());
    }
}
