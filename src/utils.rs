/// Prefixes `https://` unless the text already starts with an http(s) scheme.
pub fn ensure_scheme(text: &str) -> String {
    if text.starts_with("https://") || text.starts_with("http://") {
        text.to_string()
    } else {
        format!("https://{text}")
    }
}

/// Cuts `s` to at most `max_width` terminal columns, ending in `...` when cut.
#[cfg(feature = "logging")]
pub fn truncate_str(s: &str, max_width: usize) -> String {
    use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

    if s.width() <= max_width {
        return s.to_string();
    }

    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(1);

        if current_width + char_width + 3 > max_width {
            break;
        }

        result.push(c);
        current_width += char_width;
    }

    result.push_str("...");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_scheme() {
        assert_eq!(ensure_scheme("example.com/page"), "https://example.com/page");
        assert_eq!(ensure_scheme("https://example.com"), "https://example.com");
        assert_eq!(ensure_scheme("http://example.com"), "http://example.com");
        // only the lowercase scheme prefix counts
        assert_eq!(ensure_scheme("HTTP://example.com"), "https://HTTP://example.com");
        assert_eq!(ensure_scheme(""), "https://");
    }

    #[test]
    #[cfg(feature = "logging")]
    fn test_truncate_str() {
        assert_eq!(truncate_str("Hello, world!", 10), "Hello, ...");
        assert_eq!(truncate_str("你好，世界！", 8), "你好...");
        assert_eq!(truncate_str("Hi!", 10), "Hi!");
    }
}
