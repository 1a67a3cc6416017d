//! Reference image URL lists.

use serde::{Deserialize, Serialize};

/// Splits free-form text into image URLs.
///
/// Commas and line breaks both separate entries. Line breaks are the full
/// Unicode set: `\n`, lone `\r`, vertical tab, form feed, the `\x1c`-`\x1e`
/// separators, NEL and U+2028/U+2029. Each entry is trimmed and empty
/// entries are dropped; order and duplicates are preserved.
pub fn parse_image_urls(raw: &str) -> Vec<String> {
    raw.split(is_separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn is_separator(c: char) -> bool {
    matches!(
        c,
        ',' | '\n'
            | '\r'
            | '\x0b'
            | '\x0c'
            | '\x1c'
            | '\x1d'
            | '\x1e'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Image URLs as supplied by a caller: either one block of text or an
/// already-split list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageUrls {
    /// Comma or newline separated text.
    Text(String),
    /// One URL per entry.
    List(Vec<String>),
}

impl ImageUrls {
    /// Resolves the input into a clean list of URLs.
    pub fn into_urls(self) -> Vec<String> {
        match self {
            Self::Text(raw) => parse_image_urls(&raw),
            Self::List(list) => list.into_iter().filter(|s| !s.is_empty()).collect(),
        }
    }
}

impl Default for ImageUrls {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for ImageUrls {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_string())
    }
}

impl From<Vec<String>> for ImageUrls {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_newlines_and_commas() {
        let urls = parse_image_urls("https://a.test/1.png\nhttps://a.test/2.png, https://a.test/3.png");
        assert_eq!(
            urls,
            vec![
                "https://a.test/1.png",
                "https://a.test/2.png",
                "https://a.test/3.png"
            ]
        );
    }

    #[test]
    fn test_parse_drops_blank_entries() {
        assert!(parse_image_urls("").is_empty());
        assert!(parse_image_urls("   \n\t ,, ").is_empty());
        assert_eq!(parse_image_urls("a,,b,"), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_handles_crlf() {
        assert_eq!(parse_image_urls("a\r\n b \r\n"), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_handles_lone_cr_and_unicode_breaks() {
        assert_eq!(parse_image_urls("a\rb"), vec!["a", "b"]);
        assert_eq!(parse_image_urls("a\u{2028}b\u{2029}c"), vec!["a", "b", "c"]);
        assert_eq!(parse_image_urls("a\x0bb\x0cc\x1cd\u{85}e"), vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_parse_keeps_duplicates_in_order() {
        assert_eq!(parse_image_urls("b\na\nb"), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_list_input_drops_empty_only() {
        let urls = ImageUrls::List(vec!["a".into(), "".into(), " b ".into()]).into_urls();
        assert_eq!(urls, vec!["a", " b "]);
    }

    #[test]
    fn test_deserialize_string_or_list() {
        let text: ImageUrls = serde_json::from_str(r#""x, y""#).unwrap();
        assert_eq!(text.into_urls(), vec!["x", "y"]);

        let list: ImageUrls = serde_json::from_str(r#"["x", "y"]"#).unwrap();
        assert_eq!(list.into_urls(), vec!["x", "y"]);
    }
}
