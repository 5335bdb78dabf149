//! Baseline text extractor.
//!
//! Handles text-bearing formats that are not on the fast-track allow-list
//! (declared as generic types but carrying a text-like extension, log
//! files, config formats). Decodes UTF-8 best-effort.

use anyhow::Result;
use async_trait::async_trait;

use crate::extractor::{Extraction, Extractor};

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "log", "cfg", "conf", "ini", "toml", "yaml", "yml", "tsv",
];

#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub const NAME: &'static str = "plain-text";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for PlainTextExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn matches(&self, mime_type: &str, extension: &str) -> bool {
        mime_type.starts_with("text/") || TEXT_EXTENSIONS.contains(&extension)
    }

    async fn extract(&self, data: &[u8], _declared_mime: &str) -> Result<Extraction> {
        let text = String::from_utf8_lossy(data).into_owned();
        Ok(Extraction {
            text: Some(text),
            refined_mime: Some("text/plain".to_string()),
            artifacts: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_text_mime_and_extensions() {
        let extractor = PlainTextExtractor::new();
        assert!(extractor.matches("text/x-log", ""));
        assert!(extractor.matches("application/octet-stream", "log"));
        assert!(extractor.matches("application/octet-stream", "toml"));
        assert!(!extractor.matches("application/pdf", "pdf"));
    }

    #[tokio::test]
    async fn test_extracts_utf8_text() {
        let extraction = PlainTextExtractor::new()
            .extract("hello\nworld".as_bytes(), "text/x-log")
            .await
            .unwrap();
        assert_eq!(extraction.text.as_deref(), Some("hello\nworld"));
        assert_eq!(extraction.refined_mime.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced_not_rejected() {
        let extraction = PlainTextExtractor::new()
            .extract(&[0x68, 0x69, 0xFF, 0xFE], "text/plain")
            .await
            .unwrap();
        let text = extraction.text.unwrap();
        assert!(text.starts_with("hi"));
        assert!(text.contains('\u{FFFD}'));
    }
}
