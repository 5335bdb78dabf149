//! Fallback extractor for unsupported types.

use anyhow::Result;
use async_trait::async_trait;

use crate::extractor::{Extraction, Extractor};

/// Matches nothing explicitly; the registry falls back to it when no
/// registered extractor matches. Yields an empty extraction so unknown
/// types still get a metadata-only summary document instead of a failure.
#[derive(Debug, Default)]
pub struct NoopExtractor;

impl NoopExtractor {
    pub const NAME: &'static str = "noop";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extractor for NoopExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn matches(&self, _mime_type: &str, _extension: &str) -> bool {
        false
    }

    async fn extract(&self, _data: &[u8], _declared_mime: &str) -> Result<Extraction> {
        Ok(Extraction::empty())
    }
}
