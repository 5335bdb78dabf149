//! Extractor contract.
//!
//! Extractors are the only pluggable point in the pipeline. They must be
//! pure: no side effects outside the returned value. The pipeline decides
//! where extracted text and artifacts are written.

use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

use filecask_core::models::DerivativeKind;

/// A format-specific artifact produced alongside extracted text, e.g. a
/// preview image rendered from the first page. The pipeline writes each
/// artifact at its kind's deterministic key.
#[derive(Debug, Clone)]
pub struct ExtractedArtifact {
    pub kind: DerivativeKind,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Result of running an extractor over original bytes.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Normalized text payload, if the format has one.
    pub text: Option<String>,
    /// MIME type refined from content inspection; `None` keeps the
    /// declared type.
    pub refined_mime: Option<String>,
    /// Zero or more format-specific artifacts.
    pub artifacts: Vec<ExtractedArtifact>,
}

impl Extraction {
    /// An extraction with nothing to say: no text, no artifacts, declared
    /// MIME kept. Produces a metadata-only summary downstream.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Trait all extractors must implement.
#[async_trait]
pub trait Extractor: Send + Sync + Debug {
    /// Stable extractor name, recorded as the summary document's producer.
    fn name(&self) -> &str;

    /// Whether this extractor handles the given MIME type / extension.
    fn matches(&self, mime_type: &str, extension: &str) -> bool;

    /// Run extraction. Must be a pure function of its inputs: no storage
    /// or metadata writes, all output through the returned value.
    async fn extract(&self, data: &[u8], declared_mime: &str) -> Result<Extraction>;
}
