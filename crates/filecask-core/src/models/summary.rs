//! The summary document: frontmatter + body.
//!
//! This schema is the single contract every extractor and every downstream
//! consumer (UI viewer, AI context builder) honors. Consumers read this
//! document plus the `Derivative` rows, never raw storage keys directly.
//! The absence of a summary document means "processing incomplete", not an
//! empty file.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::NewDerivative;

const FRONTMATTER_OPEN: &str = "---\n";
const FRONTMATTER_CLOSE: &str = "\n---\n";

/// One derivative entry in the frontmatter. Kinds are carried as their
/// stable string form so consumers in other languages stay decoupled from
/// the Rust enum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryDerivative {
    pub kind: String,
    pub storage_key: String,
    pub content_type: String,
}

impl From<&NewDerivative> for SummaryDerivative {
    fn from(d: &NewDerivative) -> Self {
        Self {
            kind: d.kind.to_string(),
            storage_key: d.storage_key.clone(),
            content_type: d.content_type.clone(),
        }
    }
}

/// Machine-readable header of the summary document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryFrontmatter {
    pub file_id: Uuid,
    pub original_filename: String,
    /// Resolved MIME type (declared type refined by extraction).
    pub content_type: String,
    pub content_hash: Option<String>,
    /// Name of the producing extractor, or `direct` for fast-track files.
    pub producer: String,
    pub derivatives: Vec<SummaryDerivative>,
}

/// The canonical artifact every consumer reads for file context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDocument {
    pub frontmatter: SummaryFrontmatter,
    pub body: String,
}

impl SummaryDocument {
    pub fn new(frontmatter: SummaryFrontmatter, body: String) -> Self {
        Self { frontmatter, body }
    }

    /// Render to the stored markdown form.
    pub fn render(&self) -> Result<String, AppError> {
        let yaml = serde_yaml::to_string(&self.frontmatter)?;
        Ok(format!("---\n{}---\n\n{}", yaml, self.body))
    }

    /// Parse a stored summary document back into frontmatter + body.
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let rest = input.strip_prefix(FRONTMATTER_OPEN).ok_or_else(|| {
            AppError::InvalidInput("summary document missing frontmatter".to_string())
        })?;
        let close = rest.find(FRONTMATTER_CLOSE).ok_or_else(|| {
            AppError::InvalidInput("summary document frontmatter not terminated".to_string())
        })?;

        let frontmatter: SummaryFrontmatter = serde_yaml::from_str(&rest[..close + 1])?;

        let mut body = &rest[close + FRONTMATTER_CLOSE.len()..];
        // One blank line separates frontmatter from body in rendered form.
        if let Some(stripped) = body.strip_prefix('\n') {
            body = stripped;
        }

        Ok(Self {
            frontmatter,
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DerivativeKind;

    fn sample_frontmatter() -> SummaryFrontmatter {
        SummaryFrontmatter {
            file_id: Uuid::new_v4(),
            original_filename: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            content_hash: Some("sha256:abc123".to_string()),
            producer: "pdf-text".to_string(),
            derivatives: vec![SummaryDerivative {
                kind: DerivativeKind::ExtractedText.to_string(),
                storage_key: "owner/files/1/derivatives/extracted-text".to_string(),
                content_type: "text/plain".to_string(),
            }],
        }
    }

    #[test]
    fn test_render_parse_round_trip() {
        let doc = SummaryDocument::new(sample_frontmatter(), "First page text.\n".to_string());
        let rendered = doc.render().unwrap();
        let parsed = SummaryDocument::parse(&rendered).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_empty_body_round_trip() {
        let mut fm = sample_frontmatter();
        fm.content_hash = None;
        fm.derivatives.clear();
        let doc = SummaryDocument::new(fm, String::new());
        let rendered = doc.render().unwrap();
        let parsed = SummaryDocument::parse(&rendered).unwrap();
        assert_eq!(parsed.body, "");
        assert_eq!(parsed.frontmatter.content_hash, None);
        assert!(parsed.frontmatter.derivatives.is_empty());
    }

    #[test]
    fn test_body_containing_delimiter_preserved() {
        let body = "above\n---\nbelow\n".to_string();
        let doc = SummaryDocument::new(sample_frontmatter(), body.clone());
        let parsed = SummaryDocument::parse(&doc.render().unwrap()).unwrap();
        assert_eq!(parsed.body, body);
    }

    #[test]
    fn test_parse_rejects_missing_frontmatter() {
        assert!(SummaryDocument::parse("just some text").is_err());
        assert!(SummaryDocument::parse("---\nfile_id: nope").is_err());
    }

    #[test]
    fn test_derivative_entry_from_new_derivative() {
        let new = NewDerivative {
            kind: DerivativeKind::PreviewImage,
            storage_key: "o/files/x/derivatives/preview-image".to_string(),
            content_type: "image/png".to_string(),
            size_bytes: 1024,
        };
        let entry = SummaryDerivative::from(&new);
        assert_eq!(entry.kind, "preview-image");
        assert_eq!(entry.content_type, "image/png");
    }
}
