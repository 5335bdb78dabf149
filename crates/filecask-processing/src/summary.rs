//! Summary document construction.

use filecask_core::models::{
    IngestedFile, NewDerivative, SummaryDerivative, SummaryDocument, SummaryFrontmatter,
};

/// Build the summary document for a processed file.
///
/// The frontmatter's derivative list enumerates exactly the derivatives
/// the pipeline produced this run, which finalize persists as the
/// `derivatives` rows, keeping the document and the metadata store in
/// lockstep for consumers.
pub fn build_summary(
    file: &IngestedFile,
    resolved_mime_type: &str,
    content_hash: Option<String>,
    producer: &str,
    derivatives: &[NewDerivative],
    body: String,
) -> SummaryDocument {
    SummaryDocument::new(
        SummaryFrontmatter {
            file_id: file.id,
            original_filename: file.original_filename.clone(),
            content_type: resolved_mime_type.to_string(),
            content_hash,
            producer: producer.to_string(),
            derivatives: derivatives.iter().map(SummaryDerivative::from).collect(),
        },
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use filecask_core::models::DerivativeKind;
    use uuid::Uuid;

    fn sample_file() -> IngestedFile {
        IngestedFile {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            original_filename: "notes.txt".to_string(),
            path: None,
            declared_mime_type: "text/plain".to_string(),
            size_bytes: 0,
            content_hash: None,
            pinned: false,
            created_at: Utc::now(),
            last_opened_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_frontmatter_mirrors_derivatives() {
        let file = sample_file();
        let derivatives = vec![NewDerivative {
            kind: DerivativeKind::ExtractedText,
            storage_key: "o/files/x/derivatives/extracted-text".to_string(),
            content_type: "text/plain".to_string(),
            size_bytes: 42,
        }];

        let doc = build_summary(
            &file,
            "text/plain",
            Some("sha256:abc".to_string()),
            "plain-text",
            &derivatives,
            "body text".to_string(),
        );

        assert_eq!(doc.frontmatter.file_id, file.id);
        assert_eq!(doc.frontmatter.producer, "plain-text");
        assert_eq!(doc.frontmatter.derivatives.len(), 1);
        assert_eq!(doc.frontmatter.derivatives[0].kind, "extracted-text");
        assert_eq!(doc.body, "body text");
    }

    #[test]
    fn test_metadata_only_summary() {
        let file = sample_file();
        let doc = build_summary(&file, "application/octet-stream", None, "noop", &[], String::new());

        assert!(doc.body.is_empty());
        assert!(doc.frontmatter.derivatives.is_empty());
        assert_eq!(doc.frontmatter.content_hash, None);
    }
}
