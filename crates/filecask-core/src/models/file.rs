use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical identity of one logical file.
///
/// Created at submission time with `size_bytes = 0` until the pipeline
/// finalizes; `deleted_at` is a soft-delete marker that is set and never
/// cleared by normal operations. All repository reads filter
/// `deleted_at IS NULL` unless explicitly inspecting history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IngestedFile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub original_filename: String,
    /// Optional hierarchical display path, unique per owner among
    /// non-deleted files.
    pub path: Option<String>,
    pub declared_mime_type: String,
    pub size_bytes: i64,
    /// `sha256:<hex>`, null until the pipeline computes it.
    pub content_hash: Option<String>,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub last_opened_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl IngestedFile {
    /// Lowercased filename extension, empty when there is none.
    pub fn extension(&self) -> String {
        match self.original_filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
            _ => String::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(filename: &str) -> IngestedFile {
        IngestedFile {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            original_filename: filename.to_string(),
            path: Some(format!("/inbox/{}", filename)),
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
    fn test_extension_lowercased() {
        assert_eq!(sample("Notes.TXT").extension(), "txt");
        assert_eq!(sample("archive.tar.gz").extension(), "gz");
    }

    #[test]
    fn test_extension_absent() {
        assert_eq!(sample("Makefile").extension(), "");
        // Dotfiles have no extension, the leading dot is part of the name.
        assert_eq!(sample(".env").extension(), "");
    }

    #[test]
    fn test_soft_delete_flag() {
        let mut file = sample("a.txt");
        assert!(!file.is_deleted());
        file.deleted_at = Some(Utc::now());
        assert!(file.is_deleted());
    }
}
