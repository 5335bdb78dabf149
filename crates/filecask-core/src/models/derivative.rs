use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

/// Kinds of produced artifacts. Stored as text; `(file_id, kind)` is unique
/// so re-processing overwrites rather than accumulating duplicates.
///
/// `SummaryDocument` is a retrieval address, not a `derivatives` row: the
/// summary lives at its fixed storage key and is always retrievable
/// independently of the derivative set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DerivativeKind {
    OriginalCopy,
    ExtractedText,
    PreviewImage,
    SummaryDocument,
}

impl Display for DerivativeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DerivativeKind::OriginalCopy => write!(f, "original-copy"),
            DerivativeKind::ExtractedText => write!(f, "extracted-text"),
            DerivativeKind::PreviewImage => write!(f, "preview-image"),
            DerivativeKind::SummaryDocument => write!(f, "summary-document"),
        }
    }
}

impl FromStr for DerivativeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original-copy" => Ok(DerivativeKind::OriginalCopy),
            "extracted-text" => Ok(DerivativeKind::ExtractedText),
            "preview-image" => Ok(DerivativeKind::PreviewImage),
            "summary-document" => Ok(DerivativeKind::SummaryDocument),
            _ => Err(anyhow::anyhow!("Invalid derivative kind: {}", s)),
        }
    }
}

/// One produced artifact row for a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Derivative {
    pub file_id: Uuid,
    pub kind: DerivativeKind,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Derivative {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Derivative {
            file_id: row.get("file_id"),
            kind: row.get::<String, _>("kind").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse derivative kind: {}", e).into())
            })?,
            storage_key: row.get("storage_key"),
            content_type: row.get("content_type"),
            size_bytes: row.get("size_bytes"),
            created_at: row.get("created_at"),
        })
    }
}

/// A derivative produced by the pipeline, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDerivative {
    pub kind: DerivativeKind,
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(DerivativeKind::OriginalCopy.to_string(), "original-copy");
        assert_eq!(DerivativeKind::ExtractedText.to_string(), "extracted-text");
        assert_eq!(DerivativeKind::PreviewImage.to_string(), "preview-image");
        assert_eq!(
            DerivativeKind::SummaryDocument.to_string(),
            "summary-document"
        );
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(
            "extracted-text".parse::<DerivativeKind>().unwrap(),
            DerivativeKind::ExtractedText
        );
        assert_eq!(
            "preview-image".parse::<DerivativeKind>().unwrap(),
            DerivativeKind::PreviewImage
        );
        assert!("thumbnail".parse::<DerivativeKind>().is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            DerivativeKind::OriginalCopy,
            DerivativeKind::ExtractedText,
            DerivativeKind::PreviewImage,
            DerivativeKind::SummaryDocument,
        ] {
            assert_eq!(kind.to_string().parse::<DerivativeKind>().unwrap(), kind);
        }
    }
}
