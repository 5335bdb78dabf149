//! Ingestion service: job submission, status query, content retrieval.
//!
//! Submission creates (or reuses, on overwrite) the file row, persists the
//! original bytes at their deterministic key, and enqueues a `pending`
//! job. It returns immediately; the worker loop drives everything else.

use std::str::FromStr;
use std::sync::Arc;

use uuid::Uuid;

use filecask_core::constants::{FALLBACK_MIME_TYPE, SUMMARY_CONTENT_TYPE};
use filecask_core::models::{DerivativeKind, JobStatus, ProcessingJob};
use filecask_core::AppError;
use filecask_db::{DerivativeRepository, FileRepository, JobRepository};
use filecask_storage::{keys, with_storage_retries, Storage, StorageError};

/// How a submission that targets a file with an active job behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Refuse with [`IngestError::JobAlreadyActive`].
    #[default]
    Reject,
    /// Supersede a still-`pending` prior job. A claimed/processing job is
    /// never superseded; it must reach a terminal state first.
    Supersede,
}

/// One submission from the request-handling layer.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub owner_id: Uuid,
    pub original_filename: String,
    /// Display path; when set, resubmitting the same path overwrites the
    /// existing file instead of creating a new one.
    pub path: Option<String>,
    pub declared_mime_type: Option<String>,
    pub bytes: Vec<u8>,
    pub overwrite: OverwritePolicy,
}

/// Returned to the submitter immediately (fire-and-forget).
#[derive(Debug, Clone, Copy)]
pub struct SubmissionReceipt {
    pub file_id: Uuid,
    pub job_id: Uuid,
}

/// What a UI/CLI collaborator sees for a file.
#[derive(Debug, Clone)]
pub struct FileStatus {
    pub file_id: Uuid,
    /// None when the file was never enqueued.
    pub job_status: Option<JobStatus>,
    pub last_error: Option<String>,
    pub available_derivatives: Vec<DerivativeKind>,
}

/// Which artifact to retrieve for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalTarget {
    Original,
    SummaryDocument,
    Derivative(DerivativeKind),
}

impl FromStr for RetrievalTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(RetrievalTarget::Original),
            other => match other.parse::<DerivativeKind>()? {
                DerivativeKind::SummaryDocument => Ok(RetrievalTarget::SummaryDocument),
                kind => Ok(RetrievalTarget::Derivative(kind)),
            },
        }
    }
}

/// Retrieved bytes plus their content type.
#[derive(Debug, Clone)]
pub struct RetrievedContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("File not found: {0}")]
    FileNotFound(Uuid),

    #[error("A job is already active for file {0}")]
    JobAlreadyActive(Uuid),

    /// Requested artifact does not exist (yet). For the summary document
    /// this means "processing incomplete", never "empty file".
    #[error("Content not available: {0}")]
    ContentUnavailable(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    App(#[from] AppError),
}

/// The ingestion surface consumed by external collaborators.
#[derive(Clone)]
pub struct IngestService {
    files: FileRepository,
    jobs: JobRepository,
    derivatives: DerivativeRepository,
    storage: Arc<dyn Storage>,
    storage_retry_attempts: u32,
}

impl IngestService {
    pub fn new(
        files: FileRepository,
        jobs: JobRepository,
        derivatives: DerivativeRepository,
        storage: Arc<dyn Storage>,
        storage_retry_attempts: u32,
    ) -> Self {
        Self {
            files,
            jobs,
            derivatives,
            storage,
            storage_retry_attempts,
        }
    }

    /// Submit a file for ingestion. Returns the file and job ids
    /// immediately; the caller does not block on processing.
    #[tracing::instrument(skip(self, submission), fields(owner_id = %submission.owner_id, filename = %submission.original_filename))]
    pub async fn submit(&self, submission: NewSubmission) -> Result<SubmissionReceipt, IngestError> {
        let filename = sanitize_filename(&submission.original_filename);
        let declared_mime = submission
            .declared_mime_type
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

        let existing = match submission.path.as_deref() {
            Some(path) => self.files.get_by_path(submission.owner_id, path).await?,
            None => None,
        };

        let file = match existing {
            Some(file) => {
                if let Some(active) = self.jobs.active_for_file(file.id).await? {
                    self.resolve_active_job(&file.id, &active, submission.overwrite)
                        .await?;
                }
                self.files
                    .update_submission(file.id, &filename, &declared_mime)
                    .await?
            }
            None => {
                self.files
                    .create(
                        submission.owner_id,
                        &filename,
                        submission.path.as_deref(),
                        &declared_mime,
                    )
                    .await?
            }
        };

        // Persist the original before enqueueing so a fast worker never
        // claims a job whose bytes are missing.
        let original_key = keys::original_key(file.owner_id, file.id);
        let key = original_key.as_str();
        let mime = declared_mime.as_str();
        with_storage_retries("put", self.storage_retry_attempts, || {
            let data = submission.bytes.clone();
            async move { self.storage.put(key, data, mime).await }
        })
        .await?;

        let job = self.jobs.enqueue(file.id).await.map_err(|e| match e {
            // A concurrent submission won the enqueue race.
            AppError::Conflict(_) => IngestError::JobAlreadyActive(file.id),
            other => IngestError::App(other),
        })?;

        tracing::info!(
            file_id = %file.id,
            job_id = %job.id,
            size_bytes = submission.bytes.len(),
            "Submission accepted"
        );

        Ok(SubmissionReceipt {
            file_id: file.id,
            job_id: job.id,
        })
    }

    async fn resolve_active_job(
        &self,
        file_id: &Uuid,
        active: &ProcessingJob,
        overwrite: OverwritePolicy,
    ) -> Result<(), IngestError> {
        match overwrite {
            OverwritePolicy::Reject => Err(IngestError::JobAlreadyActive(*file_id)),
            OverwritePolicy::Supersede => {
                if active.status == JobStatus::Pending
                    && self.jobs.supersede_pending(*file_id).await?
                {
                    Ok(())
                } else {
                    // Claimed/processing: wait for the terminal state.
                    Err(IngestError::JobAlreadyActive(*file_id))
                }
            }
        }
    }

    /// Current processing status for a file.
    #[tracing::instrument(skip(self))]
    pub async fn status(&self, file_id: Uuid) -> Result<FileStatus, IngestError> {
        let file = self
            .files
            .get(file_id)
            .await?
            .ok_or(IngestError::FileNotFound(file_id))?;

        let job = self.jobs.status_for_file(file.id).await?;
        let available_derivatives = self.derivatives.kinds_for_file(file.id).await?;

        let (job_status, last_error) = match job {
            Some((status, error)) => (Some(status), error),
            None => (None, None),
        };

        Ok(FileStatus {
            file_id: file.id,
            job_status,
            last_error,
            available_derivatives,
        })
    }

    /// Retrieve stored bytes for a file: the original, the summary
    /// document, or a derivative kind. The summary document is retrievable
    /// whenever it was written, even when other derivatives failed.
    #[tracing::instrument(skip(self))]
    pub async fn retrieve(
        &self,
        file_id: Uuid,
        target: RetrievalTarget,
    ) -> Result<RetrievedContent, IngestError> {
        let file = self
            .files
            .get(file_id)
            .await?
            .ok_or(IngestError::FileNotFound(file_id))?;

        match target {
            RetrievalTarget::Original => {
                let bytes = self
                    .storage
                    .get(&keys::original_key(file.owner_id, file.id))
                    .await?;
                Ok(RetrievedContent {
                    bytes,
                    content_type: file.declared_mime_type,
                })
            }
            RetrievalTarget::SummaryDocument => {
                match self
                    .storage
                    .get(&keys::summary_key(file.owner_id, file.id))
                    .await
                {
                    Ok(bytes) => Ok(RetrievedContent {
                        bytes,
                        content_type: SUMMARY_CONTENT_TYPE.to_string(),
                    }),
                    Err(StorageError::NotFound(_)) => Err(IngestError::ContentUnavailable(
                        format!("No summary document for file {} (processing incomplete)", file_id),
                    )),
                    Err(e) => Err(e.into()),
                }
            }
            RetrievalTarget::Derivative(kind) => {
                let row = self
                    .derivatives
                    .get(file.id, kind)
                    .await?
                    .ok_or_else(|| {
                        IngestError::ContentUnavailable(format!(
                            "No {} derivative for file {}",
                            kind, file_id
                        ))
                    })?;
                let bytes = self.storage.get(&row.storage_key).await?;
                Ok(RetrievedContent {
                    bytes,
                    content_type: row.content_type,
                })
            }
        }
    }

    /// Touch `last_opened_at` when a consumer opens the file.
    #[tracing::instrument(skip(self))]
    pub async fn record_open(&self, file_id: Uuid) -> Result<(), IngestError> {
        self.files.touch_opened(file_id).await?;
        Ok(())
    }

    /// Explicitly retry the failed job for a file: back to `pending` with
    /// the attempt bound reset.
    #[tracing::instrument(skip(self))]
    pub async fn retry_failed(&self, file_id: Uuid) -> Result<ProcessingJob, IngestError> {
        let job = self
            .jobs
            .latest_for_file(file_id)
            .await?
            .ok_or(IngestError::FileNotFound(file_id))?;

        Ok(self.jobs.retry_failed(job.id).await?)
    }
}

/// Keep user-supplied filenames storable and displayable: strip directory
/// components, reject traversal, replace non-portable characters.
fn sanitize_filename(filename: &str) -> String {
    const MAX: usize = 255;
    let path = std::path::Path::new(filename);
    let base = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    if base.contains("..") {
        return "invalid_filename".to_string();
    }
    let s: String = base
        .chars()
        .take(MAX)
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if s.trim().is_empty() {
        "file".to_string()
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_directories() {
        assert_eq!(sanitize_filename("/tmp/evil/notes.txt"), "notes.txt");
        assert_eq!(sanitize_filename("a b c.pdf"), "a_b_c.pdf");
    }

    #[test]
    fn test_sanitize_filename_rejects_traversal() {
        assert_eq!(sanitize_filename("..%2f..%2fpasswd"), "invalid_filename");
    }

    #[test]
    fn test_sanitize_filename_empty_falls_back() {
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("   "), "file");
    }

    #[test]
    fn test_retrieval_target_parse() {
        assert_eq!(
            "original".parse::<RetrievalTarget>().unwrap(),
            RetrievalTarget::Original
        );
        assert_eq!(
            "summary-document".parse::<RetrievalTarget>().unwrap(),
            RetrievalTarget::SummaryDocument
        );
        assert_eq!(
            "extracted-text".parse::<RetrievalTarget>().unwrap(),
            RetrievalTarget::Derivative(DerivativeKind::ExtractedText)
        );
        assert!("thumbnail".parse::<RetrievalTarget>().is_err());
    }

    #[test]
    fn test_overwrite_policy_default_rejects() {
        assert_eq!(OverwritePolicy::default(), OverwritePolicy::Reject);
    }
}
