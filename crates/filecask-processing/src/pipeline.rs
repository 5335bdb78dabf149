//! The stage pipeline: extract → derive → summarize.
//!
//! Stages run strictly in order; a stage failure aborts the remaining
//! stages for this attempt and surfaces as a [`StageError`] the worker
//! records on the job. Already-completed stage writes are not rolled back:
//! every write is a full overwrite at a deterministic key, so a retried
//! job redoes everything and converges on the same state.
//!
//! Finalize (the single metadata transaction) is executed by the worker
//! via `filecask_db::finalize_ready` from the returned [`PipelineOutcome`].

use std::sync::Arc;

use filecask_core::constants::SUMMARY_CONTENT_TYPE;
use filecask_core::content_hash;
use filecask_core::models::{DerivativeKind, IngestedFile, NewDerivative, ProcessingPlan, Stage};
use filecask_core::StageError;
use filecask_extractors::{Extraction, ExtractorRegistry};
use filecask_storage::{keys, with_storage_retries, Storage};

use crate::summary::build_summary;

/// Producer name recorded for fast-track files that skip extraction.
pub const DIRECT_PRODUCER: &str = "direct";

const EXTRACTED_TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Everything finalize needs after the storage-writing stages succeeded.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub resolved_mime_type: String,
    pub content_hash: String,
    pub size_bytes: i64,
    pub producer: String,
    pub derivatives: Vec<NewDerivative>,
    pub summary_key: String,
}

/// The stage runner. Holds no persistent state; both the storage backend
/// and the extractor registry are injected once at process start.
pub struct Pipeline {
    storage: Arc<dyn Storage>,
    registry: ExtractorRegistry,
    storage_retry_attempts: u32,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        registry: ExtractorRegistry,
        storage_retry_attempts: u32,
    ) -> Self {
        Self {
            storage,
            registry,
            storage_retry_attempts,
        }
    }

    /// Drive one file through the plan's stages.
    #[tracing::instrument(skip(self, original, plan), fields(file_id = %file.id, fast_track = plan.fast_track))]
    pub async fn run(
        &self,
        file: &IngestedFile,
        original: &[u8],
        plan: &ProcessingPlan,
    ) -> Result<PipelineOutcome, StageError> {
        let hash = content_hash(original);
        let size_bytes = original.len() as i64;

        // extract
        let (extraction, producer) = if plan.runs(Stage::Extract) {
            let extractor = self
                .registry
                .resolve(&file.declared_mime_type, &file.extension())
                .await;
            let extraction = extractor
                .extract(original, &file.declared_mime_type)
                .await
                .map_err(|e| StageError::new(Stage::Extract, e))?;
            tracing::debug!(
                extractor = %extractor.name(),
                has_text = extraction.text.is_some(),
                artifacts = extraction.artifacts.len(),
                "Extraction complete"
            );
            (extraction, extractor.name().to_string())
        } else {
            // Fast track: text content needs no extractor, decode directly.
            let extraction = Extraction {
                text: Some(String::from_utf8_lossy(original).into_owned()),
                refined_mime: None,
                artifacts: Vec::new(),
            };
            (extraction, DIRECT_PRODUCER.to_string())
        };

        let resolved_mime_type = extraction
            .refined_mime
            .clone()
            .unwrap_or_else(|| file.declared_mime_type.clone());

        // derive
        let mut derivatives = Vec::new();
        if plan.runs(Stage::Derive) {
            if let Some(text) = &extraction.text {
                let key =
                    keys::derivative_key(file.owner_id, file.id, DerivativeKind::ExtractedText);
                let data = text.as_bytes().to_vec();
                let len = data.len() as i64;
                self.put_with_retries(Stage::Derive, &key, data, EXTRACTED_TEXT_CONTENT_TYPE)
                    .await?;
                derivatives.push(NewDerivative {
                    kind: DerivativeKind::ExtractedText,
                    storage_key: key,
                    content_type: EXTRACTED_TEXT_CONTENT_TYPE.to_string(),
                    size_bytes: len,
                });
            }

            for artifact in &extraction.artifacts {
                let key = keys::derivative_key(file.owner_id, file.id, artifact.kind);
                self.put_with_retries(
                    Stage::Derive,
                    &key,
                    artifact.data.clone(),
                    &artifact.content_type,
                )
                .await?;
                derivatives.push(NewDerivative {
                    kind: artifact.kind,
                    storage_key: key,
                    content_type: artifact.content_type.clone(),
                    size_bytes: artifact.data.len() as i64,
                });
            }
        }

        // summarize
        let body = extraction.text.unwrap_or_default();
        let summary = build_summary(
            file,
            &resolved_mime_type,
            Some(hash.clone()),
            &producer,
            &derivatives,
            body,
        );
        let rendered = summary
            .render()
            .map_err(|e| StageError::new(Stage::Summarize, e))?;
        let summary_key = keys::summary_key(file.owner_id, file.id);
        self.put_with_retries(
            Stage::Summarize,
            &summary_key,
            rendered.into_bytes(),
            SUMMARY_CONTENT_TYPE,
        )
        .await?;

        Ok(PipelineOutcome {
            resolved_mime_type,
            content_hash: hash,
            size_bytes,
            producer,
            derivatives,
            summary_key,
        })
    }

    /// Overwrite at a deterministic key, retrying transient storage errors
    /// with bounded attempts. Permanent errors and exhausted retries fail
    /// the stage.
    async fn put_with_retries(
        &self,
        stage: Stage,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StageError> {
        with_storage_retries("put", self.storage_retry_attempts, || {
            let data = data.clone();
            async move { self.storage.put(key, data, content_type).await }
        })
        .await
        .map_err(|e| StageError::new(stage, e))
    }
}
