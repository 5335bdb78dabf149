//! End-to-end pipeline tests against local storage.
//!
//! These exercise the classify → extract → derive → summarize flow and the
//! idempotence guarantees: deterministic keys, full overwrites, degraded
//! summaries for unknown types, and stage-tagged failures.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

use filecask_core::models::{
    DerivativeKind, IngestedFile, Stage, SummaryDocument,
};
use filecask_extractors::{
    ExtractedArtifact, Extraction, Extractor, ExtractorRegistry, NoopExtractor,
    PlainTextExtractor,
};
use filecask_processing::pipeline::DIRECT_PRODUCER;
use filecask_processing::{classify, Pipeline};
use filecask_storage::{keys, LocalStorage, Storage};

fn test_file(filename: &str, mime: &str) -> IngestedFile {
    IngestedFile {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        original_filename: filename.to_string(),
        path: Some(format!("/inbox/{}", filename)),
        declared_mime_type: mime.to_string(),
        size_bytes: 0,
        content_hash: None,
        pinned: false,
        created_at: Utc::now(),
        last_opened_at: None,
        deleted_at: None,
    }
}

async fn setup_storage() -> (TempDir, Arc<dyn Storage>) {
    let dir = tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
    (dir, storage)
}

async fn read_summary(storage: &Arc<dyn Storage>, file: &IngestedFile) -> SummaryDocument {
    let raw = storage
        .get(&keys::summary_key(file.owner_id, file.id))
        .await
        .unwrap();
    SummaryDocument::parse(std::str::from_utf8(&raw).unwrap()).unwrap()
}

#[derive(Debug)]
struct FailingExtractor;

#[async_trait]
impl Extractor for FailingExtractor {
    fn name(&self) -> &str {
        "failing"
    }

    fn matches(&self, _mime_type: &str, _extension: &str) -> bool {
        true
    }

    async fn extract(&self, _data: &[u8], _declared_mime: &str) -> Result<Extraction> {
        anyhow::bail!("malformed input")
    }
}

#[derive(Debug)]
struct PreviewExtractor;

#[async_trait]
impl Extractor for PreviewExtractor {
    fn name(&self) -> &str {
        "preview"
    }

    fn matches(&self, mime_type: &str, _extension: &str) -> bool {
        mime_type.starts_with("image/")
    }

    async fn extract(&self, data: &[u8], _declared_mime: &str) -> Result<Extraction> {
        Ok(Extraction {
            text: None,
            refined_mime: Some("image/png".to_string()),
            artifacts: vec![ExtractedArtifact {
                kind: DerivativeKind::PreviewImage,
                content_type: "image/png".to_string(),
                data: data.iter().rev().copied().collect(),
            }],
        })
    }
}

#[tokio::test]
async fn test_fast_track_summary_body_matches_input() {
    let (_dir, storage) = setup_storage().await;
    let pipeline = Pipeline::new(storage.clone(), ExtractorRegistry::new(), 3);

    let file = test_file("notes.txt", "text/plain");
    let input = b"10 bytes!!";
    let plan = classify(&file.declared_mime_type, &file.extension(), input.len() as u64);
    assert!(plan.fast_track);

    let outcome = pipeline.run(&file, input, &plan).await.unwrap();

    assert!(outcome.derivatives.is_empty());
    assert_eq!(outcome.producer, DIRECT_PRODUCER);
    assert_eq!(outcome.size_bytes, input.len() as i64);

    let summary = read_summary(&storage, &file).await;
    assert_eq!(summary.body, "10 bytes!!");
    assert_eq!(summary.frontmatter.content_type, "text/plain");
    assert!(summary.frontmatter.derivatives.is_empty());
    assert_eq!(summary.frontmatter.content_hash.as_deref(), Some(outcome.content_hash.as_str()));
}

#[tokio::test]
async fn test_fast_track_overwrite_produces_identical_keys() {
    let (_dir, storage) = setup_storage().await;
    let pipeline = Pipeline::new(storage.clone(), ExtractorRegistry::new(), 3);

    let file = test_file("notes.txt", "text/plain");
    let plan = classify("text/plain", "txt", 5);

    let first = pipeline.run(&file, b"first", &plan).await.unwrap();
    let second = pipeline.run(&file, b"second contents", &plan).await.unwrap();

    // Deterministic keys: re-processing overwrites rather than orphans.
    assert_eq!(first.summary_key, second.summary_key);

    let summary = read_summary(&storage, &file).await;
    assert_eq!(summary.body, "second contents");
}

#[tokio::test]
async fn test_unknown_type_gets_metadata_only_summary() {
    let (_dir, storage) = setup_storage().await;
    // Empty registry: resolution falls back to the no-op extractor.
    let pipeline = Pipeline::new(storage.clone(), ExtractorRegistry::new(), 3);

    let file = test_file("blob.bin", "application/octet-stream");
    let input = [0u8, 1, 2, 3, 255];
    let plan = classify(&file.declared_mime_type, &file.extension(), input.len() as u64);
    assert!(!plan.fast_track);

    let outcome = pipeline.run(&file, &input, &plan).await.unwrap();

    assert!(outcome.derivatives.is_empty());
    assert_eq!(outcome.producer, NoopExtractor::NAME);
    assert_eq!(outcome.resolved_mime_type, "application/octet-stream");

    let summary = read_summary(&storage, &file).await;
    assert!(summary.body.is_empty());
    assert!(summary.frontmatter.derivatives.is_empty());
}

#[tokio::test]
async fn test_full_pipeline_writes_extracted_text_derivative() {
    let (_dir, storage) = setup_storage().await;
    let registry = ExtractorRegistry::new();
    registry.register(Arc::new(PlainTextExtractor::new())).await;
    let pipeline = Pipeline::new(storage.clone(), registry, 3);

    // text/x-log is not on the fast-track allow-list, so the full pipeline
    // runs with the plain-text extractor.
    let file = test_file("server.log", "text/x-log");
    let input = b"line one\nline two\n";
    let plan = classify(&file.declared_mime_type, &file.extension(), input.len() as u64);
    assert!(!plan.fast_track);

    let outcome = pipeline.run(&file, input, &plan).await.unwrap();

    assert_eq!(outcome.producer, PlainTextExtractor::NAME);
    assert_eq!(outcome.resolved_mime_type, "text/plain");
    assert_eq!(outcome.derivatives.len(), 1);
    assert_eq!(outcome.derivatives[0].kind, DerivativeKind::ExtractedText);

    let stored = storage.get(&outcome.derivatives[0].storage_key).await.unwrap();
    assert_eq!(stored, input.to_vec());

    // Frontmatter derivative list mirrors the produced set exactly.
    let summary = read_summary(&storage, &file).await;
    assert_eq!(summary.frontmatter.derivatives.len(), 1);
    assert_eq!(summary.frontmatter.derivatives[0].kind, "extracted-text");
    assert_eq!(
        summary.frontmatter.derivatives[0].storage_key,
        outcome.derivatives[0].storage_key
    );
    assert_eq!(summary.body, "line one\nline two\n");
}

#[tokio::test]
async fn test_extractor_artifacts_written_at_kind_keys() {
    let (_dir, storage) = setup_storage().await;
    let registry = ExtractorRegistry::new();
    registry.register(Arc::new(PreviewExtractor)).await;
    let pipeline = Pipeline::new(storage.clone(), registry, 3);

    let file = test_file("photo.png", "image/png");
    let input = b"pngbytes";
    let plan = classify(&file.declared_mime_type, &file.extension(), input.len() as u64);

    let outcome = pipeline.run(&file, input, &plan).await.unwrap();

    assert_eq!(outcome.derivatives.len(), 1);
    assert_eq!(outcome.derivatives[0].kind, DerivativeKind::PreviewImage);
    assert_eq!(
        outcome.derivatives[0].storage_key,
        keys::derivative_key(file.owner_id, file.id, DerivativeKind::PreviewImage)
    );

    let preview = storage.get(&outcome.derivatives[0].storage_key).await.unwrap();
    let reversed: Vec<u8> = input.iter().rev().copied().collect();
    assert_eq!(preview, reversed);
}

#[tokio::test]
async fn test_extractor_failure_is_stage_tagged_and_leaves_no_summary() {
    let (_dir, storage) = setup_storage().await;
    let registry = ExtractorRegistry::new();
    registry.register(Arc::new(FailingExtractor)).await;
    let pipeline = Pipeline::new(storage.clone(), registry, 3);

    let file = test_file("broken.dat", "application/x-custom");
    let plan = classify(&file.declared_mime_type, &file.extension(), 4);

    let err = pipeline.run(&file, b"data", &plan).await.unwrap_err();

    assert_eq!(err.stage(), Stage::Extract);
    assert_eq!(err.tagged(), "extract: malformed input");

    // The summarize stage never ran: no summary document, not a corrupt one.
    let exists = storage
        .exists(&keys::summary_key(file.owner_id, file.id))
        .await
        .unwrap();
    assert!(!exists);
}

#[tokio::test]
async fn test_rerun_after_partial_failure_converges() {
    let (_dir, storage) = setup_storage().await;
    let registry = ExtractorRegistry::new();
    registry.register(Arc::new(PlainTextExtractor::new())).await;
    let pipeline = Pipeline::new(storage.clone(), registry, 3);

    let file = test_file("server.log", "text/x-log");
    let input = b"the real content\n";
    let plan = classify(&file.declared_mime_type, &file.extension(), input.len() as u64);

    // Simulate a prior attempt that wrote a derivative and then died
    // before summarize: stale bytes sit at the deterministic keys.
    let text_key = keys::derivative_key(file.owner_id, file.id, DerivativeKind::ExtractedText);
    storage
        .put(&text_key, b"stale partial write".to_vec(), "text/plain")
        .await
        .unwrap();

    let outcome = pipeline.run(&file, input, &plan).await.unwrap();

    // The retry overwrote the stale attempt in place; final state matches
    // a clean first run.
    assert_eq!(outcome.derivatives[0].storage_key, text_key);
    assert_eq!(storage.get(&text_key).await.unwrap(), input.to_vec());

    let summary = read_summary(&storage, &file).await;
    assert_eq!(summary.body, "the real content\n");
    assert_eq!(summary.frontmatter.derivatives.len(), 1);
}
