//! Finalize transaction.
//!
//! Finalize is the single metadata transaction at the end of a successful
//! pipeline run: derivative rows are upserted, the file's size/hash/MIME
//! fields are updated, and the job transitions to `ready` atomically, so
//! a status query never observes a `ready` job with missing rows.

use sqlx::PgPool;
use uuid::Uuid;

use filecask_core::models::NewDerivative;
use filecask_core::AppError;

/// File fields computed by the pipeline and persisted at finalize.
#[derive(Debug, Clone)]
pub struct FileFinalize {
    pub size_bytes: i64,
    pub content_hash: String,
    /// Declared type refined by extraction.
    pub resolved_mime_type: String,
}

/// Apply the finalize transaction for a successfully processed job.
///
/// Unconditional on job status: if a stale-claim reclaim raced us and the
/// job was re-run elsewhere, both runs produced identical artifacts from
/// the same source bytes, so the last writer wins harmlessly.
#[tracing::instrument(skip(pool, finalize, derivatives))]
pub async fn finalize_ready(
    pool: &PgPool,
    job_id: Uuid,
    file_id: Uuid,
    finalize: &FileFinalize,
    derivatives: &[NewDerivative],
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE ingested_files
        SET size_bytes = $2,
            content_hash = $3,
            declared_mime_type = $4
        WHERE id = $1
        "#,
    )
    .bind(file_id)
    .bind(finalize.size_bytes)
    .bind(&finalize.content_hash)
    .bind(&finalize.resolved_mime_type)
    .execute(&mut *tx)
    .await?;

    for derivative in derivatives {
        sqlx::query(
            r#"
            INSERT INTO derivatives (file_id, kind, storage_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (file_id, kind) DO UPDATE
            SET storage_key = EXCLUDED.storage_key,
                content_type = EXCLUDED.content_type,
                size_bytes = EXCLUDED.size_bytes,
                created_at = NOW()
            "#,
        )
        .bind(file_id)
        .bind(derivative.kind.to_string())
        .bind(&derivative.storage_key)
        .bind(&derivative.content_type)
        .bind(derivative.size_bytes)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        r#"
        UPDATE processing_jobs
        SET status = 'ready',
            finished_at = NOW(),
            last_error = NULL,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        job_id = %job_id,
        file_id = %file_id,
        derivative_count = derivatives.len(),
        size_bytes = finalize.size_bytes,
        "Job finalized"
    );

    Ok(())
}
