use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use filecask_core::models::{Derivative, DerivativeKind, NewDerivative};
use filecask_core::AppError;

const DERIVATIVE_COLUMNS: &str = r#"
    file_id,
    kind,
    storage_key,
    content_type,
    size_bytes,
    created_at
"#;

/// Repository for `derivatives`.
///
/// `(file_id, kind)` is the primary key: re-processing overwrites a
/// derivative row in place, mirroring the overwrite at its deterministic
/// storage key. Rows are only written by the pipeline's finalize
/// transaction, never by retrieval-side callers.
#[derive(Clone)]
pub struct DerivativeRepository {
    pool: PgPool,
}

impl DerivativeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert one derivative row outside a transaction. The finalize path
    /// uses [`transaction::finalize_ready`](crate::db::transaction) instead.
    #[tracing::instrument(skip(self, derivative))]
    pub async fn upsert(
        &self,
        file_id: Uuid,
        derivative: &NewDerivative,
    ) -> Result<Derivative, AppError> {
        let row = sqlx::query_as::<Postgres, Derivative>(&format!(
            r#"
            INSERT INTO derivatives (file_id, kind, storage_key, content_type, size_bytes)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (file_id, kind) DO UPDATE
            SET storage_key = EXCLUDED.storage_key,
                content_type = EXCLUDED.content_type,
                size_bytes = EXCLUDED.size_bytes,
                created_at = NOW()
            RETURNING {DERIVATIVE_COLUMNS}
            "#,
        ))
        .bind(file_id)
        .bind(derivative.kind.to_string())
        .bind(&derivative.storage_key)
        .bind(&derivative.content_type)
        .bind(derivative.size_bytes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_for_file(&self, file_id: Uuid) -> Result<Vec<Derivative>, AppError> {
        let rows = sqlx::query_as::<Postgres, Derivative>(&format!(
            r#"
            SELECT {DERIVATIVE_COLUMNS}
            FROM derivatives
            WHERE file_id = $1
            ORDER BY kind
            "#,
        ))
        .bind(file_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Derivative kinds currently available for a file (status queries).
    #[tracing::instrument(skip(self))]
    pub async fn kinds_for_file(&self, file_id: Uuid) -> Result<Vec<DerivativeKind>, AppError> {
        Ok(self
            .list_for_file(file_id)
            .await?
            .into_iter()
            .map(|d| d.kind)
            .collect())
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        file_id: Uuid,
        kind: DerivativeKind,
    ) -> Result<Option<Derivative>, AppError> {
        let row = sqlx::query_as::<Postgres, Derivative>(&format!(
            r#"
            SELECT {DERIVATIVE_COLUMNS}
            FROM derivatives
            WHERE file_id = $1 AND kind = $2
            "#,
        ))
        .bind(file_id)
        .bind(kind.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
