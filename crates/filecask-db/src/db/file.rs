use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use filecask_core::models::IngestedFile;
use filecask_core::AppError;

const FILE_COLUMNS: &str = r#"
    id,
    owner_id,
    original_filename,
    path,
    declared_mime_type,
    size_bytes,
    content_hash,
    pinned,
    created_at,
    last_opened_at,
    deleted_at
"#;

/// Repository for `ingested_files`.
///
/// Every read filters `deleted_at IS NULL`; soft-deleted rows are only
/// reachable through maintenance tooling that inspects history directly.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a file row at submission time. `size_bytes` stays at its 0
    /// placeholder until the pipeline finalizes.
    #[tracing::instrument(skip(self))]
    pub async fn create(
        &self,
        owner_id: Uuid,
        original_filename: &str,
        path: Option<&str>,
        declared_mime_type: &str,
    ) -> Result<IngestedFile, AppError> {
        let file: IngestedFile = sqlx::query_as::<Postgres, IngestedFile>(&format!(
            r#"
            INSERT INTO ingested_files (owner_id, original_filename, path, declared_mime_type)
            VALUES ($1, $2, $3, $4)
            RETURNING {FILE_COLUMNS}
            "#,
        ))
        .bind(owner_id)
        .bind(original_filename)
        .bind(path)
        .bind(declared_mime_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, path))?;

        tracing::info!(
            file_id = %file.id,
            owner_id = %owner_id,
            filename = %original_filename,
            "Ingested file created"
        );

        Ok(file)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Option<IngestedFile>, AppError> {
        let file = sqlx::query_as::<Postgres, IngestedFile>(&format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM ingested_files
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    /// Look up a non-deleted file by its owner-scoped display path
    /// (the overwrite-on-resubmit lookup).
    #[tracing::instrument(skip(self))]
    pub async fn get_by_path(
        &self,
        owner_id: Uuid,
        path: &str,
    ) -> Result<Option<IngestedFile>, AppError> {
        let file = sqlx::query_as::<Postgres, IngestedFile>(&format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM ingested_files
            WHERE owner_id = $1 AND path = $2 AND deleted_at IS NULL
            "#,
        ))
        .bind(owner_id)
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<IngestedFile>, AppError> {
        let files = sqlx::query_as::<Postgres, IngestedFile>(&format!(
            r#"
            SELECT {FILE_COLUMNS}
            FROM ingested_files
            WHERE owner_id = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    /// Refresh the submission-time fields when an existing file is
    /// overwritten by a new upload. Size and hash return to their
    /// placeholders until the new job finalizes.
    #[tracing::instrument(skip(self))]
    pub async fn update_submission(
        &self,
        id: Uuid,
        original_filename: &str,
        declared_mime_type: &str,
    ) -> Result<IngestedFile, AppError> {
        let file = sqlx::query_as::<Postgres, IngestedFile>(&format!(
            r#"
            UPDATE ingested_files
            SET original_filename = $2,
                declared_mime_type = $3,
                size_bytes = 0,
                content_hash = NULL
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {FILE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(original_filename)
        .bind(declared_mime_type)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        Ok(file)
    }

    /// Rename/move a file to a new display path.
    #[tracing::instrument(skip(self))]
    pub async fn rename(&self, id: Uuid, new_path: &str) -> Result<IngestedFile, AppError> {
        let file = sqlx::query_as::<Postgres, IngestedFile>(&format!(
            r#"
            UPDATE ingested_files
            SET path = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {FILE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(new_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, Some(new_path)))?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        tracing::info!(file_id = %id, path = %new_path, "File renamed");

        Ok(file)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_pinned(&self, id: Uuid, pinned: bool) -> Result<IngestedFile, AppError> {
        let file = sqlx::query_as::<Postgres, IngestedFile>(&format!(
            r#"
            UPDATE ingested_files
            SET pinned = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {FILE_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(pinned)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))?;

        Ok(file)
    }

    /// Soft-delete: sets `deleted_at`, never clears it. The row and its
    /// storage keys remain for history; returns false when already deleted
    /// or unknown.
    #[tracing::instrument(skip(self))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE ingested_files
            SET deleted_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            tracing::info!(file_id = %id, "File soft-deleted");
        }

        Ok(deleted)
    }

    /// Touch `last_opened_at` when a consumer reads the file.
    #[tracing::instrument(skip(self))]
    pub async fn touch_opened(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE ingested_files
            SET last_opened_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error, path: Option<&str>) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!(
                "Path {} already in use",
                path.unwrap_or("<unset>")
            ));
        }
    }
    AppError::Database(err)
}
