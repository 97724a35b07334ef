//! Reference repository implementation.
//!
//! Attachments are embedded in the reference row as an ordered JSONB array;
//! they are never addressed on their own.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use refshelf_core::{
    new_v7, Attachment, Error, NewReference, Reference, ReferenceFieldUpdate,
    ReferenceRepository, Result,
};

const REFERENCE_COLUMNS: &str =
    "id, collection_id, title, memo, attachments, created_at_utc, updated_at_utc";

/// PostgreSQL implementation of ReferenceRepository.
#[derive(Clone)]
pub struct PgReferenceRepository {
    pool: Pool<Postgres>,
}

impl PgReferenceRepository {
    /// Create a new PgReferenceRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn reference_from_row(row: &PgRow) -> Result<Reference> {
    let attachments: Json<Vec<Attachment>> = row.try_get("attachments")?;
    Ok(Reference {
        id: row.get("id"),
        collection_id: row.get("collection_id"),
        title: row.get("title"),
        memo: row.get("memo"),
        attachments: attachments.0,
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
    })
}

#[async_trait]
impl ReferenceRepository for PgReferenceRepository {
    async fn insert(&self, req: NewReference) -> Result<Reference> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO reference_entry
                (id, collection_id, title, memo, attachments, created_at_utc, updated_at_utc)
            VALUES ($1, $2, $3, $4, '[]'::jsonb, $5, $5)
            RETURNING {REFERENCE_COLUMNS}
            "#
        ))
        .bind(new_v7())
        .bind(req.collection_id)
        .bind(&req.title)
        .bind(&req.memo)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        reference_from_row(&row)
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Reference>> {
        let row = sqlx::query(&format!(
            "SELECT {REFERENCE_COLUMNS} FROM reference_entry WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(reference_from_row).transpose()
    }

    async fn set_attachments(&self, id: Uuid, attachments: &[Attachment]) -> Result<()> {
        let result = sqlx::query(
            "UPDATE reference_entry SET attachments = $2, updated_at_utc = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(Json(attachments))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ReferenceNotFound(id));
        }
        Ok(())
    }

    async fn update_fields(&self, id: Uuid, update: ReferenceFieldUpdate) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE reference_entry
            SET collection_id = COALESCE($2, collection_id),
                title = COALESCE($3, title),
                memo = COALESCE($4, memo),
                updated_at_utc = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(update.collection_id)
        .bind(update.title)
        .bind(update.memo)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ReferenceNotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        // reference_keyword rows go with the reference (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM reference_entry WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
