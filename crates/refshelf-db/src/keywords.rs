//! Keyword repository implementation.
//!
//! `keyword.text` carries a unique constraint; concurrent creators of the
//! same text race on `INSERT ... ON CONFLICT DO NOTHING` and the loser
//! re-reads the winner's row.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use refshelf_core::{new_v7, Error, Keyword, KeywordRepository, ReferenceKeywordLink, Result};

/// PostgreSQL implementation of KeywordRepository.
#[derive(Clone)]
pub struct PgKeywordRepository {
    pool: Pool<Postgres>,
}

impl PgKeywordRepository {
    /// Create a new PgKeywordRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn keyword_from_row(row: &PgRow) -> Keyword {
    Keyword {
        id: row.get("id"),
        text: row.get("text"),
        created_at_utc: row.get("created_at_utc"),
    }
}

#[async_trait]
impl KeywordRepository for PgKeywordRepository {
    async fn find_by_text(&self, text: &str) -> Result<Option<Keyword>> {
        let row = sqlx::query("SELECT id, text, created_at_utc FROM keyword WHERE text = $1")
            .bind(text)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(keyword_from_row))
    }

    async fn insert_if_absent(&self, text: &str) -> Result<Option<Keyword>> {
        let row = sqlx::query(
            r#"
            INSERT INTO keyword (id, text, created_at_utc)
            VALUES ($1, $2, $3)
            ON CONFLICT (text) DO NOTHING
            RETURNING id, text, created_at_utc
            "#,
        )
        .bind(new_v7())
        .bind(text)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(keyword_from_row))
    }

    async fn list(&self) -> Result<Vec<Keyword>> {
        let rows = sqlx::query("SELECT id, text, created_at_utc FROM keyword ORDER BY text")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(keyword_from_row).collect())
    }

    async fn add_link(&self, link: ReferenceKeywordLink) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO reference_keyword (reference_id, keyword_id, position)
            VALUES ($1, $2, $3)
            ON CONFLICT (reference_id, keyword_id) DO NOTHING
            "#,
        )
        .bind(link.reference_id)
        .bind(link.keyword_id)
        .bind(link.position)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_links(&self, reference_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reference_keyword WHERE reference_id = $1")
            .bind(reference_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    async fn for_reference(&self, reference_id: Uuid) -> Result<Vec<Keyword>> {
        let rows = sqlx::query(
            r#"
            SELECT k.id, k.text, k.created_at_utc
            FROM reference_keyword rk
            JOIN keyword k ON k.id = rk.keyword_id
            WHERE rk.reference_id = $1
            ORDER BY rk.position, k.text
            "#,
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(keyword_from_row).collect())
    }
}
