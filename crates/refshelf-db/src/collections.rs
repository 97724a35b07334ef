//! Collection directory implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use refshelf_core::{new_v7, Collection, CollectionDirectory, Error, Result};

/// PostgreSQL implementation of CollectionDirectory.
#[derive(Clone)]
pub struct PgCollectionDirectory {
    pool: Pool<Postgres>,
}

impl PgCollectionDirectory {
    /// Create a new PgCollectionDirectory with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn collection_from_row(row: &PgRow) -> Collection {
    Collection {
        id: row.get("id"),
        name: row.get("name"),
        owner_id: row.get("owner_id"),
        created_at_utc: row.get("created_at_utc"),
    }
}

#[async_trait]
impl CollectionDirectory for PgCollectionDirectory {
    async fn find_by_name(&self, name: &str) -> Result<Option<Collection>> {
        // Names are unique per owner only; the oldest collection wins.
        let row = sqlx::query(
            r#"
            SELECT id, name, owner_id, created_at_utc
            FROM collection
            WHERE name = $1
            ORDER BY created_at_utc, id
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(collection_from_row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Collection>> {
        let row = sqlx::query(
            "SELECT id, name, owner_id, created_at_utc FROM collection WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(collection_from_row))
    }

    async fn insert(&self, name: &str, owner_id: Uuid) -> Result<Collection> {
        let row = sqlx::query(
            r#"
            INSERT INTO collection (id, name, owner_id, created_at_utc)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, owner_id, created_at_utc
            "#,
        )
        .bind(new_v7())
        .bind(name)
        .bind(owner_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(collection_from_row(&row))
    }
}
