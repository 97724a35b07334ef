//! Storage root registry and orphaned blob log.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::warn;
use uuid::Uuid;

use refshelf_core::{
    new_v7, Error, NewOrphan, OrphanLog, OrphanReason, OrphanedBlob, Result, RootRegistry,
};

/// PostgreSQL implementation of RootRegistry.
///
/// Reservation is a primary-key insert, so two callers can never hold the
/// same root.
#[derive(Clone)]
pub struct PgRootRegistry {
    pool: Pool<Postgres>,
}

impl PgRootRegistry {
    /// Create a new PgRootRegistry with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RootRegistry for PgRootRegistry {
    async fn try_reserve(&self, root: &str) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO storage_root (root, reserved_at_utc) VALUES ($1, $2)
             ON CONFLICT (root) DO NOTHING",
        )
        .bind(root)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, root: &str) -> Result<()> {
        sqlx::query("DELETE FROM storage_root WHERE root = $1")
            .bind(root)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn is_reserved(&self, root: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM storage_root WHERE root = $1)")
                .bind(root)
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(exists)
    }
}

/// PostgreSQL implementation of OrphanLog.
#[derive(Clone)]
pub struct PgOrphanLog {
    pool: Pool<Postgres>,
}

impl PgOrphanLog {
    /// Create a new PgOrphanLog with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrphanLog for PgOrphanLog {
    async fn record(&self, orphans: Vec<NewOrphan>) -> Result<()> {
        if orphans.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for orphan in orphans {
            sqlx::query(
                "INSERT INTO orphaned_blob (id, path, reason, reference_id, recorded_at_utc)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(new_v7())
            .bind(&orphan.path)
            .bind(orphan.reason.to_string())
            .bind(orphan.reference_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn list(&self, limit: i64) -> Result<Vec<OrphanedBlob>> {
        let rows = sqlx::query(
            "SELECT id, path, reason, reference_id, recorded_at_utc
             FROM orphaned_blob ORDER BY recorded_at_utc, id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get("id");
            let reason: String = row.get("reason");
            let reason = match reason.parse::<OrphanReason>() {
                Ok(reason) => reason,
                Err(e) => {
                    warn!(orphan_id = %id, error = %e, "Skipping orphan entry with unknown reason");
                    continue;
                }
            };
            entries.push(OrphanedBlob {
                id,
                path: row.get("path"),
                reason,
                reference_id: row.get("reference_id"),
                recorded_at_utc: row.get("recorded_at_utc"),
            });
        }
        Ok(entries)
    }

    async fn remove(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query("DELETE FROM orphaned_blob WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn has_pending_under(&self, root: &str) -> Result<bool> {
        // starts_with rather than LIKE: slugs contain `_`
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM orphaned_blob WHERE starts_with(path, $1)) AS pending",
        )
        .bind(format!("{}/", root))
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.get("pending"))
    }
}
