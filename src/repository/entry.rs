use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Storage access over the `frm_items` / `frm_item_metas` tables.
///
/// Injected into the cleaner so tests can substitute an in-memory store.
#[async_trait]
pub trait EntryStore {
    async fn count_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error>;

    async fn entry_ids_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, anyhow::Error>;

    /// Returns the number of entry rows removed.
    async fn delete_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error>;

    /// Returns the number of metadata rows removed.
    async fn delete_metas_for(&self, entry_ids: &[i64]) -> Result<u64, anyhow::Error>;
}

pub struct PgEntryStore {
    pool: PgPool,
}

impl PgEntryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryStore for PgEntryStore {
    #[tracing::instrument(skip(self))]
    async fn count_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(id) FROM frm_items WHERE created_at < $1")
                .bind(cutoff)
                .fetch_one(&self.pool)
                .await
                .context("Failed to count expired entries")?;

        Ok(total as u64)
    }

    #[tracing::instrument(skip(self))]
    async fn entry_ids_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, anyhow::Error> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM frm_items WHERE created_at < $1")
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch ids of expired entries")?;

        Ok(ids)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        let result = sqlx::query("DELETE FROM frm_items WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to delete expired entries")?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, entry_ids), fields(entries = entry_ids.len()))]
    async fn delete_metas_for(&self, entry_ids: &[i64]) -> Result<u64, anyhow::Error> {
        // Bound array parameter; the statement length stays flat no matter
        // how large the batch is.
        let result = sqlx::query("DELETE FROM frm_item_metas WHERE item_id = ANY($1)")
            .bind(entry_ids)
            .execute(&self.pool)
            .await
            .context("Failed to delete metadata of expired entries")?;

        Ok(result.rows_affected())
    }
}
