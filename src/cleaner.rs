use chrono::Utc;

use crate::domain::ExpireTime;
use crate::error_chain_fmt;
use crate::repository::EntryStore;

#[derive(thiserror::Error)]
pub enum CleanError {
    #[error("{0}")]
    InvalidExpireTime(String),

    #[error(transparent)]
    StorageError(#[from] anyhow::Error),
}

impl std::fmt::Debug for CleanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CleanOutcome {
    NothingToDelete,
    DryRun { total: u64 },
    Deleted { total: u64 },
}

/// Deletes entries created before `now - expire_time`, along with their
/// metadata rows. With `dry_run` set, reports what would be deleted and
/// leaves storage untouched.
#[tracing::instrument(skip(store), fields(cutoff = tracing::field::Empty))]
pub async fn clean_expired_entries<S: EntryStore>(
    store: &S,
    expire_time: &str,
    dry_run: bool,
) -> Result<CleanOutcome, CleanError> {
    let expire_time = ExpireTime::parse(expire_time).map_err(CleanError::InvalidExpireTime)?;

    // One cutoff per invocation; counting and deletion share it.
    let cutoff = expire_time.cutoff_from(Utc::now());
    let formatted_cutoff = cutoff.format("%Y-%m-%d %H:%M:%S").to_string();
    tracing::Span::current().record("cutoff", tracing::field::display(&formatted_cutoff));

    tracing::info!("Start the cleaning process for entries before : {formatted_cutoff}");

    let total_entries = store.count_entries_before(cutoff).await?;

    let outcome = if total_entries == 0 {
        tracing::warn!("No entries to delete.");
        CleanOutcome::NothingToDelete
    } else {
        // Captured before the entry delete; the metadata delete must not
        // re-query, or entries inserted mid-run could widen the batch.
        let entry_ids = store.entry_ids_before(cutoff).await?;

        if dry_run {
            tracing::warn!("Dry run: {total_entries} entries would be deleted.");
            CleanOutcome::DryRun {
                total: total_entries,
            }
        } else {
            // Two independent statements; a failure between them leaves the
            // metadata rows of already-deleted entries behind.
            let deleted = store.delete_entries_before(cutoff).await?;
            store.delete_metas_for(&entry_ids).await?;

            tracing::info!("{deleted} entries deleted.");
            CleanOutcome::Deleted { total: deleted }
        }
    };

    tracing::info!("End cleaning of expired entries and associated metas");

    Ok(outcome)
}
