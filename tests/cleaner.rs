use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use claims::{assert_err, assert_ok};

use clean_formidable_entries::cleaner::{CleanError, CleanOutcome, clean_expired_entries};
use clean_formidable_entries::repository::EntryStore;

struct Entry {
    id: i64,
    created_at: DateTime<Utc>,
}

struct Meta {
    item_id: i64,
    #[allow(dead_code)]
    meta_value: String,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    metas: Vec<Meta>,
    queries: usize,
}

/// In-memory stand-in for the Postgres-backed store.
#[derive(Default)]
struct InMemoryEntryStore {
    state: Mutex<State>,
}

impl InMemoryEntryStore {
    fn seed_entry(&self, id: i64, created_at: DateTime<Utc>) {
        self.state
            .lock()
            .unwrap()
            .entries
            .push(Entry { id, created_at });
    }

    fn seed_meta(&self, item_id: i64, meta_value: &str) {
        self.state.lock().unwrap().metas.push(Meta {
            item_id,
            meta_value: meta_value.to_string(),
        });
    }

    fn entry_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().entries.iter().map(|e| e.id).collect()
    }

    fn meta_item_ids(&self) -> Vec<i64> {
        self.state.lock().unwrap().metas.iter().map(|m| m.item_id).collect()
    }

    fn query_count(&self) -> usize {
        self.state.lock().unwrap().queries
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn count_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        let total = state
            .entries
            .iter()
            .filter(|e| e.created_at < cutoff)
            .count();
        Ok(total as u64)
    }

    async fn entry_ids_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, anyhow::Error> {
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.created_at < cutoff)
            .map(|e| e.id)
            .collect())
    }

    async fn delete_entries_before(&self, cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        let before = state.entries.len();
        state.entries.retain(|e| e.created_at >= cutoff);
        Ok((before - state.entries.len()) as u64)
    }

    async fn delete_metas_for(&self, entry_ids: &[i64]) -> Result<u64, anyhow::Error> {
        let mut state = self.state.lock().unwrap();
        state.queries += 1;
        let before = state.metas.len();
        state.metas.retain(|m| !entry_ids.contains(&m.item_id));
        Ok((before - state.metas.len()) as u64)
    }
}

/// Store whose every operation fails, as a dropped database connection would.
struct FailingEntryStore;

#[async_trait]
impl EntryStore for FailingEntryStore {
    async fn count_entries_before(&self, _cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn entry_ids_before(&self, _cutoff: DateTime<Utc>) -> Result<Vec<i64>, anyhow::Error> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn delete_entries_before(&self, _cutoff: DateTime<Utc>) -> Result<u64, anyhow::Error> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn delete_metas_for(&self, _entry_ids: &[i64]) -> Result<u64, anyhow::Error> {
        Err(anyhow!("connection reset by peer"))
    }
}

/// Three entries old enough to expire against any recent cutoff, one fresh
/// entry, and metadata rows for all four.
fn store_with_three_expired_entries() -> InMemoryEntryStore {
    let store = InMemoryEntryStore::default();

    store.seed_entry(1, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
    store.seed_entry(2, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
    store.seed_entry(3, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    store.seed_entry(4, Utc::now());

    store.seed_meta(1, "name=Ada");
    store.seed_meta(1, "email=ada@example.com");
    store.seed_meta(2, "name=Grace");
    store.seed_meta(3, "name=Edsger");
    store.seed_meta(4, "name=Barbara");

    store
}

#[tokio::test]
async fn invalid_expire_time_fails_before_any_query() {
    let store = InMemoryEntryStore::default();
    store.seed_entry(1, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());

    for expression in ["", "   ", "notatime", "months", "6lightyears", "0days"] {
        let error = assert_err!(clean_expired_entries(&store, expression, false).await);

        assert!(
            matches!(error, CleanError::InvalidExpireTime(_)),
            "expected InvalidExpireTime for {expression:?}, got: {error:?}"
        );
    }

    assert_eq!(store.query_count(), 0);
}

#[tokio::test]
async fn zero_matching_entries_is_a_successful_no_op() {
    let store = InMemoryEntryStore::default();
    store.seed_entry(1, Utc::now());
    store.seed_meta(1, "name=Ada");

    let outcome = assert_ok!(clean_expired_entries(&store, "6months", false).await);

    assert_eq!(outcome, CleanOutcome::NothingToDelete);
    assert_eq!(store.entry_ids(), vec![1]);
    assert_eq!(store.meta_item_ids(), vec![1]);
    // The count query is the only one issued.
    assert_eq!(store.query_count(), 1);
}

#[tokio::test]
async fn dry_run_reports_the_count_and_mutates_nothing() {
    let store = store_with_three_expired_entries();

    let outcome = assert_ok!(clean_expired_entries(&store, "6months", true).await);

    assert_eq!(outcome, CleanOutcome::DryRun { total: 3 });
    assert_eq!(store.entry_ids(), vec![1, 2, 3, 4]);
    assert_eq!(store.meta_item_ids(), vec![1, 1, 2, 3, 4]);
}

#[tokio::test]
async fn live_run_deletes_expired_entries_and_their_metas() {
    let store = store_with_three_expired_entries();

    let outcome = assert_ok!(clean_expired_entries(&store, "6months", false).await);

    assert_eq!(outcome, CleanOutcome::Deleted { total: 3 });
    // The fresh entry and its metadata survive untouched.
    assert_eq!(store.entry_ids(), vec![4]);
    assert_eq!(store.meta_item_ids(), vec![4]);
}

#[tokio::test]
async fn storage_failures_propagate_as_fatal_errors() {
    let error = assert_err!(clean_expired_entries(&FailingEntryStore, "6months", false).await);

    assert!(
        matches!(error, CleanError::StorageError(_)),
        "expected StorageError, got: {error:?}"
    );
}
