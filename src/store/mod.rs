//! Dataset store: the single `current` dataset plus a rotating backup history.
//!
//! Every operation is a plain sequence of key-value calls. There is no lock or
//! compare-and-swap around `save_current`, so two writers that read the same
//! version both produce `version + 1` and the later write wins.

mod sweeper;

pub use sweeper::RetentionSweeper;

use std::sync::Arc;

use chrono::Utc;

use crate::db::KvStore;
use crate::errors::AppError;
use crate::models::{BackupInfo, Dataset, SweepReport};

/// Key holding the live dataset.
pub const CURRENT_KEY: &str = "current";
/// Key holding the most-recent-first list of backup keys.
pub const BACKUP_INDEX_KEY: &str = "backup-index";
/// Prefix of every backup blob key, followed by epoch milliseconds.
pub const BACKUP_KEY_PREFIX: &str = "backup:";
/// Number of backups retained in the index.
pub const MAX_BACKUPS: usize = 10;

/// Owner of the `current` slot and the backup index.
pub struct DatasetStore {
    kv: Arc<dyn KvStore>,
}

impl DatasetStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Return the live dataset, seeding and persisting a default one on first use.
    pub async fn get_current(&self) -> Result<Dataset, AppError> {
        if let Some(raw) = self.kv.get(CURRENT_KEY).await? {
            return Ok(serde_json::from_str(&raw)?);
        }

        let seed = Dataset::seed(Utc::now().to_rfc3339());
        self.kv
            .put(CURRENT_KEY, &serde_json::to_string(&seed)?)
            .await?;
        tracing::info!("Seeded empty store with {} categories", seed.categories.len());
        Ok(seed)
    }

    /// Persist `dataset` as the new current version.
    ///
    /// The stored value gets `version + 1` and a fresh `updatedAt`; it replaces
    /// the previous value in full. With `make_backup` the result is also
    /// snapshotted into the backup rotation.
    pub async fn save_current(
        &self,
        dataset: Dataset,
        make_backup: bool,
    ) -> Result<Dataset, AppError> {
        let next = Dataset {
            version: dataset.version + 1,
            updated_at: Utc::now().to_rfc3339(),
            ..dataset
        };

        self.kv
            .put(CURRENT_KEY, &serde_json::to_string(&next)?)
            .await?;
        tracing::debug!("Saved dataset version {}", next.version);

        if make_backup {
            self.backup(&next).await?;
        }

        Ok(next)
    }

    /// Snapshot `dataset` under a new backup key and rotate the index.
    ///
    /// Returns the key written. Blobs of evicted entries are deleted on a best
    /// effort basis: a failed delete is logged and the truncated index is still
    /// written.
    pub async fn backup(&self, dataset: &Dataset) -> Result<String, AppError> {
        let mut index = self.read_index().await?;
        let key = next_backup_key(Utc::now().timestamp_millis(), index.first());

        self.kv.put(&key, &serde_json::to_string(dataset)?).await?;

        index.insert(0, key.clone());
        let evicted = self.evict_overflow(&mut index).await;
        self.write_index(&index).await?;

        tracing::info!(
            "Created backup {} of version {} ({} retained, {} evicted)",
            key,
            dataset.version,
            index.len(),
            evicted.len()
        );
        Ok(key)
    }

    /// Replace the live dataset with the snapshot stored under `key`.
    ///
    /// The snapshot is written back verbatim, keeping its own version, and is
    /// then backed up again so the restore shows up in the backup list.
    pub async fn restore_backup(&self, key: &str) -> Result<Dataset, AppError> {
        let not_found = || AppError::NotFound(format!("Backup {} not found", key));

        if !key.starts_with(BACKUP_KEY_PREFIX) {
            return Err(not_found());
        }
        let raw = self.kv.get(key).await?.ok_or_else(not_found)?;
        let snapshot: Dataset = serde_json::from_str(&raw)?;

        self.kv.put(CURRENT_KEY, &raw).await?;
        self.backup(&snapshot).await?;

        tracing::info!("Restored backup {} (version {})", key, snapshot.version);
        Ok(snapshot)
    }

    /// List retained backups, most recent first.
    pub async fn list_backups(&self) -> Result<Vec<BackupInfo>, AppError> {
        let index = self.read_index().await?;
        Ok(index
            .into_iter()
            .map(|key| BackupInfo {
                timestamp: backup_timestamp(&key).unwrap_or(0),
                key,
            })
            .collect())
    }

    /// Re-apply the retention cap to the stored index.
    ///
    /// An index already within the cap is left untouched and nothing is deleted.
    pub async fn sweep_backups(&self) -> Result<SweepReport, AppError> {
        let mut index = self.read_index().await?;
        if index.len() <= MAX_BACKUPS {
            return Ok(SweepReport {
                retained: index.len(),
                evicted: Vec::new(),
            });
        }

        let evicted = self.evict_overflow(&mut index).await;
        self.write_index(&index).await?;

        tracing::info!(
            "Retention sweep evicted {} backups, {} retained",
            evicted.len(),
            index.len()
        );
        Ok(SweepReport {
            retained: index.len(),
            evicted,
        })
    }

    async fn read_index(&self) -> Result<Vec<String>, AppError> {
        match self.kv.get(BACKUP_INDEX_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_index(&self, index: &[String]) -> Result<(), AppError> {
        self.kv
            .put(BACKUP_INDEX_KEY, &serde_json::to_string(index)?)
            .await
    }

    /// Cut `index` down to [`MAX_BACKUPS`] and delete the blobs that fell off.
    async fn evict_overflow(&self, index: &mut Vec<String>) -> Vec<String> {
        if index.len() <= MAX_BACKUPS {
            return Vec::new();
        }

        let evicted = index.split_off(MAX_BACKUPS);
        for key in &evicted {
            // A duplicated key may still be referenced by a retained entry.
            if index.contains(key) {
                continue;
            }
            if let Err(e) = self.kv.delete(key).await {
                tracing::warn!("Failed to delete evicted backup {}: {}", key, e);
            }
        }
        evicted
    }
}

/// Parse the epoch-millisecond suffix of a backup key.
pub fn backup_timestamp(key: &str) -> Option<i64> {
    key.rsplit(':').next()?.parse().ok()
}

/// Build a backup key for `now_ms` that sorts after the newest indexed key.
fn next_backup_key(now_ms: i64, newest: Option<&String>) -> String {
    let floor = newest
        .and_then(|k| backup_timestamp(k))
        .map(|ts| ts + 1)
        .unwrap_or(i64::MIN);
    format!("{}{}", BACKUP_KEY_PREFIX, now_ms.max(floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::db::MemoryKv;
    use crate::models::{Bookmark, Category, Visibility};

    /// Wraps [`MemoryKv`], counting writes and optionally failing deletes.
    #[derive(Default)]
    struct RecordingKv {
        inner: MemoryKv,
        puts: AtomicUsize,
        deletes: AtomicUsize,
        fail_deletes: bool,
    }

    impl RecordingKv {
        fn failing_deletes() -> Self {
            Self {
                fail_deletes: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl KvStore for RecordingKv {
        async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            self.inner.put(key, value).await
        }

        async fn delete(&self, key: &str) -> Result<(), AppError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.fail_deletes {
                return Err(AppError::Storage("delete refused".to_string()));
            }
            self.inner.delete(key).await
        }
    }

    /// Backend that is always unreachable.
    struct UnreachableKv;

    #[async_trait]
    impl KvStore for UnreachableKv {
        async fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
            Err(AppError::Storage("connection refused".to_string()))
        }

        async fn put(&self, _key: &str, _value: &str) -> Result<(), AppError> {
            Err(AppError::Storage("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> Result<(), AppError> {
            Err(AppError::Storage("connection refused".to_string()))
        }
    }

    fn memory_store() -> (Arc<MemoryKv>, DatasetStore) {
        let kv = Arc::new(MemoryKv::new());
        (kv.clone(), DatasetStore::new(kv))
    }

    fn add_bookmark(data: &mut Dataset, title: &str) {
        let category_id = data.categories[0].id.clone();
        let order = data.next_bookmark_order(&category_id);
        data.bookmarks.push(Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            category_id,
            title: title.to_string(),
            url: format!("https://example.com/{}", title),
            description: None,
            icon_url: None,
            is_private: false,
            order,
            created_at: Utc::now().to_rfc3339(),
            updated_at: Utc::now().to_rfc3339(),
        });
    }

    async fn write_index(kv: &dyn KvStore, keys: &[String]) {
        for key in keys {
            kv.put(key, "{}").await.unwrap();
        }
        kv.put(BACKUP_INDEX_KEY, &serde_json::to_string(keys).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_current_seeds_empty_store() {
        let (kv, store) = memory_store();

        let first = store.get_current().await.unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(first.categories.len(), 3);
        assert!(first.bookmarks.is_empty());
        assert!(kv.get(CURRENT_KEY).await.unwrap().is_some());

        let second = store.get_current().await.unwrap();
        assert_eq!(second.version, 1);
        assert_eq!(second.categories, first.categories);
    }

    #[tokio::test]
    async fn test_sequential_saves_increment_version() {
        let (_, store) = memory_store();
        let mut data = store.get_current().await.unwrap();

        for i in 0..5 {
            let previous = data.version;
            add_bookmark(&mut data, &format!("site-{}", i));
            data = store.save_current(data, true).await.unwrap();
            assert_eq!(data.version, previous + 1);
        }

        let current = store.get_current().await.unwrap();
        assert_eq!(current.version, 6);
        assert_eq!(current.bookmarks.len(), 5);
    }

    #[tokio::test]
    async fn test_save_without_version_yields_one() {
        let (_, store) = memory_store();
        let legacy: Dataset =
            serde_json::from_str(r#"{"categories":[],"bookmarks":[]}"#).unwrap();

        let saved = store.save_current(legacy, false).await.unwrap();

        assert_eq!(saved.version, 1);
        assert!(!saved.updated_at.is_empty());
    }

    #[tokio::test]
    async fn test_save_without_backup_leaves_index_alone() {
        let (kv, store) = memory_store();
        let data = store.get_current().await.unwrap();

        let saved = store.save_current(data, false).await.unwrap();

        assert_eq!(saved.version, 2);
        assert_eq!(store.get_current().await.unwrap().version, 2);
        assert!(store.list_backups().await.unwrap().is_empty());
        assert!(kv.get(BACKUP_INDEX_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_backup_rotation_caps_at_ten() {
        let (kv, store) = memory_store();
        let mut data = store.get_current().await.unwrap();

        data = store.save_current(data, true).await.unwrap();
        let oldest_key = store.list_backups().await.unwrap()[0].key.clone();

        for _ in 0..11 {
            data = store.save_current(data, true).await.unwrap();
        }

        let backups = store.list_backups().await.unwrap();
        assert_eq!(backups.len(), MAX_BACKUPS);
        assert!(backups.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
        assert!(backups.iter().all(|b| b.key != oldest_key));
        assert!(kv.get(&oldest_key).await.unwrap().is_none());

        // Newest backup mirrors the current dataset.
        let newest: Dataset =
            serde_json::from_str(&kv.get(&backups[0].key).await.unwrap().unwrap()).unwrap();
        assert_eq!(newest.version, data.version);

        let backup_blobs = kv
            .keys()
            .await
            .into_iter()
            .filter(|k| k.starts_with(BACKUP_KEY_PREFIX))
            .count();
        assert_eq!(backup_blobs, MAX_BACKUPS);
    }

    #[tokio::test]
    async fn test_backups_in_same_millisecond_get_distinct_keys() {
        let (_, store) = memory_store();
        let data = store.get_current().await.unwrap();

        let first = store.backup(&data).await.unwrap();
        let second = store.backup(&data).await.unwrap();
        let third = store.backup(&data).await.unwrap();

        assert_ne!(first, second);
        assert_ne!(second, third);
        let listed: Vec<String> = store
            .list_backups()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(listed, vec![third, second, first]);
    }

    #[tokio::test]
    async fn test_restore_backup_round_trip() {
        let (kv, store) = memory_store();
        let mut data = store.get_current().await.unwrap();
        for i in 0..4 {
            add_bookmark(&mut data, &format!("page-{}", i));
            data = store.save_current(data, true).await.unwrap();
        }

        let target = store.list_backups().await.unwrap()[2].key.clone();
        let expected: Dataset =
            serde_json::from_str(&kv.get(&target).await.unwrap().unwrap()).unwrap();

        let restored = store.restore_backup(&target).await.unwrap();

        assert_eq!(restored, expected);
        assert_eq!(store.get_current().await.unwrap(), expected);
        // The restored state is itself the newest backup.
        let backups = store.list_backups().await.unwrap();
        assert_eq!(backups.len(), 5);
        let newest: Dataset =
            serde_json::from_str(&kv.get(&backups[0].key).await.unwrap().unwrap()).unwrap();
        assert_eq!(newest, expected);
    }

    #[tokio::test]
    async fn test_restore_missing_key_is_not_found() {
        let (_, store) = memory_store();
        let data = store.get_current().await.unwrap();
        let saved = store.save_current(data, true).await.unwrap();

        for key in ["backup:1", "current", "backup-index"] {
            let err = store.restore_backup(key).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)), "{}", key);
        }

        assert_eq!(store.get_current().await.unwrap(), saved);
        assert_eq!(store.list_backups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_saves_are_last_write_wins() {
        let (_, store) = memory_store();
        let base = store.get_current().await.unwrap();

        let mut writer_a = base.clone();
        let mut writer_b = base.clone();
        add_bookmark(&mut writer_a, "from-a");
        writer_b.categories.push(Category::new("From B", 3, Visibility::Private));

        store.save_current(writer_a, true).await.unwrap();
        let saved_b = store.save_current(writer_b, true).await.unwrap();

        let current = store.get_current().await.unwrap();
        assert_eq!(current.version, base.version + 1);
        assert_eq!(current, saved_b);
        assert!(current.bookmarks.is_empty());
        assert_eq!(current.categories.len(), 4);
        // Writer A survives only as a backup.
        assert_eq!(store.list_backups().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sweep_within_cap_is_noop() {
        let kv = Arc::new(RecordingKv::default());
        let store = DatasetStore::new(kv.clone());
        let keys: Vec<String> = (0..MAX_BACKUPS as i64)
            .map(|i| format!("backup:{}", 1_000 - i))
            .collect();
        write_index(kv.as_ref(), &keys).await;
        let puts_before = kv.puts.load(Ordering::SeqCst);

        let report = store.sweep_backups().await.unwrap();

        assert_eq!(report.retained, MAX_BACKUPS);
        assert!(report.evicted.is_empty());
        assert_eq!(kv.puts.load(Ordering::SeqCst), puts_before);
        assert_eq!(kv.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sweep_trims_overgrown_index() {
        let (kv, store) = memory_store();
        let keys: Vec<String> = (0..13).map(|i| format!("backup:{}", 5_000 - i)).collect();
        write_index(kv.as_ref(), &keys).await;

        let report = store.sweep_backups().await.unwrap();

        assert_eq!(report.retained, MAX_BACKUPS);
        assert_eq!(report.evicted, keys[MAX_BACKUPS..].to_vec());
        let listed: Vec<String> = store
            .list_backups()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(listed, keys[..MAX_BACKUPS].to_vec());
        for key in &keys[MAX_BACKUPS..] {
            assert!(kv.get(key).await.unwrap().is_none());
        }

        // Second run has nothing left to do.
        assert!(store.sweep_backups().await.unwrap().evicted.is_empty());
    }

    #[tokio::test]
    async fn test_failed_eviction_still_truncates_index() {
        let kv = Arc::new(RecordingKv::failing_deletes());
        let store = DatasetStore::new(kv.clone());
        let keys: Vec<String> = (0..MAX_BACKUPS as i64)
            .map(|i| format!("backup:{}", 1_000 - i))
            .collect();
        write_index(kv.as_ref(), &keys).await;

        let data = store.get_current().await.unwrap();
        let new_key = store.backup(&data).await.unwrap();

        let backups = store.list_backups().await.unwrap();
        assert_eq!(backups.len(), MAX_BACKUPS);
        assert_eq!(backups[0].key, new_key);
        assert_eq!(kv.deletes.load(Ordering::SeqCst), 1);
        // The orphaned blob is still there.
        assert!(kv.get("backup:991").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let store = DatasetStore::new(Arc::new(UnreachableKv));

        assert!(matches!(
            store.get_current().await,
            Err(AppError::Storage(_))
        ));
        assert!(matches!(
            store.save_current(Dataset::seed(String::new()), true).await,
            Err(AppError::Storage(_))
        ));
        assert!(matches!(
            store.list_backups().await,
            Err(AppError::Storage(_))
        ));
    }

    #[test]
    fn test_backup_timestamp_parsing() {
        assert_eq!(backup_timestamp("backup:1700000000123"), Some(1_700_000_000_123));
        assert_eq!(backup_timestamp("backup:abc"), None);
    }

    #[test]
    fn test_next_backup_key_stays_ahead_of_newest() {
        let newest = "backup:500".to_string();
        assert_eq!(next_backup_key(400, Some(&newest)), "backup:501");
        assert_eq!(next_backup_key(900, Some(&newest)), "backup:900");
        assert_eq!(next_backup_key(42, None), "backup:42");
    }
}
