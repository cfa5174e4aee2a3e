use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::KeyValueStore;

const TEMP_EXTENSION: &str = "tmp";

/// One file per key in a single directory.
///
/// File names are random UUIDs; each file holds its own key alongside the value, so a
/// non-volatile store can rebuild its index from the directory on startup.
///
/// Before using the non-volatile flavor, strongly consider the volatile one. Do you really need
/// the cache to survive a restart without hitting the source of record? You give up "reboot to
/// clear corruption" and take on N vs N+1 payload compatibility when upgrading.
#[derive(Debug)]
pub struct DiscreteFileStore {
    cache_directory: PathBuf,
    index: RwLock<HashMap<String, PathBuf>>,
}

#[derive(Serialize, Deserialize)]
struct Record {
    key: String,
    value: Vec<u8>,
}

impl DiscreteFileStore {
    /// Opens `cache_directory`, indexing any records already in it.
    pub async fn open_non_volatile(cache_directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let cache_directory = cache_directory.into();
        fs::create_dir_all(&cache_directory).await?;

        let index = rehydrate_index(&cache_directory).await?;
        tracing::debug!(
            directory = %cache_directory.display(),
            entries = index.len(),
            "Rehydrated discrete file store"
        );

        Ok(Self {
            cache_directory,
            index: RwLock::new(index),
        })
    }

    /// Opens `cache_directory` after wiping whatever it held.
    pub async fn open_volatile(cache_directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let cache_directory = cache_directory.into();
        match fs::remove_dir_all(&cache_directory).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(&cache_directory).await?;

        Ok(Self {
            cache_directory,
            index: RwLock::new(HashMap::new()),
        })
    }

    pub fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    async fn get_or_create_index_entry(&self, key: &str) -> PathBuf {
        let mut index = self.index.write().await;
        index
            .entry(key.to_string())
            .or_insert_with(|| {
                self.cache_directory
                    .join(Uuid::new_v4().hyphenated().to_string())
            })
            .clone()
    }
}

#[async_trait]
impl KeyValueStore for DiscreteFileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = match self.index.read().await.get(key) {
            Some(path) => path.clone(),
            None => return Ok(None),
        };

        match read_record(&path).await? {
            Some(record) if record.key == key => Ok(Some(record.value)),
            Some(_) => Err(StoreError::Corrupt(format!(
                "{} holds a record for another key",
                path.display()
            ))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let path = self.get_or_create_index_entry(key).await;
        let record = Record {
            key: key.to_string(),
            value,
        };
        let bytes = bincode::serialize(&record)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Write then rename so readers never observe a partial record. Each write gets its own
        // temp file so concurrent sets of one key cannot interleave.
        let temp_path = temp_path_for(&path);
        if let Err(e) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        // A delete that ran while this write was in flight has already dropped `path` from the
        // index. The file just renamed into place must go too, or a reopen would resurrect it.
        // Paths are never reused across index entries, so removing it cannot hit a newer write.
        let still_indexed = self.index.read().await.get(key) == Some(&path);
        if !still_indexed {
            tracing::debug!(key, path = %path.display(), "Key deleted during write, discarding record");
            remove_if_present(&path).await?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let removed = self.index.write().await.remove(key);
        if let Some(path) = removed {
            remove_if_present(&path).await?;
        }

        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().unwrap_or_default().to_os_string();
    file_name.push(format!(".{}.{}", Uuid::new_v4().simple(), TEMP_EXTENSION));
    path.with_file_name(file_name)
}

async fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn read_record(path: &Path) -> Result<Option<Record>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    bincode::deserialize(&bytes)
        .map(Some)
        .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))
}

/// Rebuilds the key index from the records on disk.
///
/// Leftover temp files are removed. When several files claim one key, the most recently
/// modified wins (ties go to the greater file name) and the others are removed.
async fn rehydrate_index(cache_directory: &Path) -> Result<HashMap<String, PathBuf>, StoreError> {
    let mut candidates: HashMap<String, (Option<SystemTime>, PathBuf)> = HashMap::new();
    let mut entries = fs::read_dir(cache_directory).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == TEMP_EXTENSION) {
            let _ = fs::remove_file(&path).await;
            continue;
        }

        let record = match read_record(&path).await {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable cache file");
                continue;
            }
        };

        let modified = entry.metadata().await.and_then(|meta| meta.modified()).ok();
        let candidate = (modified, path);
        let loser = match candidates.remove(&record.key) {
            Some(existing) if existing >= candidate => {
                candidates.insert(record.key, existing);
                candidate.1
            }
            Some(existing) => {
                candidates.insert(record.key, candidate);
                existing.1
            }
            None => {
                candidates.insert(record.key, candidate);
                continue;
            }
        };

        tracing::warn!(path = %loser.display(), "Removing superseded cache file for duplicate key");
        remove_if_present(&loser).await?;
    }

    Ok(candidates
        .into_iter()
        .map(|(key, (_, path))| (key, path))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn files_on_disk(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn set_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = DiscreteFileStore::open_volatile(dir.path().join("cache"))
            .await
            .unwrap();

        assert_eq!(store.get("k").await.unwrap(), None);

        store.set("k", b"one".to_vec()).await.unwrap();
        store.set("k", b"two".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len().await, 1);

        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn non_volatile_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache");

        {
            let store = DiscreteFileStore::open_non_volatile(&path).await.unwrap();
            store.set("a", vec![1, 2, 3]).await.unwrap();
            store.set("b", vec![4]).await.unwrap();
            store.delete("b").await.unwrap();
        }

        let reopened = DiscreteFileStore::open_non_volatile(&path).await.unwrap();
        assert_eq!(reopened.get("a").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(reopened.get("b").await.unwrap(), None);
        assert_eq!(reopened.len().await, 1);
    }

    #[tokio::test]
    async fn volatile_store_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache");

        {
            let store = DiscreteFileStore::open_non_volatile(&path).await.unwrap();
            store.set("a", vec![1]).await.unwrap();
        }

        let store = DiscreteFileStore::open_volatile(&path).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert!(store.is_empty().await);
        assert_eq!(std::fs::read_dir(store.cache_directory()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn rehydration_skips_garbage_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("not-a-record"), b"\xff").unwrap();

        let store = DiscreteFileStore::open_non_volatile(dir.path()).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn corrupted_record_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        let store = DiscreteFileStore::open_volatile(dir.path()).await.unwrap();
        store.set("k", vec![1]).await.unwrap();

        let file = std::fs::read_dir(dir.path())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
            .path();
        std::fs::write(file, b"\xff").unwrap();

        assert!(matches!(store.get("k").await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn delete_racing_sets_leaves_nothing_to_resurrect() {
        for _ in 0..100 {
            let dir = TempDir::new().unwrap();
            let store = Arc::new(DiscreteFileStore::open_non_volatile(dir.path()).await.unwrap());

            let large = tokio::spawn({
                let store = store.clone();
                async move { store.set("k", vec![7; 4096]).await }
            });
            let small = tokio::spawn({
                let store = store.clone();
                async move { store.set("k", vec![1; 10]).await }
            });
            let delete = tokio::spawn({
                let store = store.clone();
                async move { store.delete("k").await }
            });

            large.await.unwrap().unwrap();
            small.await.unwrap().unwrap();
            delete.await.unwrap().unwrap();

            let live = store.get("k").await.unwrap();
            assert_eq!(files_on_disk(dir.path()), usize::from(live.is_some()));

            let reopened = DiscreteFileStore::open_non_volatile(dir.path()).await.unwrap();
            assert_eq!(reopened.get("k").await.unwrap(), live);
        }
    }

    #[tokio::test]
    async fn rehydration_keeps_one_file_per_key() {
        let dir = TempDir::new().unwrap();
        for (name, value) in [("a", vec![1]), ("b", vec![2])] {
            let record = Record {
                key: "k".to_string(),
                value,
            };
            std::fs::write(dir.path().join(name), bincode::serialize(&record).unwrap()).unwrap();
        }

        let store = DiscreteFileStore::open_non_volatile(dir.path()).await.unwrap();
        let first = store.get("k").await.unwrap();
        assert!(first.is_some());
        assert_eq!(store.len().await, 1);
        assert_eq!(files_on_disk(dir.path()), 1);

        let reopened = DiscreteFileStore::open_non_volatile(dir.path()).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap(), first);
    }
}
