use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use async_trait::async_trait;
use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::debug;

use super::traits::{CacheCollection, CacheEntry, CacheHealthStatus, CachePatch, SnapshotCache};
use crate::errors::Result;

/// 单个集合在内存中的快照
#[derive(Debug, Clone, Default)]
struct CollectionSnapshot {
    digest: Option<String>,
    /// key → (payload, checksum)
    records: BTreeMap<String, (String, String)>,
}

/// 进程内快照缓存（moka）
pub struct MemorySnapshotCache {
    inner: Cache<CacheCollection, CollectionSnapshot>,
    /// apply 是读-改-写，串行执行
    write_lock: Mutex<()>,
}

impl MemorySnapshotCache {
    pub fn new(max_capacity: u64) -> Self {
        debug!(
            "MemorySnapshotCache initialized with max capacity: {}",
            max_capacity
        );
        Self {
            inner: Cache::builder().max_capacity(max_capacity).build(),
            write_lock: Mutex::new(()),
        }
    }

    async fn snapshot(&self, collection: CacheCollection) -> CollectionSnapshot {
        self.inner.get(&collection).await.unwrap_or_default()
    }
}

impl Default for MemorySnapshotCache {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl SnapshotCache for MemorySnapshotCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn digest(&self, collection: CacheCollection) -> Result<Option<String>> {
        Ok(self.snapshot(collection).await.digest)
    }

    async fn checksums(&self, collection: CacheCollection) -> Result<HashMap<String, String>> {
        Ok(self
            .snapshot(collection)
            .await
            .records
            .into_iter()
            .map(|(key, (_, checksum))| (key, checksum))
            .collect())
    }

    async fn records(&self, collection: CacheCollection) -> Result<Vec<CacheEntry>> {
        Ok(self
            .snapshot(collection)
            .await
            .records
            .into_iter()
            .map(|(key, (payload, checksum))| CacheEntry {
                key,
                payload,
                checksum,
            })
            .collect())
    }

    async fn apply(&self, patch: &CachePatch) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.snapshot(patch.collection).await;
        for entry in &patch.upserts {
            snapshot.records.insert(
                entry.key.clone(),
                (entry.payload.clone(), entry.checksum.clone()),
            );
        }
        for key in &patch.removals {
            snapshot.records.remove(key);
        }
        snapshot.digest = Some(patch.digest.clone());
        self.inner.insert(patch.collection, snapshot).await;
        Ok(())
    }

    async fn clear(&self, collection: CacheCollection) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.inner.invalidate(&collection).await;
        Ok(())
    }

    async fn health_check(&self) -> CacheHealthStatus {
        let start = Instant::now();
        self.inner.run_pending_tasks().await;
        CacheHealthStatus {
            backend: self.backend_name().to_string(),
            healthy: true,
            latency_ms: start.elapsed().as_millis() as u64,
            message: Some(format!("{} collections cached", self.inner.entry_count())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, checksum: &str) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            payload: format!("{{\"id\":{}}}", key),
            checksum: checksum.to_string(),
        }
    }

    #[tokio::test]
    async fn test_apply_and_read_back() {
        let cache = MemorySnapshotCache::default();
        assert_eq!(cache.digest(CacheCollection::Campers).await.unwrap(), None);

        cache
            .apply(&CachePatch {
                collection: CacheCollection::Campers,
                upserts: vec![entry("1", "a"), entry("2", "b")],
                removals: vec![],
                digest: "d1".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            cache.digest(CacheCollection::Campers).await.unwrap(),
            Some("d1".to_string())
        );
        let sums = cache.checksums(CacheCollection::Campers).await.unwrap();
        assert_eq!(sums.get("2").map(String::as_str), Some("b"));

        cache
            .apply(&CachePatch {
                collection: CacheCollection::Campers,
                upserts: vec![entry("2", "c")],
                removals: vec!["1".to_string()],
                digest: "d2".to_string(),
            })
            .await
            .unwrap();

        let records = cache.records(CacheCollection::Campers).await.unwrap();
        assert_eq!(records, vec![entry("2", "c")]);
        assert!(cache.records(CacheCollection::Volunteers).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemorySnapshotCache::default();
        cache
            .apply(&CachePatch {
                collection: CacheCollection::Assignments,
                upserts: vec![entry("4", "x")],
                removals: vec![],
                digest: "d".to_string(),
            })
            .await
            .unwrap();
        cache.clear(CacheCollection::Assignments).await.unwrap();
        assert_eq!(cache.digest(CacheCollection::Assignments).await.unwrap(), None);
        assert!(cache.health_check().await.healthy);
    }
}
