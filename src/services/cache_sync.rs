//! Checksum-based cache reconciliation
//!
//! For every collection the service serializes the database rows,
//! compares the collection digest with the one stored in the cache and,
//! when they differ, writes only the entries whose checksum changed and
//! removes keys that no longer exist. A background worker runs this on a
//! timer and whenever a mutation nudges the [`SyncTrigger`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::checksum::{collection_digest, record_checksum};
use crate::cache::{CacheCollection, CacheEntry, CachePatch, SnapshotCache};
use crate::errors::{CampError, Result};
use crate::storage::CampStorage;
use crate::storage::backend::retry::{RetryConfig, with_retry_when};

/// 通知同步 worker 尽快跑一轮；多次通知合并为一次
#[derive(Clone, Default)]
pub struct SyncTrigger(Arc<Notify>);

impl SyncTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify(&self) {
        self.0.notify_one();
    }

    async fn notified(&self) {
        self.0.notified().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, SimpleObject)]
pub struct CollectionSyncReport {
    pub collection: CacheCollection,
    /// 数据库中的记录数
    pub total: usize,
    pub written: usize,
    pub removed: usize,
    /// digest 一致，未做任何写入
    pub skipped: bool,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct CacheSyncStatus {
    pub backend: String,
    pub last_run: DateTime<Utc>,
    pub duration_ms: u64,
    pub collections: Vec<CollectionSyncReport>,
    pub last_error: Option<String>,
}

pub struct CacheSyncService {
    storage: Arc<CampStorage>,
    cache: Arc<dyn SnapshotCache>,
    retry: RetryConfig,
    trigger: SyncTrigger,
    status: RwLock<Option<CacheSyncStatus>>,
    run_lock: Mutex<()>,
}

impl CacheSyncService {
    pub fn new(storage: Arc<CampStorage>, cache: Arc<dyn SnapshotCache>, retry_count: u32) -> Self {
        Self {
            storage,
            cache,
            retry: RetryConfig {
                max_retries: retry_count,
                ..RetryConfig::default()
            },
            trigger: SyncTrigger::new(),
            status: RwLock::new(None),
            run_lock: Mutex::new(()),
        }
    }

    pub fn trigger(&self) -> SyncTrigger {
        self.trigger.clone()
    }

    pub fn cache(&self) -> &Arc<dyn SnapshotCache> {
        &self.cache
    }

    pub fn status(&self) -> Option<CacheSyncStatus> {
        self.status.read().clone()
    }

    /// 从数据库生成集合快照，按 key 排序
    pub async fn snapshot(&self, collection: CacheCollection) -> Result<Vec<CacheEntry>> {
        let mut entries = match collection {
            CacheCollection::Campers => {
                let rows = self.storage.list_campers().await?;
                to_entries(rows.iter().map(|c| (c.id, c)))?
            }
            CacheCollection::CareData => {
                let rows = self.storage.list_care_data().await?;
                to_entries(rows.iter().map(|c| (c.camper_id, c)))?
            }
            CacheCollection::Volunteers => {
                let rows = self.storage.list_volunteers().await?;
                to_entries(rows.iter().map(|v| (v.id, v)))?
            }
            CacheCollection::Assignments => {
                let rows = self.storage.list_assignments().await?;
                to_entries(rows.iter().map(|a| (a.volunteer_id, a)))?
            }
        };
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// 数据库侧的集合摘要
    pub async fn local_digest(&self, collection: CacheCollection) -> Result<String> {
        let entries = self.snapshot(collection).await?;
        Ok(digest_of(&entries))
    }

    /// 对齐单个集合
    pub async fn sync_collection(&self, collection: CacheCollection) -> Result<CollectionSyncReport> {
        let entries = self.snapshot(collection).await?;
        let digest = digest_of(&entries);
        let total = entries.len();

        if self.cache.digest(collection).await?.as_deref() == Some(digest.as_str()) {
            debug!("Cache for {} is up to date", collection.as_ref());
            return Ok(CollectionSyncReport {
                collection,
                total,
                written: 0,
                removed: 0,
                skipped: true,
                digest,
            });
        }

        let cached = self.cache.checksums(collection).await?;
        let patch = build_patch(collection, entries, &cached, digest.clone());
        let written = patch.upserts.len();
        let removed = patch.removals.len();

        let cache = &self.cache;
        let patch_ref = &patch;
        with_retry_when(
            &format!("cache_apply({})", collection.as_ref()),
            self.retry,
            is_retryable_cache_error,
            || async { cache.apply(patch_ref).await },
        )
        .await?;

        info!(
            "Cache {} reconciled: {} written, {} removed, {} total",
            collection.as_ref(),
            written,
            removed,
            total
        );
        Ok(CollectionSyncReport {
            collection,
            total,
            written,
            removed,
            skipped: false,
            digest,
        })
    }

    /// 对齐所有集合；同一时间只有一轮在跑
    pub async fn run_once(&self) -> Result<CacheSyncStatus> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        let last_run = Utc::now();

        let mut collections = Vec::new();
        let mut last_error = None;
        for collection in CacheCollection::all() {
            match self.sync_collection(collection).await {
                Ok(report) => collections.push(report),
                Err(e) => {
                    warn!("Cache sync for {} failed: {}", collection.as_ref(), e);
                    last_error = Some(e);
                    break;
                }
            }
        }

        let status = CacheSyncStatus {
            backend: self.cache.backend_name().to_string(),
            last_run,
            duration_ms: started.elapsed().as_millis() as u64,
            collections,
            last_error: last_error.as_ref().map(|e| e.to_string()),
        };
        *self.status.write() = Some(status.clone());

        match last_error {
            Some(e) => Err(e),
            None => Ok(status),
        }
    }

    /// 丢弃缓存内容后完整重建
    pub async fn rebuild(&self) -> Result<CacheSyncStatus> {
        {
            let _guard = self.run_lock.lock().await;
            for collection in CacheCollection::all() {
                self.cache.clear(collection).await?;
            }
        }
        self.run_once().await
    }

    /// 启动后台 worker：定时、收到 trigger 时各跑一轮，shutdown 置 true 后退出
    pub fn spawn_worker(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "Cache sync worker started (backend: {}, interval: {:?})",
                self.cache.backend_name(),
                interval
            );
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.trigger.notified() => {
                        debug!("Cache sync triggered by a mutation");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                if let Err(e) = self.run_once().await {
                    warn!("Cache sync run failed: {}", e);
                }
            }
            info!("Cache sync worker stopped");
        })
    }
}

fn is_retryable_cache_error(err: &CampError) -> bool {
    matches!(
        err,
        CampError::CacheConnection(_) | CampError::CacheOperation(_)
    )
}

fn to_entries<'a, T, I>(rows: I) -> Result<Vec<CacheEntry>>
where
    T: Serialize + 'a,
    I: Iterator<Item = (i32, &'a T)>,
{
    rows.map(|(id, row)| {
        let (payload, checksum) = record_checksum(row)?;
        Ok(CacheEntry {
            key: id.to_string(),
            payload,
            checksum,
        })
    })
    .collect()
}

pub fn digest_of(entries: &[CacheEntry]) -> String {
    collection_digest(
        entries
            .iter()
            .map(|e| (e.key.as_str(), e.checksum.as_str())),
    )
}

/// 与缓存中的 checksum 比较，得到最小写入集
pub fn build_patch(
    collection: CacheCollection,
    entries: Vec<CacheEntry>,
    cached: &HashMap<String, String>,
    digest: String,
) -> CachePatch {
    let live: BTreeSet<&str> = entries.iter().map(|e| e.key.as_str()).collect();
    let mut removals: Vec<String> = cached
        .keys()
        .filter(|key| !live.contains(key.as_str()))
        .cloned()
        .collect();
    removals.sort();

    let upserts = entries
        .into_iter()
        .filter(|e| cached.get(&e.key) != Some(&e.checksum))
        .collect();

    CachePatch {
        collection,
        upserts,
        removals,
        digest,
    }
}
