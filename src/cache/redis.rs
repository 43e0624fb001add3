//! Redis snapshot cache
//!
//! 每个集合三个 key：
//! - `{prefix}{collection}:records`   hash，key → 规范化 JSON
//! - `{prefix}{collection}:checksums` hash，key → MD5
//! - `{prefix}{collection}:digest`    string，集合摘要
//!
//! patch 通过 MULTI/EXEC pipeline 一次写入，读者不会看到 digest 与记录不一致的状态。

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::{debug, error};

use super::traits::{CacheCollection, CacheEntry, CacheHealthStatus, CachePatch, SnapshotCache};
use crate::config::RedisConfig;
use crate::errors::{CampError, Result};

pub struct RedisSnapshotCache {
    conn: ConnectionManager,
    key_prefix: String,
    timeout: Duration,
}

impl RedisSnapshotCache {
    /// 建立连接并 PING 一次，失败直接返回错误
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms.max(1));
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            CampError::cache_connection(format!("Invalid Redis URL '{}': {}", config.url, e))
        })?;

        let conn = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| {
                CampError::cache_connection(format!(
                    "Timed out connecting to Redis at {} after {}ms",
                    config.url, config.timeout_ms
                ))
            })??;

        let cache = Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            timeout,
        };
        cache.ping().await?;

        debug!(
            "RedisSnapshotCache connected with prefix: '{}'",
            cache.key_prefix
        );
        Ok(cache)
    }

    fn key(&self, collection: CacheCollection, suffix: &str) -> String {
        format!("{}{}:{}", self.key_prefix, collection.as_ref(), suffix)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pong: String = self
            .with_timeout(redis::cmd("PING").query_async(&mut conn))
            .await?;
        debug!("Redis PING -> {}", pong);
        Ok(())
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(CampError::from),
            Err(_) => Err(CampError::cache_connection(format!(
                "Redis operation timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl SnapshotCache for RedisSnapshotCache {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn digest(&self, collection: CacheCollection) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let key = self.key(collection, "digest");
        self.with_timeout(conn.get(&key)).await
    }

    async fn checksums(&self, collection: CacheCollection) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let key = self.key(collection, "checksums");
        self.with_timeout(conn.hgetall(&key)).await
    }

    async fn records(&self, collection: CacheCollection) -> Result<Vec<CacheEntry>> {
        let mut conn = self.conn.clone();
        let records_key = self.key(collection, "records");
        let checksums_key = self.key(collection, "checksums");

        let (payloads, checksums): (HashMap<String, String>, HashMap<String, String>) = self
            .with_timeout(
                redis::pipe()
                    .hgetall(&records_key)
                    .hgetall(&checksums_key)
                    .query_async(&mut conn),
            )
            .await?;

        let mut entries: Vec<CacheEntry> = payloads
            .into_iter()
            .map(|(key, payload)| {
                let checksum = checksums.get(&key).cloned().unwrap_or_default();
                CacheEntry {
                    key,
                    payload,
                    checksum,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn apply(&self, patch: &CachePatch) -> Result<()> {
        let records_key = self.key(patch.collection, "records");
        let checksums_key = self.key(patch.collection, "checksums");
        let digest_key = self.key(patch.collection, "digest");

        let mut pipe = redis::pipe();
        pipe.atomic();
        if !patch.upserts.is_empty() {
            let payloads: Vec<(&str, &str)> = patch
                .upserts
                .iter()
                .map(|e| (e.key.as_str(), e.payload.as_str()))
                .collect();
            let checksums: Vec<(&str, &str)> = patch
                .upserts
                .iter()
                .map(|e| (e.key.as_str(), e.checksum.as_str()))
                .collect();
            pipe.hset_multiple(&records_key, &payloads).ignore();
            pipe.hset_multiple(&checksums_key, &checksums).ignore();
        }
        if !patch.removals.is_empty() {
            pipe.hdel(&records_key, &patch.removals).ignore();
            pipe.hdel(&checksums_key, &patch.removals).ignore();
        }
        pipe.set(&digest_key, &patch.digest).ignore();

        let mut conn = self.conn.clone();
        self.with_timeout(pipe.query_async::<()>(&mut conn))
            .await
            .inspect_err(|e| {
                error!(
                    "Failed to apply cache patch for {}: {}",
                    patch.collection.as_ref(),
                    e
                )
            })
    }

    async fn clear(&self, collection: CacheCollection) -> Result<()> {
        let keys = [
            self.key(collection, "records"),
            self.key(collection, "checksums"),
            self.key(collection, "digest"),
        ];
        let mut conn = self.conn.clone();
        self.with_timeout(conn.del::<_, ()>(&keys)).await
    }

    async fn health_check(&self) -> CacheHealthStatus {
        let start = Instant::now();
        let result = self.ping().await;
        let latency_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(()) => CacheHealthStatus {
                backend: self.backend_name().to_string(),
                healthy: true,
                latency_ms,
                message: None,
            },
            Err(e) => CacheHealthStatus {
                backend: self.backend_name().to_string(),
                healthy: false,
                latency_ms,
                message: Some(e.message().to_string()),
            },
        }
    }
}
