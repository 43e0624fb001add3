use std::collections::HashMap;

use async_trait::async_trait;

use super::traits::{CacheCollection, CacheEntry, CacheHealthStatus, CachePatch, SnapshotCache};
use crate::errors::Result;

/// 关闭缓存时使用：读为空，写为空操作
#[derive(Debug, Default)]
pub struct NullSnapshotCache;

#[async_trait]
impl SnapshotCache for NullSnapshotCache {
    fn backend_name(&self) -> &'static str {
        "none"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn digest(&self, _collection: CacheCollection) -> Result<Option<String>> {
        Ok(None)
    }

    async fn checksums(&self, _collection: CacheCollection) -> Result<HashMap<String, String>> {
        Ok(HashMap::new())
    }

    async fn records(&self, _collection: CacheCollection) -> Result<Vec<CacheEntry>> {
        Ok(Vec::new())
    }

    async fn apply(&self, _patch: &CachePatch) -> Result<()> {
        Ok(())
    }

    async fn clear(&self, _collection: CacheCollection) -> Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> CacheHealthStatus {
        CacheHealthStatus {
            backend: self.backend_name().to_string(),
            healthy: true,
            latency_ms: 0,
            message: Some("cache disabled".to_string()),
        }
    }
}
