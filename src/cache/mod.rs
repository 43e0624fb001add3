//! Snapshot cache
//!
//! 保存 GraphQL 数据的快照副本，由 `services::cache_sync` 按 checksum 增量刷新。

pub mod checksum;
pub mod memory;
pub mod null;
pub mod redis;
pub mod traits;

use std::sync::Arc;

use tracing::info;

use crate::config::{CacheBackend, CacheConfig};
use crate::errors::Result;

pub use memory::MemorySnapshotCache;
pub use null::NullSnapshotCache;
pub use self::redis::RedisSnapshotCache;
pub use traits::{CacheCollection, CacheEntry, CacheHealthStatus, CachePatch, SnapshotCache};

/// 按配置创建缓存后端
pub async fn create_snapshot_cache(config: &CacheConfig) -> Result<Arc<dyn SnapshotCache>> {
    let cache: Arc<dyn SnapshotCache> = match config.backend {
        CacheBackend::Redis => Arc::new(RedisSnapshotCache::connect(&config.redis).await?),
        CacheBackend::Memory => Arc::new(MemorySnapshotCache::new(config.memory.max_capacity)),
        CacheBackend::None => Arc::new(NullSnapshotCache),
    };
    info!("Snapshot cache backend: {}", cache.backend_name());
    Ok(cache)
}
