use std::collections::HashMap;

use async_graphql::Enum;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::Result;

/// 缓存对账的单位
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Enum,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CacheCollection {
    Campers,
    CareData,
    Volunteers,
    Assignments,
}

impl CacheCollection {
    pub fn all() -> Vec<CacheCollection> {
        CacheCollection::iter().collect()
    }
}

/// 一条缓存记录：payload 为规范化 JSON，checksum 为其 MD5
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: String,
    pub checksum: String,
}

/// 一次增量写入：写入/覆盖 upserts，删除 removals，最后更新 digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePatch {
    pub collection: CacheCollection,
    pub upserts: Vec<CacheEntry>,
    pub removals: Vec<String>,
    pub digest: String,
}

impl CachePatch {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removals.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheHealthStatus {
    pub backend: String,
    pub healthy: bool,
    pub latency_ms: u64,
    pub message: Option<String>,
}

#[async_trait]
pub trait SnapshotCache: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// 为 false 时不启动同步 worker
    fn is_enabled(&self) -> bool {
        true
    }

    async fn digest(&self, collection: CacheCollection) -> Result<Option<String>>;

    /// key → checksum
    async fn checksums(&self, collection: CacheCollection) -> Result<HashMap<String, String>>;

    /// 按 key 排序
    async fn records(&self, collection: CacheCollection) -> Result<Vec<CacheEntry>>;

    /// 原子地应用一次 patch
    async fn apply(&self, patch: &CachePatch) -> Result<()>;

    async fn clear(&self, collection: CacheCollection) -> Result<()>;

    async fn health_check(&self) -> CacheHealthStatus;
}
