use std::sync::Arc;

use async_graphql::{ComplexObject, Context, SimpleObject};

use super::GqlResultExt;
use crate::cache::{CacheEntry, CacheHealthStatus};
use crate::services::{CacheSyncStatus, CampService};
use crate::storage::{Camper, CareData, Volunteer};

/// 数据库侧单条记录的 checksum
#[derive(Debug, Clone, SimpleObject)]
pub struct RecordChecksum {
    pub key: String,
    pub checksum: String,
}

impl From<CacheEntry> for RecordChecksum {
    fn from(entry: CacheEntry) -> Self {
        Self {
            key: entry.key,
            checksum: entry.checksum,
        }
    }
}

/// 缓存中的一条记录，payload 为规范化 JSON 文本
#[derive(Debug, Clone, SimpleObject)]
pub struct CachedRecord {
    pub key: String,
    pub checksum: String,
    pub payload: String,
}

impl From<CacheEntry> for CachedRecord {
    fn from(entry: CacheEntry) -> Self {
        Self {
            key: entry.key,
            checksum: entry.checksum,
            payload: entry.payload,
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
pub struct CacheStatus {
    pub backend: String,
    pub enabled: bool,
    pub healthy: bool,
    pub latency_ms: u64,
    pub message: Option<String>,
    /// 最近一次同步；尚未跑过时为空
    pub last_sync: Option<CacheSyncStatus>,
}

impl CacheStatus {
    pub fn new(health: CacheHealthStatus, enabled: bool, last_sync: Option<CacheSyncStatus>) -> Self {
        Self {
            backend: health.backend,
            enabled,
            healthy: health.healthy,
            latency_ms: health.latency_ms,
            message: health.message,
            last_sync,
        }
    }
}

#[ComplexObject]
impl Camper {
    async fn care(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<CareData>> {
        let service = ctx.data::<Arc<CampService>>()?;
        service.get_care_data(self.id).await.gql()
    }

    async fn volunteers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Volunteer>> {
        let service = ctx.data::<Arc<CampService>>()?;
        service.volunteers_for_camper(self.id).await.gql()
    }
}

#[ComplexObject]
impl Volunteer {
    async fn campers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Camper>> {
        let service = ctx.data::<Arc<CampService>>()?;
        service.campers_for_volunteer(self.id).await.gql()
    }
}
