use std::sync::Arc;

use async_graphql::{Context, Object};

use super::GqlResultExt;
use super::types::{CacheStatus, CachedRecord, RecordChecksum};
use crate::cache::CacheCollection;
use crate::services::{CacheSyncService, CampService};
use crate::storage::{Assignment, Camper, CareData, Volunteer};

pub struct QueryRoot;

fn camp<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<CampService>> {
    ctx.data::<Arc<CampService>>()
}

fn cache_sync<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<CacheSyncService>> {
    ctx.data::<Arc<CacheSyncService>>()
}

#[Object]
impl QueryRoot {
    async fn campers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Camper>> {
        camp(ctx)?.list_campers().await.gql()
    }

    async fn camper(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<Option<Camper>> {
        camp(ctx)?.find_camper(id).await.gql()
    }

    async fn care_data(
        &self,
        ctx: &Context<'_>,
        camper_id: i32,
    ) -> async_graphql::Result<Option<CareData>> {
        camp(ctx)?.get_care_data(camper_id).await.gql()
    }

    async fn volunteers(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Volunteer>> {
        camp(ctx)?.list_volunteers().await.gql()
    }

    async fn volunteer(
        &self,
        ctx: &Context<'_>,
        id: i32,
    ) -> async_graphql::Result<Option<Volunteer>> {
        camp(ctx)?.find_volunteer(id).await.gql()
    }

    async fn assignments(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Assignment>> {
        camp(ctx)?.list_assignments().await.gql()
    }

    /// 志愿者不存在时报 NotFound；没有分配时返回空列表
    async fn assignment(
        &self,
        ctx: &Context<'_>,
        volunteer_id: i32,
    ) -> async_graphql::Result<Assignment> {
        camp(ctx)?.assignment_for(volunteer_id).await.gql()
    }

    async fn volunteers_for_camper(
        &self,
        ctx: &Context<'_>,
        camper_id: i32,
    ) -> async_graphql::Result<Vec<Volunteer>> {
        camp(ctx)?.volunteers_for_camper(camper_id).await.gql()
    }

    /// 从数据库现算的每条记录 MD5
    async fn checksums(
        &self,
        ctx: &Context<'_>,
        collection: CacheCollection,
    ) -> async_graphql::Result<Vec<RecordChecksum>> {
        let entries = cache_sync(ctx)?.snapshot(collection).await.gql()?;
        Ok(entries.into_iter().map(RecordChecksum::from).collect())
    }

    async fn collection_digest(
        &self,
        ctx: &Context<'_>,
        collection: CacheCollection,
    ) -> async_graphql::Result<String> {
        cache_sync(ctx)?.local_digest(collection).await.gql()
    }

    async fn cache_status(&self, ctx: &Context<'_>) -> async_graphql::Result<CacheStatus> {
        let sync = cache_sync(ctx)?;
        let cache = sync.cache();
        let health = cache.health_check().await;
        Ok(CacheStatus::new(health, cache.is_enabled(), sync.status()))
    }

    async fn cached_records(
        &self,
        ctx: &Context<'_>,
        collection: CacheCollection,
    ) -> async_graphql::Result<Vec<CachedRecord>> {
        let entries = cache_sync(ctx)?.cache().records(collection).await.gql()?;
        Ok(entries.into_iter().map(CachedRecord::from).collect())
    }
}
