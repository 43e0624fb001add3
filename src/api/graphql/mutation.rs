use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions, Object};
use tracing::info;

use super::GqlResultExt;
use crate::errors::CampError;
use crate::services::{CacheSyncService, CacheSyncStatus, CampService, SyncReport};
use crate::storage::{
    Assignment, Camper, CamperInput, CareData, CareDataInput, Volunteer, VolunteerInput,
};

pub struct MutationRoot;

fn camp<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<CampService>> {
    ctx.data::<Arc<CampService>>()
}

#[Object]
impl MutationRoot {
    /// 新建营员；input.care 不为空时在同一事务内写入医疗档案
    async fn create_camper(
        &self,
        ctx: &Context<'_>,
        input: CamperInput,
    ) -> async_graphql::Result<Camper> {
        camp(ctx)?.create_camper(input).await.gql()
    }

    async fn update_camper(
        &self,
        ctx: &Context<'_>,
        id: i32,
        input: CamperInput,
    ) -> async_graphql::Result<Camper> {
        camp(ctx)?.update_camper(id, input).await.gql()
    }

    /// 同时删除医疗档案，并从所有分配中移除
    async fn delete_camper(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<bool> {
        camp(ctx)?.delete_camper(id).await.gql()?;
        Ok(true)
    }

    async fn upsert_care_data(
        &self,
        ctx: &Context<'_>,
        camper_id: i32,
        input: CareDataInput,
    ) -> async_graphql::Result<CareData> {
        camp(ctx)?.upsert_care_data(camper_id, input).await.gql()
    }

    async fn create_volunteer(
        &self,
        ctx: &Context<'_>,
        input: VolunteerInput,
    ) -> async_graphql::Result<Volunteer> {
        camp(ctx)?.create_volunteer(input).await.gql()
    }

    async fn update_volunteer(
        &self,
        ctx: &Context<'_>,
        id: i32,
        input: VolunteerInput,
    ) -> async_graphql::Result<Volunteer> {
        camp(ctx)?.update_volunteer(id, input).await.gql()
    }

    async fn delete_volunteer(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<bool> {
        camp(ctx)?.delete_volunteer(id).await.gql()?;
        Ok(true)
    }

    /// 以传入列表为准对齐营员；prune 为 true 时删除列表外的营员
    async fn update_all_campers(
        &self,
        ctx: &Context<'_>,
        campers: Vec<CamperInput>,
        #[graphql(default = false)] prune: bool,
    ) -> async_graphql::Result<SyncReport> {
        camp(ctx)?.update_all_campers(campers, prune).await.gql()
    }

    async fn update_all_volunteers(
        &self,
        ctx: &Context<'_>,
        volunteers: Vec<VolunteerInput>,
        #[graphql(default = false)] prune: bool,
    ) -> async_graphql::Result<SyncReport> {
        camp(ctx)?
            .update_all_volunteers(volunteers, prune)
            .await
            .gql()
    }

    async fn add_volunteer_assignment(
        &self,
        ctx: &Context<'_>,
        volunteer_id: i32,
        camper_ids: Vec<i32>,
    ) -> async_graphql::Result<Assignment> {
        camp(ctx)?
            .add_volunteer_assignment(volunteer_id, camper_ids)
            .await
            .gql()
    }

    async fn remove_assignment(
        &self,
        ctx: &Context<'_>,
        volunteer_id: i32,
        camper_id: i32,
    ) -> async_graphql::Result<Assignment> {
        camp(ctx)?
            .remove_assignment(volunteer_id, camper_id)
            .await
            .gql()
    }

    /// 立即跑一轮缓存对齐
    async fn refresh_cache(&self, ctx: &Context<'_>) -> async_graphql::Result<CacheSyncStatus> {
        let sync = ctx.data::<Arc<CacheSyncService>>()?;
        if !sync.cache().is_enabled() {
            return Err(CampError::cache_backend_not_found("Snapshot cache is disabled").extend());
        }
        info!("Cache refresh requested over GraphQL");
        sync.run_once().await.gql()
    }
}
