//! Volunteer operations

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::info;

use super::converters::{model_to_volunteer, volunteer_to_active_model};
use super::{CampStorage, retry};
use crate::errors::{CampError, Result};
use crate::storage::{Volunteer, VolunteerInput};

use migration::entities::{volunteer, volunteer_assignment};

pub(super) async fn insert_volunteer_in<C: ConnectionTrait>(
    conn: &C,
    input: &VolunteerInput,
    now: DateTime<Utc>,
) -> std::result::Result<volunteer::Model, DbErr> {
    volunteer_to_active_model(None, input, now).insert(conn).await
}

pub(super) async fn update_volunteer_in<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    input: &VolunteerInput,
    now: DateTime<Utc>,
) -> std::result::Result<Option<volunteer::Model>, DbErr> {
    if volunteer::Entity::find_by_id(id).one(conn).await?.is_none() {
        return Ok(None);
    }
    volunteer_to_active_model(Some(id), input, now)
        .update(conn)
        .await
        .map(Some)
}

/// 删除志愿者及其分配行
pub(super) async fn delete_volunteer_in<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> std::result::Result<bool, DbErr> {
    volunteer_assignment::Entity::delete_by_id(id)
        .exec(conn)
        .await?;
    let result = volunteer::Entity::delete_by_id(id).exec(conn).await?;
    Ok(result.rows_affected > 0)
}

impl CampStorage {
    pub async fn list_volunteers(&self) -> Result<Vec<Volunteer>> {
        let db = &self.db;
        let models = retry::with_retry("list_volunteers", self.retry_config, || async {
            volunteer::Entity::find()
                .order_by_asc(volunteer::Column::Id)
                .all(db)
                .await
        })
        .await
        .map_err(|e| CampError::database_operation(format!("查询志愿者列表失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_volunteer).collect())
    }

    pub async fn list_volunteers_by_ids(&self, ids: &[i32]) -> Result<Vec<Volunteer>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = volunteer::Entity::find()
            .filter(volunteer::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(volunteer::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CampError::database_operation(format!("查询志愿者失败: {}", e)))?;
        Ok(models.into_iter().map(model_to_volunteer).collect())
    }

    pub async fn get_volunteer(&self, id: i32) -> Result<Option<Volunteer>> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("get_volunteer({})", id),
            self.retry_config,
            || async { volunteer::Entity::find_by_id(id).one(db).await },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("查询志愿者失败: {}", e)))?;

        Ok(model.map(model_to_volunteer))
    }

    pub async fn insert_volunteer(&self, input: &VolunteerInput) -> Result<Volunteer> {
        let db = &self.db;
        let model = retry::with_retry("insert_volunteer", self.retry_config, || async {
            insert_volunteer_in(db, input, Utc::now()).await
        })
        .await
        .map_err(|e| CampError::database_operation(format!("创建志愿者失败: {}", e)))?;

        info!("Volunteer created: {}", model.id);
        Ok(model_to_volunteer(model))
    }

    pub async fn update_volunteer(&self, id: i32, input: &VolunteerInput) -> Result<Volunteer> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("update_volunteer({})", id),
            self.retry_config,
            || async { update_volunteer_in(db, id, input, Utc::now()).await },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("更新志愿者失败: {}", e)))?;

        match model {
            Some(model) => Ok(model_to_volunteer(model)),
            None => Err(CampError::not_found(format!("Volunteer {} not found", id))),
        }
    }

    /// 返回记录是否存在
    pub async fn delete_volunteer(&self, id: i32) -> Result<bool> {
        let db = &self.db;
        let deleted = retry::with_retry(
            &format!("delete_volunteer({})", id),
            self.retry_config,
            || async {
                let txn = db.begin().await?;
                let deleted = delete_volunteer_in(&txn, id).await?;
                txn.commit().await?;
                Ok(deleted)
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("删除志愿者失败: {}", e)))?;

        if deleted {
            info!("Volunteer deleted: {}", id);
        }
        Ok(deleted)
    }
}
