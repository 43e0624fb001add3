//! Camper and care-data operations

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait, sea_query::OnConflict,
};
use tracing::info;

use super::converters::{
    camper_to_active_model, care_data_to_active_model, model_to_camper, model_to_care_data,
};
use super::{CampStorage, assignments, retry};
use crate::errors::{CampError, Result};
use crate::storage::{Camper, CamperInput, CamperWithCare, CareData, CareDataInput};

use migration::entities::{camper, care_data};

pub(super) async fn insert_camper_in<C: ConnectionTrait>(
    conn: &C,
    input: &CamperInput,
    now: DateTime<Utc>,
) -> std::result::Result<camper::Model, DbErr> {
    let model = camper_to_active_model(None, input, now).insert(conn).await?;
    if let Some(ref care) = input.care {
        upsert_care_in(conn, model.id, care, now).await?;
    }
    Ok(model)
}

/// 记录不存在时返回 Ok(None)
pub(super) async fn update_camper_in<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    input: &CamperInput,
    now: DateTime<Utc>,
) -> std::result::Result<Option<camper::Model>, DbErr> {
    if camper::Entity::find_by_id(id).one(conn).await?.is_none() {
        return Ok(None);
    }
    let model = camper_to_active_model(Some(id), input, now)
        .update(conn)
        .await?;
    if let Some(ref care) = input.care {
        upsert_care_in(conn, id, care, now).await?;
    }
    Ok(Some(model))
}

/// 删除营员：医疗档案、分配列表中的引用一并清理
pub(super) async fn delete_camper_in<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    now: DateTime<Utc>,
) -> std::result::Result<bool, DbErr> {
    care_data::Entity::delete_by_id(id).exec(conn).await?;
    assignments::strip_camper_in(conn, id, now).await?;
    let result = camper::Entity::delete_by_id(id).exec(conn).await?;
    Ok(result.rows_affected > 0)
}

pub(super) async fn upsert_care_in<C: ConnectionTrait>(
    conn: &C,
    camper_id: i32,
    input: &CareDataInput,
    now: DateTime<Utc>,
) -> std::result::Result<(), DbErr> {
    care_data::Entity::insert(care_data_to_active_model(camper_id, input, now))
        .on_conflict(
            OnConflict::column(care_data::Column::CamperId)
                .update_columns([
                    care_data::Column::InsulinType,
                    care_data::Column::DeliveryMethod,
                    care_data::Column::TargetBgLow,
                    care_data::Column::TargetBgHigh,
                    care_data::Column::CarbRatio,
                    care_data::Column::CorrectionFactor,
                    care_data::Column::LongActingUnits,
                    care_data::Column::Allergies,
                    care_data::Column::Medications,
                    care_data::Column::Notes,
                    care_data::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

impl CampStorage {
    pub async fn list_campers(&self) -> Result<Vec<Camper>> {
        let db = &self.db;
        let models = retry::with_retry("list_campers", self.retry_config, || async {
            camper::Entity::find()
                .order_by_asc(camper::Column::Id)
                .all(db)
                .await
        })
        .await
        .map_err(|e| CampError::database_operation(format!("查询营员列表失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_camper).collect())
    }

    pub async fn list_campers_by_ids(&self, ids: &[i32]) -> Result<Vec<Camper>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = camper::Entity::find()
            .filter(camper::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(camper::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| CampError::database_operation(format!("查询营员失败: {}", e)))?;
        Ok(models.into_iter().map(model_to_camper).collect())
    }

    pub async fn get_camper(&self, id: i32) -> Result<Option<Camper>> {
        let db = &self.db;
        let model = retry::with_retry(&format!("get_camper({})", id), self.retry_config, || async {
            camper::Entity::find_by_id(id).one(db).await
        })
        .await
        .map_err(|e| CampError::database_operation(format!("查询营员失败: {}", e)))?;

        Ok(model.map(model_to_camper))
    }

    /// 营员 + 医疗档案，按 id 升序
    pub async fn list_campers_with_care(&self) -> Result<Vec<CamperWithCare>> {
        let campers = self.list_campers().await?;
        let mut care: HashMap<i32, CareData> = self
            .list_care_data()
            .await?
            .into_iter()
            .map(|c| (c.camper_id, c))
            .collect();

        Ok(campers
            .into_iter()
            .map(|camper| {
                let care = care.remove(&camper.id);
                CamperWithCare { camper, care }
            })
            .collect())
    }

    pub async fn get_camper_with_care(&self, id: i32) -> Result<Option<CamperWithCare>> {
        let Some(camper) = self.get_camper(id).await? else {
            return Ok(None);
        };
        let care = self.get_care_data(id).await?;
        Ok(Some(CamperWithCare { camper, care }))
    }

    pub async fn insert_camper(&self, input: &CamperInput) -> Result<Camper> {
        let db = &self.db;
        let model = retry::with_retry("insert_camper", self.retry_config, || async {
            let txn = db.begin().await?;
            let model = insert_camper_in(&txn, input, Utc::now()).await?;
            txn.commit().await?;
            Ok(model)
        })
        .await
        .map_err(|e| CampError::database_operation(format!("创建营员失败: {}", e)))?;

        info!("Camper created: {}", model.id);
        Ok(model_to_camper(model))
    }

    pub async fn update_camper(&self, id: i32, input: &CamperInput) -> Result<Camper> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("update_camper({})", id),
            self.retry_config,
            || async {
                let txn = db.begin().await?;
                let model = update_camper_in(&txn, id, input, Utc::now()).await?;
                txn.commit().await?;
                Ok(model)
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("更新营员失败: {}", e)))?;

        match model {
            Some(model) => Ok(model_to_camper(model)),
            None => Err(CampError::not_found(format!("Camper {} not found", id))),
        }
    }

    /// 返回记录是否存在
    pub async fn delete_camper(&self, id: i32) -> Result<bool> {
        let db = &self.db;
        let deleted = retry::with_retry(
            &format!("delete_camper({})", id),
            self.retry_config,
            || async {
                let txn = db.begin().await?;
                let deleted = delete_camper_in(&txn, id, Utc::now()).await?;
                txn.commit().await?;
                Ok(deleted)
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("删除营员失败: {}", e)))?;

        if deleted {
            info!("Camper deleted: {}", id);
        }
        Ok(deleted)
    }

    pub async fn list_care_data(&self) -> Result<Vec<CareData>> {
        let models = care_data::Entity::find()
            .order_by_asc(care_data::Column::CamperId)
            .all(&self.db)
            .await
            .map_err(|e| CampError::database_operation(format!("查询医疗档案失败: {}", e)))?;
        Ok(models.into_iter().map(model_to_care_data).collect())
    }

    pub async fn get_care_data(&self, camper_id: i32) -> Result<Option<CareData>> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("get_care_data({})", camper_id),
            self.retry_config,
            || async { care_data::Entity::find_by_id(camper_id).one(db).await },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("查询医疗档案失败: {}", e)))?;
        Ok(model.map(model_to_care_data))
    }

    /// 营员不存在时返回 NotFound
    pub async fn upsert_care_data(&self, camper_id: i32, input: &CareDataInput) -> Result<CareData> {
        let db = &self.db;
        let found = retry::with_retry(
            &format!("upsert_care_data({})", camper_id),
            self.retry_config,
            || async {
                let txn = db.begin().await?;
                if camper::Entity::find_by_id(camper_id).one(&txn).await?.is_none() {
                    return Ok(false);
                }
                upsert_care_in(&txn, camper_id, input, Utc::now()).await?;
                txn.commit().await?;
                Ok(true)
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("保存医疗档案失败: {}", e)))?;

        if !found {
            return Err(CampError::not_found(format!("Camper {} not found", camper_id)));
        }

        self.get_care_data(camper_id)
            .await?
            .ok_or_else(|| CampError::database_operation("医疗档案写入后读取失败"))
    }
}
