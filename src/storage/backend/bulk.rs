//! 批量同步写入
//!
//! 一个 SyncPlan 的全部 create / update / delete 在同一事务中完成，
//! 整个事务作为一次操作参与重试。

use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::info;

use super::campers::{delete_camper_in, insert_camper_in, update_camper_in};
use super::volunteers::{delete_volunteer_in, insert_volunteer_in, update_volunteer_in};
use super::{CampStorage, retry};
use crate::errors::{CampError, Result};
use crate::services::SyncPlan;
use crate::storage::{CamperInput, VolunteerInput};

impl CampStorage {
    /// 返回新建记录的 id，顺序与 `plan.creates` 一致
    pub async fn apply_camper_plan(&self, plan: &SyncPlan<CamperInput>) -> Result<Vec<i32>> {
        if !plan.has_writes() {
            return Ok(Vec::new());
        }

        let db = &self.db;
        let created = retry::with_retry("apply_camper_plan", self.retry_config, || async {
            let now = Utc::now();
            let txn = db.begin().await?;

            for id in &plan.deletes {
                delete_camper_in(&txn, *id, now).await?;
            }
            for (id, draft) in &plan.updates {
                update_camper_in(&txn, *id, draft, now).await?;
            }
            let mut created = Vec::with_capacity(plan.creates.len());
            for draft in &plan.creates {
                created.push(insert_camper_in(&txn, draft, now).await?.id);
            }

            txn.commit().await?;
            Ok(created)
        })
        .await
        .map_err(|e| CampError::database_operation(format!("批量同步营员失败: {}", e)))?;

        info!(
            "Camper plan applied: {} created, {} updated, {} deleted",
            created.len(),
            plan.updates.len(),
            plan.deletes.len()
        );
        Ok(created)
    }

    pub async fn apply_volunteer_plan(&self, plan: &SyncPlan<VolunteerInput>) -> Result<Vec<i32>> {
        if !plan.has_writes() {
            return Ok(Vec::new());
        }

        let db = &self.db;
        let created = retry::with_retry("apply_volunteer_plan", self.retry_config, || async {
            let now = Utc::now();
            let txn = db.begin().await?;

            for id in &plan.deletes {
                delete_volunteer_in(&txn, *id).await?;
            }
            for (id, draft) in &plan.updates {
                update_volunteer_in(&txn, *id, draft, now).await?;
            }
            let mut created = Vec::with_capacity(plan.creates.len());
            for draft in &plan.creates {
                created.push(insert_volunteer_in(&txn, draft, now).await?.id);
            }

            txn.commit().await?;
            Ok(created)
        })
        .await
        .map_err(|e| CampError::database_operation(format!("批量同步志愿者失败: {}", e)))?;

        info!(
            "Volunteer plan applied: {} created, {} updated, {} deleted",
            created.len(),
            plan.updates.len(),
            plan.deletes.len()
        );
        Ok(created)
    }
}
