//! Volunteer assignment operations
//!
//! 每名志愿者一行，camper_ids 为逗号拼接列表。空列表不落库。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
    sea_query::OnConflict,
};
use tracing::{debug, info};

use super::converters::{assignment_to_active_model, model_to_assignment};
use super::{CampStorage, retry};
use crate::errors::{CampError, Result};
use crate::storage::Assignment;
use crate::storage::id_list::{join_id_list, merge_ids, parse_id_list, remove_id};

use migration::entities::{camper, volunteer, volunteer_assignment};

/// 单事务分配变更的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentUpdate {
    VolunteerMissing,
    /// 不存在的营员 id（升序）
    CampersMissing(Vec<i32>),
    Applied { assignment: Assignment, changed: bool },
}

async fn load_assignment_in<C: ConnectionTrait>(
    conn: &C,
    volunteer_id: i32,
) -> std::result::Result<Assignment, DbErr> {
    let Some(row) = volunteer_assignment::Entity::find_by_id(volunteer_id)
        .one(conn)
        .await?
    else {
        return Ok(Assignment::empty(volunteer_id));
    };
    let camper_ids = parse_id_list(&row.camper_ids).map_err(|e| {
        DbErr::Custom(format!(
            "Volunteer {} has a corrupt assignment list: {}",
            volunteer_id, e
        ))
    })?;
    Ok(Assignment {
        volunteer_id,
        camper_ids,
    })
}

async fn volunteer_exists_in<C: ConnectionTrait>(
    conn: &C,
    volunteer_id: i32,
) -> std::result::Result<bool, DbErr> {
    Ok(volunteer::Entity::find_by_id(volunteer_id)
        .one(conn)
        .await?
        .is_some())
}

/// 写入分配；列表为空时删除该行
pub(super) async fn save_assignment_in<C: ConnectionTrait>(
    conn: &C,
    assignment: &Assignment,
    now: DateTime<Utc>,
) -> std::result::Result<(), DbErr> {
    if assignment.camper_ids.is_empty() {
        volunteer_assignment::Entity::delete_by_id(assignment.volunteer_id)
            .exec(conn)
            .await?;
        return Ok(());
    }

    volunteer_assignment::Entity::insert(assignment_to_active_model(assignment, now))
        .on_conflict(
            OnConflict::column(volunteer_assignment::Column::VolunteerId)
                .update_columns([
                    volunteer_assignment::Column::CamperIds,
                    volunteer_assignment::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// 从所有分配列表中移除某个营员
pub(super) async fn strip_camper_in<C: ConnectionTrait>(
    conn: &C,
    camper_id: i32,
    now: DateTime<Utc>,
) -> std::result::Result<usize, DbErr> {
    let rows = volunteer_assignment::Entity::find().all(conn).await?;
    let mut touched = 0;
    for row in rows {
        let ids = parse_id_list(&row.camper_ids).map_err(|e| {
            DbErr::Custom(format!(
                "Volunteer {} has a corrupt assignment list: {}",
                row.volunteer_id, e
            ))
        })?;
        let (remaining, removed) = remove_id(&ids, camper_id);
        if !removed {
            continue;
        }
        let assignment = Assignment {
            volunteer_id: row.volunteer_id,
            camper_ids: remaining,
        };
        save_assignment_in(conn, &assignment, now).await?;
        touched += 1;
    }
    if touched > 0 {
        debug!(
            "Removed camper {} from {} assignment lists",
            camper_id, touched
        );
    }
    Ok(touched)
}

impl CampStorage {
    pub async fn list_assignments(&self) -> Result<Vec<Assignment>> {
        let db = &self.db;
        let models = retry::with_retry("list_assignments", self.retry_config, || async {
            volunteer_assignment::Entity::find()
                .order_by_asc(volunteer_assignment::Column::VolunteerId)
                .all(db)
                .await
        })
        .await
        .map_err(|e| CampError::database_operation(format!("查询分配列表失败: {}", e)))?;

        models.into_iter().map(model_to_assignment).collect()
    }

    /// 没有分配行时返回空列表
    pub async fn get_assignment(&self, volunteer_id: i32) -> Result<Assignment> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("get_assignment({})", volunteer_id),
            self.retry_config,
            || async {
                volunteer_assignment::Entity::find_by_id(volunteer_id)
                    .one(db)
                    .await
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("查询分配失败: {}", e)))?;

        match model {
            Some(model) => model_to_assignment(model),
            None => Ok(Assignment::empty(volunteer_id)),
        }
    }

    /// 负责某营员的所有志愿者 id
    pub async fn volunteer_ids_for_camper(&self, camper_id: i32) -> Result<Vec<i32>> {
        Ok(self
            .list_assignments()
            .await?
            .into_iter()
            .filter(|a| a.contains(camper_id))
            .map(|a| a.volunteer_id)
            .collect())
    }

    pub async fn save_assignment(&self, assignment: &Assignment) -> Result<()> {
        let db = &self.db;
        retry::with_retry(
            &format!("save_assignment({})", assignment.volunteer_id),
            self.retry_config,
            || async {
                let txn = db.begin().await?;
                save_assignment_in(&txn, assignment, Utc::now()).await?;
                txn.commit().await
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("保存分配失败: {}", e)))?;

        info!(
            "Assignment saved: volunteer {} -> [{}]",
            assignment.volunteer_id,
            join_id_list(&assignment.camper_ids)
        );
        Ok(())
    }

    /// 在同一事务中校验志愿者和营员存在、读取并合并分配列表
    pub async fn add_to_assignment(
        &self,
        volunteer_id: i32,
        camper_ids: &[i32],
    ) -> Result<AssignmentUpdate> {
        let db = &self.db;
        let outcome = retry::with_retry(
            &format!("add_to_assignment({})", volunteer_id),
            self.retry_config,
            || async {
                let txn = db.begin().await?;
                if !volunteer_exists_in(&txn, volunteer_id).await? {
                    txn.rollback().await?;
                    return Ok(AssignmentUpdate::VolunteerMissing);
                }

                let found: BTreeSet<i32> = camper::Entity::find()
                    .filter(camper::Column::Id.is_in(camper_ids.iter().copied()))
                    .all(&txn)
                    .await?
                    .into_iter()
                    .map(|m| m.id)
                    .collect();
                let unknown: BTreeSet<i32> = camper_ids
                    .iter()
                    .copied()
                    .filter(|id| !found.contains(id))
                    .collect();
                if !unknown.is_empty() {
                    txn.rollback().await?;
                    return Ok(AssignmentUpdate::CampersMissing(
                        unknown.into_iter().collect(),
                    ));
                }

                let current = load_assignment_in(&txn, volunteer_id).await?;
                let merged = Assignment {
                    volunteer_id,
                    camper_ids: merge_ids(&current.camper_ids, camper_ids),
                };
                let changed = merged != current;
                if changed {
                    save_assignment_in(&txn, &merged, Utc::now()).await?;
                }
                txn.commit().await?;
                Ok(AssignmentUpdate::Applied {
                    assignment: merged,
                    changed,
                })
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("更新分配失败: {}", e)))?;

        if let AssignmentUpdate::Applied {
            ref assignment,
            changed: true,
        } = outcome
        {
            info!(
                "Assignment saved: volunteer {} -> [{}]",
                volunteer_id,
                join_id_list(&assignment.camper_ids)
            );
        }
        Ok(outcome)
    }

    /// 在同一事务中从分配列表移除营员；不在列表中时不写库
    pub async fn remove_from_assignment(
        &self,
        volunteer_id: i32,
        camper_id: i32,
    ) -> Result<AssignmentUpdate> {
        let db = &self.db;
        let outcome = retry::with_retry(
            &format!("remove_from_assignment({})", volunteer_id),
            self.retry_config,
            || async {
                let txn = db.begin().await?;
                if !volunteer_exists_in(&txn, volunteer_id).await? {
                    txn.rollback().await?;
                    return Ok(AssignmentUpdate::VolunteerMissing);
                }

                let current = load_assignment_in(&txn, volunteer_id).await?;
                let (remaining, removed) = remove_id(&current.camper_ids, camper_id);
                if !removed {
                    txn.rollback().await?;
                    return Ok(AssignmentUpdate::Applied {
                        assignment: current,
                        changed: false,
                    });
                }

                let updated = Assignment {
                    volunteer_id,
                    camper_ids: remaining,
                };
                save_assignment_in(&txn, &updated, Utc::now()).await?;
                txn.commit().await?;
                Ok(AssignmentUpdate::Applied {
                    assignment: updated,
                    changed: true,
                })
            },
        )
        .await
        .map_err(|e| CampError::database_operation(format!("更新分配失败: {}", e)))?;

        Ok(outcome)
    }
}
