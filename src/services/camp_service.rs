//! Camp management service
//!
//! Business logic shared by the GraphQL resolvers and the CLI: input
//! normalization, existence checks, bulk reconciliation and volunteer
//! assignments. Every successful write nudges the cache sync worker.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::bulk_sync::{SyncTarget, ensure_batch_size, run_bulk_sync};
use super::cache_sync::SyncTrigger;
use super::reconcile::SyncReport;
use super::validation::{normalize_batch, normalize_camper, normalize_care, normalize_volunteer};
use crate::config::SyncConfig;
use crate::errors::{CampError, Result};
use crate::storage::id_list::normalize_ids;
use crate::storage::{
    Assignment, AssignmentUpdate, CampStorage, Camper, CamperInput, CareData, CareDataInput,
    Volunteer, VolunteerInput,
};

pub struct CampService {
    storage: Arc<CampStorage>,
    sync: SyncConfig,
    trigger: Option<SyncTrigger>,
    /// 所有会改动分配列表或其引用记录的写操作持有此锁
    assignment_lock: Mutex<()>,
}

impl CampService {
    pub fn new(storage: Arc<CampStorage>, sync: SyncConfig) -> Self {
        Self {
            storage,
            sync,
            trigger: None,
            assignment_lock: Mutex::new(()),
        }
    }

    pub fn with_trigger(mut self, trigger: SyncTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn storage(&self) -> &Arc<CampStorage> {
        &self.storage
    }

    fn nudge(&self) {
        if let Some(ref trigger) = self.trigger {
            trigger.notify();
        }
    }

    fn reject_id(kind: &str, id: Option<i32>) -> Result<()> {
        match id {
            Some(id) => Err(CampError::validation(format!(
                "id {} must not be set when creating a {}",
                id, kind
            ))),
            None => Ok(()),
        }
    }

    // ============ Campers ============

    pub async fn list_campers(&self) -> Result<Vec<Camper>> {
        self.storage.list_campers().await
    }

    pub async fn find_camper(&self, id: i32) -> Result<Option<Camper>> {
        self.storage.get_camper(id).await
    }

    pub async fn get_camper(&self, id: i32) -> Result<Camper> {
        self.storage
            .get_camper(id)
            .await?
            .ok_or_else(|| CampError::not_found(format!("Camper {} not found", id)))
    }

    pub async fn create_camper(&self, input: CamperInput) -> Result<Camper> {
        Self::reject_id("camper", input.id)?;
        let input = normalize_camper(input)?;
        let camper = self.storage.insert_camper(&input).await?;
        self.nudge();
        Ok(camper)
    }

    pub async fn update_camper(&self, id: i32, input: CamperInput) -> Result<Camper> {
        let input = normalize_camper(CamperInput {
            id: Some(id),
            ..input
        })?;
        let camper = self.storage.update_camper(id, &input).await?;
        self.nudge();
        Ok(camper)
    }

    pub async fn delete_camper(&self, id: i32) -> Result<()> {
        let _guard = self.assignment_lock.lock().await;
        if !self.storage.delete_camper(id).await? {
            return Err(CampError::not_found(format!("Camper {} not found", id)));
        }
        self.nudge();
        Ok(())
    }

    pub async fn get_care_data(&self, camper_id: i32) -> Result<Option<CareData>> {
        self.storage.get_care_data(camper_id).await
    }

    pub async fn list_care_data(&self) -> Result<Vec<CareData>> {
        self.storage.list_care_data().await
    }

    pub async fn upsert_care_data(&self, camper_id: i32, input: CareDataInput) -> Result<CareData> {
        let input = normalize_care(input)?;
        let care = self.storage.upsert_care_data(camper_id, &input).await?;
        self.nudge();
        Ok(care)
    }

    /// 整体同步营员列表
    pub async fn update_all_campers(
        &self,
        inputs: Vec<CamperInput>,
        prune: bool,
    ) -> Result<SyncReport> {
        ensure_batch_size(&self.sync, CamperInput::KIND, inputs.len())?;
        let inputs = normalize_batch("campers", inputs, normalize_camper)?;
        let _guard = self.assignment_lock.lock().await;
        let report = run_bulk_sync(&self.storage, &self.sync, inputs, prune).await?;
        if report.total_changes() > 0 {
            self.nudge();
        }
        Ok(report)
    }

    // ============ Volunteers ============

    pub async fn list_volunteers(&self) -> Result<Vec<Volunteer>> {
        self.storage.list_volunteers().await
    }

    pub async fn find_volunteer(&self, id: i32) -> Result<Option<Volunteer>> {
        self.storage.get_volunteer(id).await
    }

    pub async fn get_volunteer(&self, id: i32) -> Result<Volunteer> {
        self.storage
            .get_volunteer(id)
            .await?
            .ok_or_else(|| CampError::not_found(format!("Volunteer {} not found", id)))
    }

    pub async fn create_volunteer(&self, input: VolunteerInput) -> Result<Volunteer> {
        Self::reject_id("volunteer", input.id)?;
        let input = normalize_volunteer(input)?;
        let volunteer = self.storage.insert_volunteer(&input).await?;
        self.nudge();
        Ok(volunteer)
    }

    pub async fn update_volunteer(&self, id: i32, input: VolunteerInput) -> Result<Volunteer> {
        let input = normalize_volunteer(VolunteerInput {
            id: Some(id),
            ..input
        })?;
        let volunteer = self.storage.update_volunteer(id, &input).await?;
        self.nudge();
        Ok(volunteer)
    }

    pub async fn delete_volunteer(&self, id: i32) -> Result<()> {
        let _guard = self.assignment_lock.lock().await;
        if !self.storage.delete_volunteer(id).await? {
            return Err(CampError::not_found(format!("Volunteer {} not found", id)));
        }
        self.nudge();
        Ok(())
    }

    pub async fn update_all_volunteers(
        &self,
        inputs: Vec<VolunteerInput>,
        prune: bool,
    ) -> Result<SyncReport> {
        ensure_batch_size(&self.sync, VolunteerInput::KIND, inputs.len())?;
        let inputs = normalize_batch("volunteers", inputs, normalize_volunteer)?;
        let _guard = self.assignment_lock.lock().await;
        let report = run_bulk_sync(&self.storage, &self.sync, inputs, prune).await?;
        if report.total_changes() > 0 {
            self.nudge();
        }
        Ok(report)
    }

    // ============ Assignments ============

    pub async fn list_assignments(&self) -> Result<Vec<Assignment>> {
        self.storage.list_assignments().await
    }

    /// 志愿者必须存在；没有分配时返回空列表
    pub async fn assignment_for(&self, volunteer_id: i32) -> Result<Assignment> {
        self.get_volunteer(volunteer_id).await?;
        self.storage.get_assignment(volunteer_id).await
    }

    /// 把营员加入志愿者的负责列表（并集）
    pub async fn add_volunteer_assignment(
        &self,
        volunteer_id: i32,
        camper_ids: Vec<i32>,
    ) -> Result<Assignment> {
        if camper_ids.is_empty() {
            return Err(CampError::validation("camper_ids must not be empty"));
        }
        let requested = normalize_ids(camper_ids);

        let _guard = self.assignment_lock.lock().await;
        let outcome = self
            .storage
            .add_to_assignment(volunteer_id, &requested)
            .await?;
        let assignment = self.settle_assignment(volunteer_id, outcome)?;
        info!(
            "Volunteer {} now assigned {} campers",
            volunteer_id,
            assignment.camper_ids.len()
        );
        Ok(assignment)
    }

    /// 幂等：营员不在列表中时原样返回；列表清空后删除该行
    pub async fn remove_assignment(&self, volunteer_id: i32, camper_id: i32) -> Result<Assignment> {
        let _guard = self.assignment_lock.lock().await;
        let outcome = self
            .storage
            .remove_from_assignment(volunteer_id, camper_id)
            .await?;
        self.settle_assignment(volunteer_id, outcome)
    }

    fn settle_assignment(&self, volunteer_id: i32, outcome: AssignmentUpdate) -> Result<Assignment> {
        match outcome {
            AssignmentUpdate::VolunteerMissing => Err(CampError::not_found(format!(
                "Volunteer {} not found",
                volunteer_id
            ))),
            AssignmentUpdate::CampersMissing(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                Err(CampError::not_found(format!(
                    "Campers not found: {}",
                    ids.join(", ")
                )))
            }
            AssignmentUpdate::Applied {
                assignment,
                changed,
            } => {
                if changed {
                    self.nudge();
                }
                Ok(assignment)
            }
        }
    }

    pub async fn volunteers_for_camper(&self, camper_id: i32) -> Result<Vec<Volunteer>> {
        let ids = self.storage.volunteer_ids_for_camper(camper_id).await?;
        self.storage.list_volunteers_by_ids(&ids).await
    }

    pub async fn campers_for_volunteer(&self, volunteer_id: i32) -> Result<Vec<Camper>> {
        let assignment = self.storage.get_assignment(volunteer_id).await?;
        self.storage
            .list_campers_by_ids(&assignment.camper_ids)
            .await
    }
}
