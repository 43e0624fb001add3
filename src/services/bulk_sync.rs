//! updateAllCampers / updateAllVolunteers 的执行流程
//!
//! 加载现有记录 → plan_sync → 单事务写入 → 回读校验。
//! 回读发现不一致的记录逐条重写，最多 `verify_attempts` 轮，
//! 仍不一致则返回 SyncVerification 错误。

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::reconcile::{Keyed, Reconcilable, SyncPlan, SyncReport, plan_sync};
use crate::config::SyncConfig;
use crate::errors::{CampError, Result};
use crate::storage::backend::retry::calculate_backoff;
use crate::storage::{CampStorage, CamperInput, CamperWithCare, Volunteer, VolunteerInput};

/// 一类可批量同步的记录
#[async_trait]
pub trait SyncTarget: Keyed + Clone + Send + Sync + Sized + 'static {
    type Record: Reconcilable<Self> + Send + Sync;

    const KIND: &'static str;

    async fn load_all(storage: &CampStorage) -> Result<Vec<Self::Record>>;
    async fn load_one(storage: &CampStorage, id: i32) -> Result<Option<Self::Record>>;
    async fn apply(storage: &CampStorage, plan: &SyncPlan<Self>) -> Result<Vec<i32>>;
    async fn rewrite(storage: &CampStorage, id: i32, draft: &Self) -> Result<()>;
    async fn remove(storage: &CampStorage, id: i32) -> Result<()>;
}

#[async_trait]
impl SyncTarget for CamperInput {
    type Record = CamperWithCare;

    const KIND: &'static str = "camper";

    async fn load_all(storage: &CampStorage) -> Result<Vec<CamperWithCare>> {
        storage.list_campers_with_care().await
    }

    async fn load_one(storage: &CampStorage, id: i32) -> Result<Option<CamperWithCare>> {
        storage.get_camper_with_care(id).await
    }

    async fn apply(storage: &CampStorage, plan: &SyncPlan<Self>) -> Result<Vec<i32>> {
        storage.apply_camper_plan(plan).await
    }

    async fn rewrite(storage: &CampStorage, id: i32, draft: &Self) -> Result<()> {
        storage.update_camper(id, draft).await.map(|_| ())
    }

    async fn remove(storage: &CampStorage, id: i32) -> Result<()> {
        storage.delete_camper(id).await.map(|_| ())
    }
}

#[async_trait]
impl SyncTarget for VolunteerInput {
    type Record = Volunteer;

    const KIND: &'static str = "volunteer";

    async fn load_all(storage: &CampStorage) -> Result<Vec<Volunteer>> {
        storage.list_volunteers().await
    }

    async fn load_one(storage: &CampStorage, id: i32) -> Result<Option<Volunteer>> {
        storage.get_volunteer(id).await
    }

    async fn apply(storage: &CampStorage, plan: &SyncPlan<Self>) -> Result<Vec<i32>> {
        storage.apply_volunteer_plan(plan).await
    }

    async fn rewrite(storage: &CampStorage, id: i32, draft: &Self) -> Result<()> {
        storage.update_volunteer(id, draft).await.map(|_| ())
    }

    async fn remove(storage: &CampStorage, id: i32) -> Result<()> {
        storage.delete_volunteer(id).await.map(|_| ())
    }
}

/// 回读校验未通过的一项
#[derive(Debug, Clone)]
enum Pending<D> {
    Upsert(i32, D),
    Gone(i32),
}

impl<D> Pending<D> {
    fn id(&self) -> i32 {
        match self {
            Pending::Upsert(id, _) | Pending::Gone(id) => *id,
        }
    }
}

impl<D> fmt::Display for Pending<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pending::Upsert(id, _) => write!(f, "{} (content mismatch)", id),
            Pending::Gone(id) => write!(f, "{} (still present)", id),
        }
    }
}

/// 批量大小上限检查
pub fn ensure_batch_size(config: &SyncConfig, kind: &str, len: usize) -> Result<()> {
    if len > config.max_batch_size {
        return Err(CampError::validation(format!(
            "Batch of {} {}s exceeds the limit of {}",
            len, kind, config.max_batch_size
        )));
    }
    Ok(())
}

/// 执行一次完整的批量同步
pub async fn run_bulk_sync<D: SyncTarget>(
    storage: &CampStorage,
    config: &SyncConfig,
    incoming: Vec<D>,
    prune: bool,
) -> Result<SyncReport> {
    ensure_batch_size(config, D::KIND, incoming.len())?;

    let existing = D::load_all(storage).await?;
    let plan = plan_sync(&existing, incoming, prune)?;
    drop(existing);

    if !plan.missing.is_empty() {
        warn!(
            "Bulk {} sync skipped {} unknown ids: {:?}",
            D::KIND,
            plan.missing.len(),
            plan.missing
        );
    }

    let created_ids = D::apply(storage, &plan).await?;

    let mut expected: Vec<Pending<D>> = Vec::new();
    for (id, draft) in created_ids.iter().copied().zip(plan.creates.iter().cloned()) {
        expected.push(Pending::Upsert(id, draft));
    }
    for (id, draft) in &plan.updates {
        expected.push(Pending::Upsert(*id, draft.clone()));
    }
    for id in &plan.deletes {
        expected.push(Pending::Gone(*id));
    }
    verify(storage, config, expected).await?;

    let report = plan.into_report(created_ids);
    info!(
        "Bulk {} sync done: {} created, {} updated, {} unchanged, {} deleted, {} missing",
        D::KIND,
        report.created.len(),
        report.updated.len(),
        report.unchanged.len(),
        report.deleted.len(),
        report.missing.len()
    );
    Ok(report)
}

/// 返回仍不一致的项
async fn check<D: SyncTarget>(storage: &CampStorage, items: Vec<Pending<D>>) -> Result<Vec<Pending<D>>> {
    let mut mismatched = Vec::new();
    for item in items {
        let ok = match &item {
            Pending::Upsert(id, draft) => D::load_one(storage, *id)
                .await?
                .is_some_and(|record| record.matches_draft(draft)),
            Pending::Gone(id) => D::load_one(storage, *id).await?.is_none(),
        };
        if !ok {
            mismatched.push(item);
        }
    }
    Ok(mismatched)
}

async fn verify<D: SyncTarget>(
    storage: &CampStorage,
    config: &SyncConfig,
    expected: Vec<Pending<D>>,
) -> Result<()> {
    let mut pending = check(storage, expected).await?;

    let mut attempt = 0;
    while !pending.is_empty() && attempt < config.verify_attempts {
        attempt += 1;
        let delay = calculate_backoff(
            attempt,
            config.verify_delay_ms,
            config.verify_delay_ms.saturating_mul(16),
        );
        warn!(
            "{} {} records failed verification (attempt {}/{}); re-applying in {} ms",
            pending.len(),
            D::KIND,
            attempt,
            config.verify_attempts,
            delay
        );
        tokio::time::sleep(Duration::from_millis(delay)).await;

        for item in &pending {
            let result = match item {
                Pending::Upsert(id, draft) => D::rewrite(storage, *id, draft).await,
                Pending::Gone(id) => D::remove(storage, *id).await,
            };
            if let Err(e) = result {
                debug!("Re-applying {} {} failed: {}", D::KIND, item.id(), e);
            }
        }

        pending = check(storage, pending).await?;
    }

    if pending.is_empty() {
        return Ok(());
    }

    let details: Vec<String> = pending.iter().map(ToString::to_string).collect();
    Err(CampError::sync_verification(format!(
        "{} records did not converge after {} attempts: {}",
        D::KIND,
        config.verify_attempts,
        details.join(", ")
    )))
}
