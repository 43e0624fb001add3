//! 批量同步的记录对齐
//!
//! 把客户端提交的完整列表与数据库现有记录逐条比较，得到
//! create / update / unchanged / delete / missing 五类结果。
//! 只做计算，不访问数据库。

use std::collections::{BTreeSet, HashMap, HashSet};

use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

use crate::errors::{CampError, Result};
use crate::storage::{CamperInput, CamperWithCare, Volunteer, VolunteerInput};

/// 可按 id 对齐的输入
pub trait Keyed {
    fn key(&self) -> Option<i32>;
}

/// 可与输入比较内容的已存储记录
pub trait Reconcilable<D> {
    fn id(&self) -> i32;
    fn matches_draft(&self, draft: &D) -> bool;
}

impl Keyed for CamperInput {
    fn key(&self) -> Option<i32> {
        self.id
    }
}

impl Keyed for VolunteerInput {
    fn key(&self) -> Option<i32> {
        self.id
    }
}

impl Reconcilable<CamperInput> for CamperWithCare {
    fn id(&self) -> i32 {
        self.camper.id
    }

    fn matches_draft(&self, draft: &CamperInput) -> bool {
        draft.matches(&self.camper, self.care.as_ref())
    }
}

impl Reconcilable<VolunteerInput> for Volunteer {
    fn id(&self) -> i32 {
        self.id
    }

    fn matches_draft(&self, draft: &VolunteerInput) -> bool {
        draft.matches(self)
    }
}

/// 对齐结果
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan<D> {
    pub creates: Vec<D>,
    pub updates: Vec<(i32, D)>,
    pub unchanged: Vec<i32>,
    pub deletes: Vec<i32>,
    pub missing: Vec<i32>,
}

impl<D> Default for SyncPlan<D> {
    fn default() -> Self {
        Self {
            creates: Vec::new(),
            updates: Vec::new(),
            unchanged: Vec::new(),
            deletes: Vec::new(),
            missing: Vec::new(),
        }
    }
}

impl<D> SyncPlan<D> {
    /// 是否需要写库
    pub fn has_writes(&self) -> bool {
        !self.creates.is_empty() || !self.updates.is_empty() || !self.deletes.is_empty()
    }

    /// 写入完成后生成报告，`created_ids` 为新建记录分配到的 id
    pub fn into_report(self, created_ids: Vec<i32>) -> SyncReport {
        SyncReport {
            created: sorted(created_ids),
            updated: sorted(self.updates.into_iter().map(|(id, _)| id).collect()),
            unchanged: sorted(self.unchanged),
            deleted: sorted(self.deletes),
            missing: sorted(self.missing),
        }
    }
}

/// 批量同步结果（各列表升序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct SyncReport {
    pub created: Vec<i32>,
    pub updated: Vec<i32>,
    pub unchanged: Vec<i32>,
    pub deleted: Vec<i32>,
    pub missing: Vec<i32>,
}

impl SyncReport {
    pub fn total_changes(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}

fn sorted(mut ids: Vec<i32>) -> Vec<i32> {
    ids.sort_unstable();
    ids
}

/// 计算同步计划
///
/// 同一 id 在输入中出现两次视为校验失败，不产生任何写入。
pub fn plan_sync<R, D>(existing: &[R], incoming: Vec<D>, prune: bool) -> Result<SyncPlan<D>>
where
    R: Reconcilable<D>,
    D: Keyed,
{
    let mut seen: HashSet<i32> = HashSet::with_capacity(incoming.len());
    let mut duplicates: BTreeSet<i32> = BTreeSet::new();
    for id in incoming.iter().filter_map(Keyed::key) {
        if !seen.insert(id) {
            duplicates.insert(id);
        }
    }
    if !duplicates.is_empty() {
        let ids: Vec<String> = duplicates.iter().map(|id| id.to_string()).collect();
        return Err(CampError::validation(format!(
            "Duplicate ids in input: {}",
            ids.join(", ")
        )));
    }

    let by_id: HashMap<i32, &R> = existing.iter().map(|r| (r.id(), r)).collect();
    let mut plan = SyncPlan::default();

    for draft in incoming {
        match draft.key() {
            None => plan.creates.push(draft),
            Some(id) => match by_id.get(&id) {
                Some(record) if record.matches_draft(&draft) => plan.unchanged.push(id),
                Some(_) => plan.updates.push((id, draft)),
                None => plan.missing.push(id),
            },
        }
    }

    if prune {
        plan.deletes = existing
            .iter()
            .map(Reconcilable::id)
            .filter(|id| !seen.contains(id))
            .collect();
        plan.deletes.sort_unstable();
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn volunteer(id: i32, first: &str) -> Volunteer {
        Volunteer {
            id,
            first_name: first.to_string(),
            last_name: "Doe".to_string(),
            role: None,
            email: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn draft(id: Option<i32>, first: &str) -> VolunteerInput {
        VolunteerInput {
            id,
            first_name: first.to_string(),
            last_name: "Doe".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_classifies_every_draft() {
        let existing = vec![volunteer(1, "Ann"), volunteer(2, "Bob"), volunteer(3, "Cy")];
        let incoming = vec![
            draft(Some(1), "Ann"),
            draft(Some(2), "Bobby"),
            draft(None, "New"),
            draft(Some(42), "Ghost"),
        ];

        let plan = plan_sync(&existing, incoming, false).unwrap();
        assert_eq!(plan.unchanged, vec![1]);
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].0, 2);
        assert_eq!(plan.creates.len(), 1);
        assert_eq!(plan.missing, vec![42]);
        assert!(plan.deletes.is_empty());
        assert!(plan.has_writes());
    }

    #[test]
    fn test_prune_deletes_unmentioned() {
        let existing = vec![volunteer(1, "Ann"), volunteer(2, "Bob"), volunteer(3, "Cy")];
        let plan = plan_sync(&existing, vec![draft(Some(2), "Bob")], true).unwrap();
        assert_eq!(plan.deletes, vec![1, 3]);
        assert_eq!(plan.unchanged, vec![2]);
    }

    #[test]
    fn test_empty_input_with_prune_deletes_all() {
        let existing = vec![volunteer(5, "Ann"), volunteer(4, "Bob")];
        let plan: SyncPlan<VolunteerInput> = plan_sync(&existing, Vec::new(), true).unwrap();
        assert_eq!(plan.deletes, vec![4, 5]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let existing = vec![volunteer(1, "Ann")];
        let err = plan_sync(
            &existing,
            vec![draft(Some(1), "Ann"), draft(Some(1), "Other")],
            false,
        )
        .unwrap_err();
        assert_eq!(err.code(), "E008");
        assert!(err.message().contains('1'));
    }

    #[test]
    fn test_identical_input_has_no_writes() {
        let existing = vec![volunteer(1, "Ann"), volunteer(2, "Bob")];
        let plan = plan_sync(
            &existing,
            vec![draft(Some(1), "Ann"), draft(Some(2), "Bob")],
            true,
        )
        .unwrap();
        assert!(!plan.has_writes());
    }

    #[test]
    fn test_report_is_sorted() {
        let plan = SyncPlan {
            creates: vec![draft(None, "x")],
            updates: vec![(9, draft(Some(9), "a")), (3, draft(Some(3), "b"))],
            unchanged: vec![7, 1],
            deletes: vec![5, 2],
            missing: vec![11, 10],
        };
        let report = plan.into_report(vec![20, 19]);
        assert_eq!(report.created, vec![19, 20]);
        assert_eq!(report.updated, vec![3, 9]);
        assert_eq!(report.unchanged, vec![1, 7]);
        assert_eq!(report.deleted, vec![2, 5]);
        assert_eq!(report.missing, vec![10, 11]);
        assert_eq!(report.total_changes(), 6);
    }
}
