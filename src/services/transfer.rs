//! Roster import / export
//!
//! JSON 快照包含营员（含医疗档案）、志愿者和分配；CSV 花名册只含营员。
//! 导入走 update_all_* 的同一套对齐流程。

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::camp_service::CampService;
use super::reconcile::SyncReport;
use crate::errors::{CampError, Result};
use crate::storage::{
    Assignment, CamperInput, CamperWithCare, CareDataInput, InsulinDelivery, VolunteerInput,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampSnapshot {
    pub exported_at: DateTime<Utc>,
    pub campers: Vec<CamperInput>,
    pub volunteers: Vec<VolunteerInput>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
}

/// 导入方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// 按 id 对齐已有记录
    #[default]
    Merge,
    /// 忽略文件中的 id，全部新建，分配按新 id 重映射
    Fresh,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub campers: SyncReport,
    pub volunteers: SyncReport,
    pub assignments_applied: usize,
    pub assignments_skipped: usize,
}

/// CSV 花名册的一行
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterRow {
    #[serde(default)]
    pub id: Option<i32>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub cabin: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub guardian_name: Option<String>,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub guardian_email: Option<String>,
    #[serde(default)]
    pub insulin_type: Option<String>,
    #[serde(default)]
    pub delivery_method: Option<InsulinDelivery>,
    #[serde(default)]
    pub target_bg_low: Option<i32>,
    #[serde(default)]
    pub target_bg_high: Option<i32>,
    #[serde(default)]
    pub allergies: Option<String>,
}

impl From<&CamperWithCare> for RosterRow {
    fn from(record: &CamperWithCare) -> Self {
        let camper = &record.camper;
        let care = record.care.as_ref();
        Self {
            id: Some(camper.id),
            first_name: camper.first_name.clone(),
            last_name: camper.last_name.clone(),
            birth_date: camper.birth_date,
            cabin: camper.cabin.clone(),
            address: camper.address.clone(),
            guardian_name: camper.guardian_name.clone(),
            guardian_phone: camper.guardian_phone.clone(),
            guardian_email: camper.guardian_email.clone(),
            insulin_type: care.and_then(|c| c.insulin_type.clone()),
            delivery_method: care.and_then(|c| c.delivery_method),
            target_bg_low: care.and_then(|c| c.target_bg_low),
            target_bg_high: care.and_then(|c| c.target_bg_high),
            allergies: care.and_then(|c| c.allergies.clone()),
        }
    }
}

impl RosterRow {
    /// 任何医疗列有值时才带上 care；花名册没有的医疗字段保持为空
    pub fn into_input(self) -> CamperInput {
        let has_care = self.insulin_type.is_some()
            || self.delivery_method.is_some()
            || self.target_bg_low.is_some()
            || self.target_bg_high.is_some()
            || self.allergies.is_some();
        let care = has_care.then(|| CareDataInput {
            insulin_type: self.insulin_type,
            delivery_method: self.delivery_method,
            target_bg_low: self.target_bg_low,
            target_bg_high: self.target_bg_high,
            allergies: self.allergies,
            ..Default::default()
        });
        CamperInput {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date,
            cabin: self.cabin,
            address: self.address,
            guardian_name: self.guardian_name,
            guardian_phone: self.guardian_phone,
            guardian_email: self.guardian_email,
            notes: None,
            care,
        }
    }
}

pub async fn export_snapshot(service: &CampService) -> Result<CampSnapshot> {
    let storage = service.storage();
    let campers = storage
        .list_campers_with_care()
        .await?
        .iter()
        .map(|r| CamperInput::from_record(&r.camper, r.care.as_ref()))
        .collect();
    let volunteers = storage
        .list_volunteers()
        .await?
        .iter()
        .map(VolunteerInput::from_record)
        .collect();
    let assignments = storage.list_assignments().await?;

    Ok(CampSnapshot {
        exported_at: Utc::now(),
        campers,
        volunteers,
        assignments,
    })
}

pub fn write_snapshot_json<W: Write>(snapshot: &CampSnapshot, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, snapshot)?;
    Ok(())
}

pub fn read_snapshot_json<R: Read>(reader: R) -> Result<CampSnapshot> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_roster_csv<W: Write>(records: &[CamperWithCare], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    for record in records {
        csv_writer.serialize(RosterRow::from(record))?;
    }
    csv_writer
        .flush()
        .map_err(|e| CampError::file_operation(format!("Failed to flush CSV: {}", e)))?;
    Ok(())
}

/// 解析 CSV 花名册；有坏行时报告所有坏行的行号
pub fn read_roster_csv<R: Read>(reader: R) -> Result<Vec<CamperInput>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut campers = Vec::new();
    let mut errors = Vec::new();
    for (row_idx, result) in csv_reader.deserialize::<RosterRow>().enumerate() {
        // 1-based，跳过 header
        let row_num = row_idx + 2;
        match result {
            Ok(row) => campers.push(row.into_input()),
            Err(e) => errors.push(format!("Row {}: {}", row_num, e)),
        }
    }

    if !errors.is_empty() {
        return Err(CampError::serialization(format!(
            "Failed to read roster CSV:\n{}",
            errors.join("\n")
        )));
    }
    Ok(campers)
}

pub fn export_snapshot_to_file<P: AsRef<Path>>(snapshot: &CampSnapshot, path: P) -> Result<()> {
    let file = File::create(path.as_ref())
        .map_err(|e| CampError::file_operation(format!("Failed to create file: {}", e)))?;
    write_snapshot_json(snapshot, BufWriter::new(file))
}

pub fn read_snapshot_file<P: AsRef<Path>>(path: P) -> Result<CampSnapshot> {
    let file = File::open(path.as_ref())
        .map_err(|e| CampError::file_operation(format!("Failed to open file: {}", e)))?;
    read_snapshot_json(BufReader::new(file))
}

/// 导入快照：先营员、再志愿者，最后按 id 映射恢复分配
pub async fn import_snapshot(
    service: &CampService,
    snapshot: CampSnapshot,
    mode: ImportMode,
    prune: bool,
) -> Result<ImportReport> {
    let CampSnapshot {
        campers,
        volunteers,
        assignments,
        ..
    } = snapshot;

    let camper_source_ids: Vec<Option<i32>> = campers.iter().map(|c| c.id).collect();
    let volunteer_source_ids: Vec<Option<i32>> = volunteers.iter().map(|v| v.id).collect();

    let (campers, volunteers) = match mode {
        ImportMode::Merge => (campers, volunteers),
        ImportMode::Fresh => (
            campers
                .into_iter()
                .map(|c| CamperInput { id: None, ..c })
                .collect(),
            volunteers
                .into_iter()
                .map(|v| VolunteerInput { id: None, ..v })
                .collect(),
        ),
    };

    let camper_report = service.update_all_campers(campers, prune).await?;
    let volunteer_report = service.update_all_volunteers(volunteers, prune).await?;

    // 源 id → 目标 id
    let (camper_map, volunteer_map) = match mode {
        ImportMode::Merge => (identity_map(&camper_source_ids), identity_map(&volunteer_source_ids)),
        ImportMode::Fresh => (
            created_map(&camper_source_ids, &camper_report.created),
            created_map(&volunteer_source_ids, &volunteer_report.created),
        ),
    };

    let live_campers: BTreeSet<i32> = service
        .list_campers()
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut applied = 0;
    let mut skipped = 0;
    for assignment in assignments {
        let Some(&volunteer_id) = volunteer_map.get(&assignment.volunteer_id) else {
            skipped += 1;
            continue;
        };
        let camper_ids: Vec<i32> = assignment
            .camper_ids
            .iter()
            .filter_map(|id| camper_map.get(id))
            .copied()
            .filter(|id| live_campers.contains(id))
            .collect();
        if camper_ids.is_empty() {
            skipped += 1;
            continue;
        }
        match service.add_volunteer_assignment(volunteer_id, camper_ids).await {
            Ok(_) => applied += 1,
            Err(CampError::NotFound(msg)) => {
                warn!("Skipping assignment for volunteer {}: {}", volunteer_id, msg);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Import finished: {} campers and {} volunteers changed, {} assignments applied, {} skipped",
        camper_report.total_changes(),
        volunteer_report.total_changes(),
        applied,
        skipped
    );

    Ok(ImportReport {
        campers: camper_report,
        volunteers: volunteer_report,
        assignments_applied: applied,
        assignments_skipped: skipped,
    })
}

fn identity_map(ids: &[Option<i32>]) -> HashMap<i32, i32> {
    ids.iter().flatten().map(|&id| (id, id)).collect()
}

/// Fresh 模式下新建顺序与输入顺序一致
fn created_map(source: &[Option<i32>], created: &[i32]) -> HashMap<i32, i32> {
    let mut created_sorted = created.to_vec();
    created_sorted.sort_unstable();
    source
        .iter()
        .zip(created_sorted)
        .filter_map(|(src, dst)| src.map(|s| (s, dst)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Camper, CareData};

    fn record() -> CamperWithCare {
        CamperWithCare {
            camper: Camper {
                id: 3,
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2013, 2, 3),
                cabin: Some("Pine".to_string()),
                address: None,
                guardian_name: None,
                guardian_phone: Some("555-0100".to_string()),
                guardian_email: None,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            care: Some(CareData {
                camper_id: 3,
                insulin_type: Some("Humalog".to_string()),
                delivery_method: Some(InsulinDelivery::Pen),
                target_bg_low: Some(80),
                target_bg_high: Some(180),
                carb_ratio: None,
                correction_factor: None,
                long_acting_units: None,
                allergies: Some("peanuts, latex".to_string()),
                medications: None,
                notes: None,
                updated_at: Utc::now(),
            }),
        }
    }

    #[test]
    fn test_roster_csv_round_trip_keeps_care_columns() {
        let mut buf = Vec::new();
        write_roster_csv(&[record()], &mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("id,first_name,last_name"));
        assert!(text.contains("\"peanuts, latex\""));

        let campers = read_roster_csv(buf.as_slice()).unwrap();
        assert_eq!(campers.len(), 1);
        let camper = &campers[0];
        assert_eq!(camper.id, Some(3));
        assert_eq!(camper.cabin.as_deref(), Some("Pine"));
        let care = camper.care.as_ref().unwrap();
        assert_eq!(care.delivery_method, Some(InsulinDelivery::Pen));
        assert_eq!(care.target_bg_high, Some(180));
    }

    #[test]
    fn test_roster_without_care_columns() {
        let csv = "first_name,last_name,cabin\nSam,Lee,Oak\n";
        let campers = read_roster_csv(csv.as_bytes()).unwrap();
        assert_eq!(campers[0].id, None);
        assert_eq!(campers[0].care, None);
    }

    #[test]
    fn test_roster_bad_rows_reported() {
        let csv = "first_name,last_name,target_bg_low\nSam,Lee,abc\n";
        let err = read_roster_csv(csv.as_bytes()).unwrap_err();
        assert!(err.message().contains("Row 2"));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = CampSnapshot {
            exported_at: Utc::now(),
            campers: vec![CamperInput::from_record(&record().camper, record().care.as_ref())],
            volunteers: vec![],
            assignments: vec![Assignment {
                volunteer_id: 1,
                camper_ids: vec![3],
            }],
        };
        let mut buf = Vec::new();
        write_snapshot_json(&snapshot, &mut buf).unwrap();
        let back = read_snapshot_json(buf.as_slice()).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_created_map_pairs_in_order() {
        let map = created_map(&[Some(10), Some(20), None], &[7, 5, 6]);
        assert_eq!(map.get(&10), Some(&5));
        assert_eq!(map.get(&20), Some(&6));
        assert_eq!(map.len(), 2);
    }
}
