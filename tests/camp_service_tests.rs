//! CampService tests
//!
//! Business rules on top of a temporary SQLite database: validation,
//! bulk reconciliation, assignments, import/export and obfuscation.

use std::sync::Arc;

use camptrack::config::{DatabaseConfig, SyncConfig};
use camptrack::services::transfer::{
    export_snapshot, import_snapshot, read_roster_csv, read_snapshot_json, write_roster_csv,
    write_snapshot_json,
};
use camptrack::services::{CampService, ImportMode, obfuscate_campers};
use camptrack::storage::{CamperInput, CareDataInput, InsulinDelivery, StorageFactory, VolunteerInput};
use tempfile::TempDir;

async fn create_service() -> (CampService, TempDir) {
    create_service_with(SyncConfig::default()).await
}

async fn create_service_with(sync: SyncConfig) -> (CampService, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("camp.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };
    let storage = StorageFactory::create_with(&config)
        .await
        .expect("Failed to create storage");

    (CampService::new(Arc::clone(&storage), sync), temp_dir)
}

fn camper(first: &str, last: &str) -> CamperInput {
    CamperInput {
        first_name: first.to_string(),
        last_name: last.to_string(),
        ..Default::default()
    }
}

fn volunteer(first: &str) -> VolunteerInput {
    VolunteerInput {
        first_name: first.to_string(),
        last_name: "Staff".to_string(),
        ..Default::default()
    }
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_create_camper_normalizes_input() {
    let (service, _dir) = create_service().await;

    let created = service
        .create_camper(CamperInput {
            cabin: Some("  ".to_string()),
            notes: Some("  loves canoeing ".to_string()),
            ..camper("  Ada ", "Lovelace")
        })
        .await
        .unwrap();

    assert_eq!(created.first_name, "Ada");
    assert_eq!(created.cabin, None);
    assert_eq!(created.notes.as_deref(), Some("loves canoeing"));
}

#[tokio::test]
async fn test_create_rejects_id_and_bad_fields() {
    let (service, _dir) = create_service().await;

    let err = service
        .create_camper(CamperInput {
            id: Some(3),
            ..camper("Ada", "Lovelace")
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E008");

    let err = service
        .create_camper(CamperInput {
            guardian_email: Some("not-an-email".to_string()),
            ..camper("", "Lovelace")
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E008");
    assert!(err.message().contains("first_name is required"));
    assert!(err.message().contains("guardian_email"));

    let err = service
        .create_camper(CamperInput {
            care: Some(CareDataInput {
                target_bg_low: Some(200),
                target_bg_high: Some(120),
                ..Default::default()
            }),
            ..camper("Ada", "Lovelace")
        })
        .await
        .unwrap_err();
    assert!(err.message().starts_with("care:"));

    assert!(service.list_campers().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let (service, _dir) = create_service().await;

    assert!(service.find_camper(1).await.unwrap().is_none());
    assert_eq!(service.get_camper(1).await.unwrap_err().code(), "E009");
    assert_eq!(service.delete_camper(1).await.unwrap_err().code(), "E009");
    assert_eq!(service.delete_volunteer(1).await.unwrap_err().code(), "E009");
    assert_eq!(
        service
            .update_volunteer(1, volunteer("Val"))
            .await
            .unwrap_err()
            .code(),
        "E009"
    );
}

// =============================================================================
// Bulk reconciliation
// =============================================================================

#[tokio::test]
async fn test_update_all_campers_classifies_rows() {
    let (service, _dir) = create_service().await;
    let keep = service.create_camper(camper("Keep", "Me")).await.unwrap();
    let edit = service.create_camper(camper("Edit", "Me")).await.unwrap();
    let gone = service.create_camper(camper("Gone", "Soon")).await.unwrap();

    let report = service
        .update_all_campers(
            vec![
                CamperInput::from_record(&keep, None),
                CamperInput {
                    cabin: Some("Birch".to_string()),
                    ..CamperInput::from_record(&edit, None)
                },
                camper("New", "Kid"),
                CamperInput {
                    id: Some(9999),
                    ..camper("Ghost", "Row")
                },
            ],
            true,
        )
        .await
        .unwrap();

    assert_eq!(report.unchanged, vec![keep.id]);
    assert_eq!(report.updated, vec![edit.id]);
    assert_eq!(report.deleted, vec![gone.id]);
    assert_eq!(report.missing, vec![9999]);
    assert_eq!(report.created.len(), 1);

    let names: Vec<String> = service
        .list_campers()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.first_name)
        .collect();
    assert_eq!(names, vec!["Keep", "Edit", "New"]);
    assert_eq!(
        service.get_camper(edit.id).await.unwrap().cabin.as_deref(),
        Some("Birch")
    );
}

#[tokio::test]
async fn test_update_all_without_prune_keeps_rows() {
    let (service, _dir) = create_service().await;
    service.create_volunteer(volunteer("Val")).await.unwrap();
    service.create_volunteer(volunteer("Wes")).await.unwrap();

    let report = service
        .update_all_volunteers(vec![volunteer("Xia")], false)
        .await
        .unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(report.created.len(), 1);
    assert_eq!(service.list_volunteers().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_update_all_is_idempotent() {
    let (service, _dir) = create_service().await;
    let first = service
        .update_all_volunteers(vec![volunteer("Val"), volunteer("Wes")], false)
        .await
        .unwrap();

    let listed = service.list_volunteers().await.unwrap();
    let again = service
        .update_all_volunteers(
            listed.iter().map(VolunteerInput::from_record).collect(),
            true,
        )
        .await
        .unwrap();

    assert_eq!(again.total_changes(), 0);
    assert_eq!(again.unchanged, first.created);
}

#[tokio::test]
async fn test_update_all_rejects_duplicates_and_oversized_batches() {
    let (service, _dir) = create_service_with(SyncConfig {
        max_batch_size: 2,
        ..Default::default()
    })
    .await;
    let v = service.create_volunteer(volunteer("Val")).await.unwrap();

    let dup = VolunteerInput::from_record(&v);
    let err = service
        .update_all_volunteers(vec![dup.clone(), dup], false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E008");

    let err = service
        .update_all_volunteers(
            vec![volunteer("A"), volunteer("B"), volunteer("C")],
            false,
        )
        .await
        .unwrap_err();
    assert!(err.message().contains("exceeds the limit"));

    // 超限时先于逐条校验报错
    let err = service
        .update_all_volunteers(
            vec![volunteer("A"), volunteer(""), volunteer("C")],
            false,
        )
        .await
        .unwrap_err();
    assert!(err.message().contains("exceeds the limit"));

    // 校验失败不写库
    assert_eq!(service.list_volunteers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_all_campers_writes_nested_care() {
    let (service, _dir) = create_service().await;
    let report = service
        .update_all_campers(
            vec![CamperInput {
                care: Some(CareDataInput {
                    delivery_method: Some(InsulinDelivery::Pen),
                    target_bg_low: Some(90),
                    target_bg_high: Some(160),
                    ..Default::default()
                }),
                ..camper("Grace", "Hopper")
            }],
            false,
        )
        .await
        .unwrap();

    let id = report.created[0];
    let care = service.get_care_data(id).await.unwrap().unwrap();
    assert_eq!(care.delivery_method, Some(InsulinDelivery::Pen));
    assert_eq!(care.target_bg_low, Some(90));
}

// =============================================================================
// Assignments
// =============================================================================

#[tokio::test]
async fn test_add_assignment_is_a_union() {
    let (service, _dir) = create_service().await;
    let v = service.create_volunteer(volunteer("Val")).await.unwrap();
    let a = service.create_camper(camper("A", "One")).await.unwrap();
    let b = service.create_camper(camper("B", "Two")).await.unwrap();
    let c = service.create_camper(camper("C", "Three")).await.unwrap();

    let first = service
        .add_volunteer_assignment(v.id, vec![b.id, a.id, b.id])
        .await
        .unwrap();
    assert_eq!(first.camper_ids, vec![a.id, b.id]);

    let second = service
        .add_volunteer_assignment(v.id, vec![c.id, a.id])
        .await
        .unwrap();
    assert_eq!(second.camper_ids, vec![a.id, b.id, c.id]);

    assert_eq!(service.assignment_for(v.id).await.unwrap(), second);
    let campers: Vec<i32> = service
        .campers_for_volunteer(v.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(campers, vec![a.id, b.id, c.id]);

    let volunteers = service.volunteers_for_camper(c.id).await.unwrap();
    assert_eq!(volunteers.len(), 1);
    assert_eq!(volunteers[0].id, v.id);
}

#[tokio::test]
async fn test_add_assignment_checks_references() {
    let (service, _dir) = create_service().await;
    let v = service.create_volunteer(volunteer("Val")).await.unwrap();
    let a = service.create_camper(camper("A", "One")).await.unwrap();

    let err = service
        .add_volunteer_assignment(v.id, vec![a.id, 404])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E009");
    assert!(err.message().contains("404"));
    // 部分无效时整体不写
    assert!(service.assignment_for(v.id).await.unwrap().camper_ids.is_empty());

    let err = service
        .add_volunteer_assignment(v.id + 100, vec![a.id])
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E009");

    let err = service.add_volunteer_assignment(v.id, vec![]).await.unwrap_err();
    assert_eq!(err.code(), "E008");
}

#[tokio::test]
async fn test_remove_assignment_is_idempotent() {
    let (service, _dir) = create_service().await;
    let v = service.create_volunteer(volunteer("Val")).await.unwrap();
    let a = service.create_camper(camper("A", "One")).await.unwrap();
    let b = service.create_camper(camper("B", "Two")).await.unwrap();
    service
        .add_volunteer_assignment(v.id, vec![a.id, b.id])
        .await
        .unwrap();

    let after = service.remove_assignment(v.id, a.id).await.unwrap();
    assert_eq!(after.camper_ids, vec![b.id]);

    let again = service.remove_assignment(v.id, a.id).await.unwrap();
    assert_eq!(again, after);

    let empty = service.remove_assignment(v.id, b.id).await.unwrap();
    assert!(empty.camper_ids.is_empty());
    assert!(service.list_assignments().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_assignments_do_not_lose_updates() {
    let (service, _dir) = create_service().await;
    let service = Arc::new(service);
    let v = service.create_volunteer(volunteer("Val")).await.unwrap();
    let mut ids = Vec::new();
    for i in 0..8 {
        ids.push(
            service
                .create_camper(camper(&format!("Kid{}", i), "Camper"))
                .await
                .unwrap()
                .id,
        );
    }

    let mut handles = Vec::new();
    for id in ids.clone() {
        let service = Arc::clone(&service);
        let volunteer_id = v.id;
        handles.push(tokio::spawn(async move {
            service.add_volunteer_assignment(volunteer_id, vec![id]).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(service.assignment_for(v.id).await.unwrap().camper_ids, ids);
}

#[tokio::test]
async fn test_deleting_camper_updates_assignments() {
    let (service, _dir) = create_service().await;
    let v = service.create_volunteer(volunteer("Val")).await.unwrap();
    let a = service.create_camper(camper("A", "One")).await.unwrap();
    let b = service.create_camper(camper("B", "Two")).await.unwrap();
    service
        .add_volunteer_assignment(v.id, vec![a.id, b.id])
        .await
        .unwrap();

    service.delete_camper(a.id).await.unwrap();
    assert_eq!(
        service.assignment_for(v.id).await.unwrap().camper_ids,
        vec![b.id]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_assignment_never_keeps_deleted_camper() {
    let (service, _dir) = create_service().await;
    let service = Arc::new(service);
    let v = service.create_volunteer(volunteer("Val")).await.unwrap();

    for i in 0..40 {
        let c = service
            .create_camper(camper(&format!("Kid{}", i), "Racer"))
            .await
            .unwrap();

        let adder = {
            let service = Arc::clone(&service);
            let (volunteer_id, camper_id) = (v.id, c.id);
            tokio::spawn(async move {
                service
                    .add_volunteer_assignment(volunteer_id, vec![camper_id])
                    .await
            })
        };
        let deleter = {
            let service = Arc::clone(&service);
            let camper_id = c.id;
            tokio::spawn(async move { service.delete_camper(camper_id).await })
        };

        // 添加可能先完成，也可能因营员已删除而返回 E009
        if let Err(e) = adder.await.unwrap() {
            assert_eq!(e.code(), "E009");
        }
        deleter.await.unwrap().unwrap();

        let assignment = service.assignment_for(v.id).await.unwrap();
        assert!(
            !assignment.contains(c.id),
            "round {}: deleted camper {} still assigned",
            i,
            c.id
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_deleted_volunteer_leaves_no_assignment_row() {
    let (service, _dir) = create_service().await;
    let service = Arc::new(service);
    let c = service.create_camper(camper("A", "One")).await.unwrap();

    for i in 0..40 {
        let v = service
            .create_volunteer(volunteer(&format!("Val{}", i)))
            .await
            .unwrap();

        let adder = {
            let service = Arc::clone(&service);
            let (volunteer_id, camper_id) = (v.id, c.id);
            tokio::spawn(async move {
                service
                    .add_volunteer_assignment(volunteer_id, vec![camper_id])
                    .await
            })
        };
        let deleter = {
            let service = Arc::clone(&service);
            let volunteer_id = v.id;
            tokio::spawn(async move { service.delete_volunteer(volunteer_id).await })
        };

        if let Err(e) = adder.await.unwrap() {
            assert_eq!(e.code(), "E009");
        }
        deleter.await.unwrap().unwrap();

        let rows = service.list_assignments().await.unwrap();
        assert!(
            rows.iter().all(|a| a.volunteer_id != v.id),
            "round {}: orphan assignment for volunteer {}",
            i,
            v.id
        );
    }
}

// =============================================================================
// Import / export
// =============================================================================

#[tokio::test]
async fn test_snapshot_roundtrip_into_fresh_database() {
    let (source, _src_dir) = create_service().await;
    let v = source.create_volunteer(volunteer("Val")).await.unwrap();
    let a = source
        .create_camper(CamperInput {
            care: Some(CareDataInput {
                insulin_type: Some("Novolog".to_string()),
                ..Default::default()
            }),
            ..camper("A", "One")
        })
        .await
        .unwrap();
    source.add_volunteer_assignment(v.id, vec![a.id]).await.unwrap();

    let snapshot = export_snapshot(&source).await.unwrap();
    let mut buffer = Vec::new();
    write_snapshot_json(&snapshot, &mut buffer).unwrap();
    let parsed = read_snapshot_json(buffer.as_slice()).unwrap();
    assert_eq!(parsed, snapshot);

    let (target, _dst_dir) = create_service().await;
    // 目标库先占用一个 id，验证 Fresh 模式会重映射分配
    target.create_camper(camper("Existing", "Kid")).await.unwrap();

    let report = import_snapshot(&target, parsed, ImportMode::Fresh, false)
        .await
        .unwrap();
    assert_eq!(report.campers.created.len(), 1);
    assert_eq!(report.volunteers.created.len(), 1);
    assert_eq!(report.assignments_applied, 1);
    assert_eq!(report.assignments_skipped, 0);

    let new_camper = report.campers.created[0];
    let new_volunteer = report.volunteers.created[0];
    assert_ne!(new_camper, a.id);
    assert_eq!(
        target
            .assignment_for(new_volunteer)
            .await
            .unwrap()
            .camper_ids,
        vec![new_camper]
    );
    let care = target.get_care_data(new_camper).await.unwrap().unwrap();
    assert_eq!(care.insulin_type.as_deref(), Some("Novolog"));
}

#[tokio::test]
async fn test_merge_import_matches_by_id() {
    let (service, _dir) = create_service().await;
    service.create_camper(camper("A", "One")).await.unwrap();

    let mut snapshot = export_snapshot(&service).await.unwrap();
    snapshot.campers[0].cabin = Some("Cedar".to_string());

    let report = import_snapshot(&service, snapshot, ImportMode::Merge, false)
        .await
        .unwrap();
    assert_eq!(report.campers.updated.len(), 1);
    assert!(report.campers.created.is_empty());
    assert_eq!(
        service.list_campers().await.unwrap()[0].cabin.as_deref(),
        Some("Cedar")
    );
}

#[tokio::test]
async fn test_roster_csv_roundtrip() {
    let (service, _dir) = create_service().await;
    service
        .create_camper(CamperInput {
            cabin: Some("Pine".to_string()),
            care: Some(CareDataInput {
                delivery_method: Some(InsulinDelivery::Pump),
                target_bg_low: Some(80),
                target_bg_high: Some(180),
                ..Default::default()
            }),
            ..camper("Ada", "Lovelace")
        })
        .await
        .unwrap();

    let records = service.storage().list_campers_with_care().await.unwrap();
    let mut buffer = Vec::new();
    write_roster_csv(&records, &mut buffer).unwrap();

    let text = String::from_utf8(buffer.clone()).unwrap();
    assert!(text.starts_with("id,first_name,last_name"));

    let inputs = read_roster_csv(buffer.as_slice()).unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].cabin.as_deref(), Some("Pine"));
    let care = inputs[0].care.as_ref().unwrap();
    assert_eq!(care.delivery_method, Some(InsulinDelivery::Pump));
}

#[test]
fn test_roster_csv_reports_bad_rows() {
    let csv = "first_name,last_name,target_bg_low\nAda,Lovelace,80\nBob,Smith,lots\n";
    let err = read_roster_csv(csv.as_bytes()).unwrap_err();
    assert_eq!(err.code(), "E011");
    assert!(err.message().contains("Row 3"));
}

// =============================================================================
// Obfuscation
// =============================================================================

#[tokio::test]
async fn test_obfuscate_campers_dry_run_and_apply() {
    let (service, _dir) = create_service().await;
    let created = service
        .create_camper(CamperInput {
            address: Some("12 Maple Street, Springfield, IL 62704".to_string()),
            guardian_phone: Some("555-867-5309".to_string()),
            ..camper("Ada", "Lovelace")
        })
        .await
        .unwrap();
    service.create_camper(camper("No", "Address")).await.unwrap();

    let dry = obfuscate_campers(&service, 7, true).await.unwrap();
    assert!(dry.dry_run);
    assert_eq!(dry.examined, 2);
    assert_eq!(dry.changed, 1);
    let untouched = service.get_camper(created.id).await.unwrap();
    assert_eq!(untouched.address, created.address);
    assert_eq!(untouched.guardian_phone, created.guardian_phone);

    let applied = obfuscate_campers(&service, 7, false).await.unwrap();
    assert_eq!(applied.changed, 1);

    let after = service.get_camper(created.id).await.unwrap();
    assert_ne!(after.address, created.address);
    assert_ne!(after.guardian_phone, created.guardian_phone);
    assert!(after.address.as_deref().unwrap().contains(", Springfield, IL "));
    assert_eq!(after.first_name, "Ada");
}
