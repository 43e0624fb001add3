//! Storage backend tests
//!
//! Tests for CampStorage using temporary SQLite databases.

use std::sync::Arc;

use camptrack::config::DatabaseConfig;
use camptrack::services::plan_sync;
use camptrack::storage::backend::{infer_backend_from_url, normalize_backend_name};
use camptrack::storage::{
    Assignment, AssignmentUpdate, CampStorage, CamperInput, CareDataInput, InsulinDelivery, StorageFactory,
    VolunteerInput,
};
use tempfile::TempDir;

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (Arc<CampStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };

    let storage = StorageFactory::create_with(&config)
        .await
        .expect("Failed to create storage");

    (storage, temp_dir)
}

fn camper(first: &str, last: &str) -> CamperInput {
    CamperInput {
        first_name: first.to_string(),
        last_name: last.to_string(),
        cabin: Some("Pine".to_string()),
        ..Default::default()
    }
}

fn care() -> CareDataInput {
    CareDataInput {
        insulin_type: Some("Humalog".to_string()),
        delivery_method: Some(InsulinDelivery::Pump),
        target_bg_low: Some(80),
        target_bg_high: Some(180),
        carb_ratio: Some(12.5),
        ..Default::default()
    }
}

fn volunteer(first: &str) -> VolunteerInput {
    VolunteerInput {
        first_name: first.to_string(),
        last_name: "Counselor".to_string(),
        role: Some("cabin lead".to_string()),
        ..Default::default()
    }
}

// =============================================================================
// URL handling
// =============================================================================

#[test]
fn test_infer_backend_from_url() {
    assert_eq!(infer_backend_from_url("sqlite://camp.db").unwrap(), "sqlite");
    assert_eq!(
        infer_backend_from_url("postgres://u:p@localhost/camp").unwrap(),
        "postgres"
    );
    assert_eq!(
        infer_backend_from_url("mysql://u:p@localhost/camp").unwrap(),
        "mysql"
    );
    assert!(infer_backend_from_url("ftp://nope").is_err());
}

#[test]
fn test_normalize_backend_name() {
    assert_eq!(normalize_backend_name("postgresql"), "postgres");
    assert_eq!(normalize_backend_name("mariadb"), "mysql");
    assert_eq!(normalize_backend_name("sqlite"), "sqlite");
}

#[tokio::test]
async fn test_empty_database_url_rejected() {
    let config = DatabaseConfig {
        database_url: String::new(),
        ..Default::default()
    };
    assert!(CampStorage::new("", "sqlite", &config).await.is_err());
}

// =============================================================================
// Campers and care data
// =============================================================================

#[tokio::test]
async fn test_camper_crud() {
    let (storage, _dir) = create_temp_storage().await;

    let created = storage.insert_camper(&camper("Ada", "Lovelace")).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.cabin.as_deref(), Some("Pine"));

    let fetched = storage.get_camper(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.first_name, "Ada");

    let mut changed = camper("Ada", "King");
    changed.cabin = Some("Oak".to_string());
    let updated = storage.update_camper(created.id, &changed).await.unwrap();
    assert_eq!(updated.last_name, "King");
    assert_eq!(updated.cabin.as_deref(), Some("Oak"));

    assert!(storage.delete_camper(created.id).await.unwrap());
    assert!(storage.get_camper(created.id).await.unwrap().is_none());
    assert!(!storage.delete_camper(created.id).await.unwrap());
}

#[tokio::test]
async fn test_update_missing_camper_is_not_found() {
    let (storage, _dir) = create_temp_storage().await;
    let err = storage
        .update_camper(999, &camper("No", "Body"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E009");
}

#[tokio::test]
async fn test_nested_care_written_with_camper() {
    let (storage, _dir) = create_temp_storage().await;

    let input = CamperInput {
        care: Some(care()),
        ..camper("Grace", "Hopper")
    };
    let created = storage.insert_camper(&input).await.unwrap();

    let record = storage
        .get_camper_with_care(created.id)
        .await
        .unwrap()
        .unwrap();
    let stored = record.care.expect("care data stored");
    assert_eq!(stored.delivery_method, Some(InsulinDelivery::Pump));
    assert_eq!(stored.carb_ratio, Some(12.5));
    assert!(input.matches(&record.camper, Some(&stored)));

    // care 为 None 的更新不动医疗档案
    storage
        .update_camper(created.id, &camper("Grace", "Hopper"))
        .await
        .unwrap();
    assert!(storage.get_care_data(created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_upsert_care_data() {
    let (storage, _dir) = create_temp_storage().await;
    let created = storage.insert_camper(&camper("Alan", "Turing")).await.unwrap();

    let first = storage.upsert_care_data(created.id, &care()).await.unwrap();
    assert_eq!(first.target_bg_high, Some(180));

    let second = storage
        .upsert_care_data(
            created.id,
            &CareDataInput {
                target_bg_high: Some(200),
                ..care()
            },
        )
        .await
        .unwrap();
    assert_eq!(second.target_bg_high, Some(200));
    assert_eq!(storage.list_care_data().await.unwrap().len(), 1);

    let err = storage.upsert_care_data(4242, &care()).await.unwrap_err();
    assert_eq!(err.code(), "E009");
}

#[tokio::test]
async fn test_delete_camper_removes_care_data() {
    let (storage, _dir) = create_temp_storage().await;
    let created = storage
        .insert_camper(&CamperInput {
            care: Some(care()),
            ..camper("Edsger", "Dijkstra")
        })
        .await
        .unwrap();

    storage.delete_camper(created.id).await.unwrap();
    assert!(storage.get_care_data(created.id).await.unwrap().is_none());
}

// =============================================================================
// Assignments
// =============================================================================

#[tokio::test]
async fn test_assignment_save_and_read() {
    let (storage, _dir) = create_temp_storage().await;
    let v = storage.insert_volunteer(&volunteer("Val")).await.unwrap();
    let a = storage.insert_camper(&camper("A", "One")).await.unwrap();
    let b = storage.insert_camper(&camper("B", "Two")).await.unwrap();

    assert_eq!(
        storage.get_assignment(v.id).await.unwrap(),
        Assignment::empty(v.id)
    );

    storage
        .save_assignment(&Assignment {
            volunteer_id: v.id,
            camper_ids: vec![a.id, b.id],
        })
        .await
        .unwrap();

    let stored = storage.get_assignment(v.id).await.unwrap();
    assert_eq!(stored.camper_ids, vec![a.id, b.id]);
    assert_eq!(storage.volunteer_ids_for_camper(b.id).await.unwrap(), vec![v.id]);
    assert_eq!(storage.list_assignments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_assignment_deletes_row() {
    let (storage, _dir) = create_temp_storage().await;
    let v = storage.insert_volunteer(&volunteer("Val")).await.unwrap();
    let a = storage.insert_camper(&camper("A", "One")).await.unwrap();

    storage
        .save_assignment(&Assignment {
            volunteer_id: v.id,
            camper_ids: vec![a.id],
        })
        .await
        .unwrap();
    storage.save_assignment(&Assignment::empty(v.id)).await.unwrap();

    assert!(storage.list_assignments().await.unwrap().is_empty());
    assert_eq!(storage.count_all().await.unwrap().assignments, 0);
}

#[tokio::test]
async fn test_delete_camper_strips_assignment_lists() {
    let (storage, _dir) = create_temp_storage().await;
    let v1 = storage.insert_volunteer(&volunteer("Val")).await.unwrap();
    let v2 = storage.insert_volunteer(&volunteer("Wes")).await.unwrap();
    let a = storage.insert_camper(&camper("A", "One")).await.unwrap();
    let b = storage.insert_camper(&camper("B", "Two")).await.unwrap();

    storage
        .save_assignment(&Assignment {
            volunteer_id: v1.id,
            camper_ids: vec![a.id, b.id],
        })
        .await
        .unwrap();
    storage
        .save_assignment(&Assignment {
            volunteer_id: v2.id,
            camper_ids: vec![a.id],
        })
        .await
        .unwrap();

    storage.delete_camper(a.id).await.unwrap();

    assert_eq!(storage.get_assignment(v1.id).await.unwrap().camper_ids, vec![b.id]);
    // 列表清空后整行删除
    assert_eq!(storage.list_assignments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_volunteer_removes_assignment() {
    let (storage, _dir) = create_temp_storage().await;
    let v = storage.insert_volunteer(&volunteer("Val")).await.unwrap();
    let a = storage.insert_camper(&camper("A", "One")).await.unwrap();
    storage
        .save_assignment(&Assignment {
            volunteer_id: v.id,
            camper_ids: vec![a.id],
        })
        .await
        .unwrap();

    assert!(storage.delete_volunteer(v.id).await.unwrap());
    assert!(storage.list_assignments().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_to_assignment_checks_references_in_one_step() {
    let (storage, _dir) = create_temp_storage().await;
    let v = storage.insert_volunteer(&volunteer("Val")).await.unwrap();
    let a = storage.insert_camper(&camper("A", "One")).await.unwrap();
    let b = storage.insert_camper(&camper("B", "Two")).await.unwrap();

    let outcome = storage.add_to_assignment(v.id, &[a.id, 999, 404]).await.unwrap();
    assert_eq!(outcome, AssignmentUpdate::CampersMissing(vec![404, 999]));
    assert!(storage.list_assignments().await.unwrap().is_empty());

    let outcome = storage.add_to_assignment(v.id + 50, &[a.id]).await.unwrap();
    assert_eq!(outcome, AssignmentUpdate::VolunteerMissing);

    let outcome = storage.add_to_assignment(v.id, &[b.id, a.id]).await.unwrap();
    assert_eq!(
        outcome,
        AssignmentUpdate::Applied {
            assignment: Assignment {
                volunteer_id: v.id,
                camper_ids: vec![a.id, b.id],
            },
            changed: true,
        }
    );

    let outcome = storage.add_to_assignment(v.id, &[a.id]).await.unwrap();
    assert!(matches!(outcome, AssignmentUpdate::Applied { changed: false, .. }));
}

#[tokio::test]
async fn test_remove_from_assignment() {
    let (storage, _dir) = create_temp_storage().await;
    let v = storage.insert_volunteer(&volunteer("Val")).await.unwrap();
    let a = storage.insert_camper(&camper("A", "One")).await.unwrap();
    storage.add_to_assignment(v.id, &[a.id]).await.unwrap();

    let outcome = storage.remove_from_assignment(v.id, a.id).await.unwrap();
    assert_eq!(
        outcome,
        AssignmentUpdate::Applied {
            assignment: Assignment::empty(v.id),
            changed: true,
        }
    );
    // 空列表删除该行
    assert!(storage.list_assignments().await.unwrap().is_empty());

    let outcome = storage.remove_from_assignment(v.id, a.id).await.unwrap();
    assert!(matches!(outcome, AssignmentUpdate::Applied { changed: false, .. }));

    let outcome = storage.remove_from_assignment(v.id + 50, a.id).await.unwrap();
    assert_eq!(outcome, AssignmentUpdate::VolunteerMissing);
}

// =============================================================================
// Bulk plans and counts
// =============================================================================

#[tokio::test]
async fn test_apply_volunteer_plan() {
    let (storage, _dir) = create_temp_storage().await;
    let keep = storage.insert_volunteer(&volunteer("Keep")).await.unwrap();
    let change = storage.insert_volunteer(&volunteer("Change")).await.unwrap();
    let drop = storage.insert_volunteer(&volunteer("Drop")).await.unwrap();

    let existing = storage.list_volunteers().await.unwrap();
    let incoming = vec![
        VolunteerInput::from_record(&keep),
        VolunteerInput {
            role: Some("nurse".to_string()),
            ..VolunteerInput::from_record(&change)
        },
        volunteer("New"),
    ];
    let plan = plan_sync(&existing, incoming, true).unwrap();
    assert_eq!(plan.deletes, vec![drop.id]);

    let created = storage.apply_volunteer_plan(&plan).await.unwrap();
    assert_eq!(created.len(), 1);

    let names: Vec<String> = storage
        .list_volunteers()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.first_name)
        .collect();
    assert_eq!(names, vec!["Keep", "Change", "New"]);
    assert_eq!(
        storage
            .get_volunteer(change.id)
            .await
            .unwrap()
            .unwrap()
            .role
            .as_deref(),
        Some("nurse")
    );
}

#[tokio::test]
async fn test_count_all() {
    let (storage, _dir) = create_temp_storage().await;
    storage.insert_camper(&camper("A", "One")).await.unwrap();
    storage.insert_camper(&camper("B", "Two")).await.unwrap();
    storage.insert_volunteer(&volunteer("Val")).await.unwrap();

    let counts = storage
        .count_all_within(std::time::Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(counts.campers, 2);
    assert_eq!(counts.volunteers, 1);
    assert_eq!(counts.assignments, 0);
}

#[tokio::test]
async fn test_list_campers_by_ids_ignores_unknown() {
    let (storage, _dir) = create_temp_storage().await;
    let a = storage.insert_camper(&camper("A", "One")).await.unwrap();

    let found = storage.list_campers_by_ids(&[a.id, 777]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(storage.list_campers_by_ids(&[]).await.unwrap().is_empty());
}
