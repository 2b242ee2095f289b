use super::AssignmentHistoryRepository;
use crate::domain::assignment_history::AssignmentHistoryEntry;
use crate::domain::types::AssignmentChangeType;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();

    conn.execute(
        r#"
        CREATE TABLE assignment_history (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            entry_id TEXT NOT NULL UNIQUE,
            round_id TEXT NOT NULL,
            product_id TEXT NOT NULL,
            change_type TEXT NOT NULL,
            previous_assignee TEXT,
            new_assignee TEXT,
            changed_by TEXT NOT NULL,
            reason TEXT,
            changed_at TEXT NOT NULL,
            payload_json TEXT
        )
        "#,
        [],
    )
    .unwrap();

    Arc::new(Mutex::new(conn))
}

fn make_entry(
    round_id: &str,
    product_id: &str,
    change_type: AssignmentChangeType,
    new_assignee: Option<&str>,
) -> AssignmentHistoryEntry {
    AssignmentHistoryEntry::new(
        round_id,
        product_id,
        change_type,
        None,
        new_assignee.map(|s| s.to_string()),
        "admin",
    )
}

#[test]
fn test_record_and_history_for_round() {
    let conn = setup_test_db();
    let repo = AssignmentHistoryRepository::new(conn);

    let entry = make_entry("r1", "p1", AssignmentChangeType::Initial, Some("rev-a"));
    let entry_id = repo.record(&entry).unwrap();
    assert_eq!(entry_id, entry.entry_id);

    let entries = repo.history_for_round("r1").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].product_id, "p1");
    assert_eq!(entries[0].new_assignee.as_deref(), Some("rev-a"));
    assert_eq!(entries[0].change_type, AssignmentChangeType::Initial);

    // 其他轮次查不到
    let other = repo.history_for_round("r2").unwrap();
    assert!(other.is_empty());
}

#[test]
fn test_same_second_entries_keep_insert_order() {
    let conn = setup_test_db();
    let repo = AssignmentHistoryRepository::new(conn);

    // 同一秒内的三条变更,时间戳完全相同
    let ts = NaiveDate::from_ymd_opt(2026, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();

    let mut first = make_entry("r1", "p1", AssignmentChangeType::Initial, Some("rev-a"));
    first.changed_at = ts;
    let mut second = make_entry("r1", "p1", AssignmentChangeType::Reassigned, Some("rev-b"));
    second.previous_assignee = Some("rev-a".to_string());
    second.changed_at = ts;
    let mut third = make_entry("r1", "p1", AssignmentChangeType::Removed, None);
    third.previous_assignee = Some("rev-b".to_string());
    third.changed_at = ts;

    repo.record(&first).unwrap();
    repo.record(&second).unwrap();
    repo.record(&third).unwrap();

    let entries = repo.history_for_round("r1").unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].entry_id, first.entry_id);
    assert_eq!(entries[1].entry_id, second.entry_id);
    assert_eq!(entries[2].entry_id, third.entry_id);

    // 按顺序回放应得到当前状态 (已取消分配)
    let mut current: Option<String> = None;
    for entry in &entries {
        current = entry.apply_to(current);
    }
    assert_eq!(current, None);
}

#[test]
fn test_history_for_product_filters_by_product() {
    let conn = setup_test_db();
    let repo = AssignmentHistoryRepository::new(conn);

    repo.record(&make_entry(
        "r1",
        "p1",
        AssignmentChangeType::Initial,
        Some("rev-a"),
    ))
    .unwrap();
    repo.record(&make_entry(
        "r1",
        "p2",
        AssignmentChangeType::Initial,
        Some("rev-b"),
    ))
    .unwrap();
    repo.record(&make_entry(
        "r1",
        "p1",
        AssignmentChangeType::Reassigned,
        Some("rev-c"),
    ))
    .unwrap();

    let p1_entries = repo.history_for_product("r1", "p1").unwrap();
    assert_eq!(p1_entries.len(), 2);
    assert!(p1_entries.iter().all(|e| e.product_id == "p1"));
    assert_eq!(p1_entries[1].new_assignee.as_deref(), Some("rev-c"));

    let p2_entries = repo.history_for_product("r1", "p2").unwrap();
    assert_eq!(p2_entries.len(), 1);
}

#[test]
fn test_batch_record_writes_all_entries() {
    let conn = setup_test_db();
    let repo = AssignmentHistoryRepository::new(conn);

    let entries: Vec<AssignmentHistoryEntry> = (1..=5)
        .map(|i| {
            make_entry(
                "r1",
                &format!("p{}", i),
                AssignmentChangeType::Initial,
                Some("rev-a"),
            )
        })
        .collect();

    let written = repo.batch_record(&entries).unwrap();
    assert_eq!(written, 5);
    assert_eq!(repo.count_by_round("r1").unwrap(), 5);

    // 空批次直接返回
    assert_eq!(repo.batch_record(&[]).unwrap(), 0);
}

#[test]
fn test_payload_json_survives_persistence() {
    let conn = setup_test_db();
    let repo = AssignmentHistoryRepository::new(conn);

    let entry = make_entry("r1", "p1", AssignmentChangeType::Initial, Some("rev-a"))
        .with_reason(Some("初次分配".to_string()))
        .with_payload(&serde_json::json!({
            "match_score": 3,
            "scope": "COMPANY",
        }));
    repo.record(&entry).unwrap();

    let entries = repo.history_for_round("r1").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason.as_deref(), Some("初次分配"));

    let payload = entries[0].payload_json.as_ref().expect("payload 应已持久化");
    assert_eq!(payload["match_score"], 3);
    assert_eq!(payload["scope"], "COMPANY");
}
