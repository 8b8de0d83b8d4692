use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = crate::db::open_in_memory().unwrap();
    Arc::new(Mutex::new(conn))
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = ActionLog::new(
        ActionType::RecordEntry,
        "operator1",
        Some("C1"),
        Some("I1"),
        Some(serde_json::json!({"stitches": 10000.0, "machine_id": "X"})),
        "录入生产记录".to_string(),
    );
    let id = repo.insert(&log).unwrap();
    assert_eq!(id, log.action_id);

    let found = repo.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.action_type, "RECORD_ENTRY");
    assert_eq!(found.actor, "operator1");
    assert_eq!(found.item_id.as_deref(), Some("I1"));
    assert_eq!(found.action_ts, log.action_ts);
    assert_eq!(
        found.payload_json.unwrap()["machine_id"],
        serde_json::json!("X")
    );
}

#[test]
fn test_find_missing_returns_none() {
    let repo = ActionLogRepository::new(setup_test_db());
    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_find_by_contract_and_type() {
    let repo = ActionLogRepository::new(setup_test_db());

    for action in [ActionType::AddItem, ActionType::AddItem, ActionType::SaveAssignments] {
        repo.insert(&ActionLog::new(action, "u", Some("C1"), None, None, String::new()))
            .unwrap();
    }
    repo.insert(&ActionLog::new(ActionType::AddItem, "u", Some("C2"), None, None, String::new()))
        .unwrap();

    assert_eq!(repo.find_by_contract("C1", 10).unwrap().len(), 3);
    assert_eq!(repo.find_by_contract("C1", 2).unwrap().len(), 2);
    assert_eq!(repo.find_by_action_type("ADD_ITEM", 10).unwrap().len(), 3);
    assert_eq!(repo.find_recent(100).unwrap().len(), 4);
}
