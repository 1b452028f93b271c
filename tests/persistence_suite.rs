use std::fs;

use rust_decimal_macros::dec;
use tempfile::tempdir;
use virement_core::{
    balances::{BalanceLookup, InMemoryBalances},
    errors::VirementError,
    ledger::{AccountKey, BudgetRequest, TransferItem, VirementType},
    utils::persistence::{load_request_from_file, save_request_to_file},
    workflow::WorkflowState,
};

fn sample_request() -> BudgetRequest {
    let mut request = BudgetRequest::inter("OPS", "CAPEX");
    request.add_item(TransferItem::new("Travel", "Vehicles", dec!(1250.50)));
    request.add_item(TransferItem::blank());
    request.workflow_state = WorkflowState::PendingApproval;
    request
}

#[test]
fn saved_request_reloads_with_rows_and_state() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("request.json");
    let request = sample_request();

    save_request_to_file(&request, &path).expect("save");
    assert!(!path.with_extension("tmp").exists());

    let loaded = load_request_from_file(&path).expect("load");
    assert_eq!(loaded.id, request.id);
    assert_eq!(loaded.virement_type, VirementType::InterBudget);
    assert_eq!(loaded.target_budget.as_deref(), Some("CAPEX"));
    assert_eq!(loaded.workflow_state, WorkflowState::PendingApproval);
    assert_eq!(loaded.items, request.items);
    assert_eq!(loaded.total_amount(), dec!(1250.50));
}

#[test]
fn saved_json_uses_display_labels() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("request.json");
    save_request_to_file(&sample_request(), &path).unwrap();

    let json = fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"Inter-Budget\""));
    assert!(json.contains("\"Pending Approval\""));
}

#[test]
fn minimal_json_fills_defaults() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("request.json");
    fs::write(&path, r#"{"budget": "OPS"}"#).unwrap();

    let loaded = load_request_from_file(&path).unwrap();
    assert_eq!(loaded.virement_type, VirementType::IntraBudget);
    assert_eq!(loaded.workflow_state, WorkflowState::Draft);
    assert!(loaded.items.is_empty());
    assert_eq!(loaded.schema_version, BudgetRequest::schema_version_default());
}

#[test]
fn malformed_json_is_a_serialization_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("request.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        load_request_from_file(&path),
        Err(VirementError::Serde(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let temp = tempdir().unwrap();
    assert!(matches!(
        load_request_from_file(&temp.path().join("absent.json")),
        Err(VirementError::Io(_))
    ));
}

#[test]
fn balances_snapshot_loads_per_budget() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("balances.json");
    fs::write(
        &path,
        r#"{"OPS": {"Travel": "1000", "Fuel": 400}, "CAPEX": {"Vehicles": "9000.25"}}"#,
    )
    .unwrap();

    let balances = InMemoryBalances::load_from_file(&path).unwrap();
    assert_eq!(
        balances.original_balance(&AccountKey::new("Fuel", "OPS")),
        Some(dec!(400))
    );
    assert_eq!(
        balances.original_balance(&AccountKey::new("Vehicles", "CAPEX")),
        Some(dec!(9000.25))
    );
    assert_eq!(balances.original_balance(&AccountKey::new("Fuel", "CAPEX")), None);
    assert_eq!(balances.accounts("OPS"), vec!["Fuel".to_string(), "Travel".to_string()]);
}
