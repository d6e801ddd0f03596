//! Tests for handler module

use std::time::Duration;

use serde_json::{json, Value};

use super::*;
use crate::config::Settings;
use crate::message::Message;
use crate::progress::OperationState;
use crate::state::{LoadState, NameValidation, NoticeLevel, PanelPhase, PanelState};
use crate::view::ViewSchema;
use panelkit_core::{ChangeRequestAction, HostEvent, PanelRequest, SortSpec};
use panelkit_host::test_utils::items;
use panelkit_host::{encode_event, DOWNLOAD_OPERATION};

fn new_state(view: &str) -> PanelState {
    PanelState::new(ViewSchema::builtin(view).unwrap(), &Settings::default())
}

fn set_data(view: &str, rows: Vec<Value>, total: u64, page: u32) -> Message {
    Message::Host(HostEvent::SetData {
        view: view.to_string(),
        items: items(rows),
        records_total: total,
        page_number: Some(page),
        page_size: None,
    })
}

/// Run a message and every follow-up, collecting the actions
fn run(state: &mut PanelState, message: Message) -> Vec<UpdateAction> {
    let mut actions = Vec::new();
    let mut next = Some(message);
    while let Some(msg) = next {
        let result = update(state, msg);
        actions.extend(result.action);
        next = result.message;
    }
    actions
}

fn sent(actions: &[UpdateAction]) -> Vec<&PanelRequest> {
    actions
        .iter()
        .filter_map(|a| match a {
            UpdateAction::Send(req) => Some(req),
            _ => None,
        })
        .collect()
}

fn loaded(view: &str, rows: Vec<Value>) -> PanelState {
    let mut state = new_state(view);
    run(&mut state, Message::Open);
    let total = rows.len() as u64;
    run(&mut state, set_data(view, rows, total, 1));
    state
}

fn notice_level(state: &PanelState) -> Option<NoticeLevel> {
    state.notice.as_ref().map(|n| n.level)
}

// ─────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────

#[test]
fn test_open_requests_first_dataset() {
    let mut state = new_state("DataObjects");
    let actions = run(&mut state, Message::Open);

    assert_eq!(state.load, LoadState::Loading);
    assert_eq!(
        sent(&actions),
        vec![&PanelRequest::WebviewReady {
            view: "DataObjects".into()
        }]
    );
    assert!(state.is_busy());
}

#[test]
fn test_second_open_is_suppressed_while_waiting() {
    let mut state = new_state("DataObjects");
    run(&mut state, Message::Open);
    assert!(sent(&run(&mut state, Message::Open)).is_empty());
}

#[test]
fn test_dataset_settles_ready_and_marks_loaded() {
    let mut state = new_state("Pages");
    run(&mut state, Message::Open);
    let actions = run(
        &mut state,
        set_data("Pages", vec![json!({"name": "CustomerList"})], 1, 1),
    );

    assert!(actions.is_empty());
    assert_eq!(state.load, LoadState::Loaded);
    assert_eq!(state.flights.in_flight_count(), 0);
    assert_eq!(state.visible.len(), 1);
    assert!(!state.is_busy());
}

#[test]
fn test_first_dataset_in_other_page_size_is_re_requested() {
    let mut state = new_state("CostForecast");
    run(&mut state, Message::Open);
    let actions = run(
        &mut state,
        Message::Host(HostEvent::SetData {
            view: "CostForecast".into(),
            items: vec![],
            records_total: 40,
            page_number: Some(1),
            page_size: Some(10),
        }),
    );
    let requests = sent(&actions);
    let PanelRequest::RequestPage { page, .. } = requests[0] else {
        panic!("expected page request");
    };
    assert_eq!(page.page_size, 500);
    assert_eq!(page.page_number, 1);

    // The reply in the requested size settles it
    let actions = run(
        &mut state,
        Message::Host(HostEvent::SetData {
            view: "CostForecast".into(),
            items: vec![],
            records_total: 40,
            page_number: Some(1),
            page_size: Some(500),
        }),
    );
    assert!(actions.is_empty());
    assert_eq!(state.pagination.total_pages(), 1);
}

#[test]
fn test_dataset_for_other_view_is_ignored() {
    let mut state = new_state("Pages");
    run(&mut state, Message::Open);
    run(&mut state, set_data("Workflows", vec![json!({"flowName": "A"})], 1, 1));
    assert_eq!(state.load, LoadState::Loading);
    assert!(state.items.is_empty());
}

#[test]
fn test_empty_dataset_is_confirmed_zero() {
    let state = loaded("Pages", vec![]);
    assert_eq!(state.load, LoadState::Loaded);
    assert_eq!(state.pagination.total_pages(), 1);
    assert!(!state.pagination.has_next());
    assert!(!state.pagination.has_prev());
}

#[test]
fn test_same_dataset_twice_gives_same_rows() {
    let rows = vec![json!({"name": "A"}), json!({"name": "B"})];
    let mut state = loaded("Pages", rows.clone());
    let before = state.visible.clone();
    run(&mut state, set_data("Pages", rows, 2, 1));
    assert_eq!(state.visible, before);
    assert_eq!(state.items.len(), 2);
}

#[test]
fn test_teardown_closes_and_stops_timer() {
    let mut state = loaded("Pages", vec![]);
    run(&mut state, Message::SetPage(1));
    let actions = run(&mut state, Message::Teardown);

    assert_eq!(actions, vec![UpdateAction::StopRefreshTimer]);
    assert_eq!(state.phase, PanelPhase::Closed);
    assert_eq!(state.flights.in_flight_count(), 0);
    assert!(run(&mut state, Message::SetPage(1)).is_empty());
}

// ─────────────────────────────────────────────────────────
// Inbound dispatch
// ─────────────────────────────────────────────────────────

#[test]
fn test_host_line_is_parsed_and_dispatched() {
    let mut state = new_state("Pages");
    run(&mut state, Message::Open);
    let line = encode_event(&HostEvent::SetData {
        view: "Pages".into(),
        items: items(vec![json!({"name": "A"})]),
        records_total: 1,
        page_number: Some(1),
        page_size: Some(10),
    });
    run(&mut state, Message::HostLine(line));
    assert_eq!(state.load, LoadState::Loaded);
}

#[test]
fn test_garbage_lines_are_dropped() {
    let mut state = loaded("Pages", vec![json!({"name": "A"})]);
    for line in [
        "not json",
        r#"{"nocommand": 1}"#,
        r#"{"command": "requestPagesPage", "pageNumber": 1}"#,
        r#"{"command": "somethingNew", "x": 1}"#,
    ] {
        assert!(run(&mut state, Message::HostLine(line.to_string())).is_empty());
    }
    assert_eq!(state.items.len(), 1);
    assert!(state.notice.is_none());
}

#[test]
fn test_untagged_completion_leaves_page_request_pending() {
    let mut state = loaded("Pages", vec![json!({"name": "A"})]);
    run(&mut state, Message::ExportCsv);
    run(&mut state, Message::SetPage(1));
    run(
        &mut state,
        Message::Host(HostEvent::OperationComplete { operation: None }),
    );
    assert!(!state.flights.is_in_flight("exportToCSV"));
    assert!(state.flights.is_in_flight("requestPagesPage"));
}

// ─────────────────────────────────────────────────────────
// Single flight
// ─────────────────────────────────────────────────────────

#[test]
fn test_page_requests_queue_latest() {
    let rows: Vec<Value> = (0..30).map(|i| json!({"name": format!("P{i}")})).collect();
    let mut state = new_state("Pages");
    run(&mut state, Message::Open);
    run(&mut state, set_data("Pages", rows[..10].to_vec(), 30, 1));

    assert_eq!(sent(&run(&mut state, Message::SetPage(2))).len(), 1);
    assert!(run(&mut state, Message::SetPage(3)).is_empty());
    assert!(run(&mut state, Message::SetPage(2)).is_empty());

    // Reply to the first request dispatches only the newest queued one
    let actions = run(&mut state, set_data("Pages", rows[10..20].to_vec(), 30, 2));
    let requests = sent(&actions);
    assert_eq!(requests.len(), 1);
    let PanelRequest::RequestPage { page, .. } = requests[0] else {
        panic!("expected page request");
    };
    assert_eq!(page.page_number, 2);
    assert!(state.flights.is_in_flight("requestPagesPage"));
}

#[test]
fn test_second_export_is_suppressed() {
    let mut state = loaded("Pages", vec![json!({"name": "A"})]);
    assert_eq!(sent(&run(&mut state, Message::ExportCsv)).len(), 1);
    assert!(sent(&run(&mut state, Message::ExportCsv)).is_empty());

    run(
        &mut state,
        Message::Host(HostEvent::CsvExportReady {
            csv_content: "name\nA\n".into(),
            filename: "Pages_20240101_000000.csv".into(),
        }),
    );
    assert_eq!(notice_level(&state), Some(NoticeLevel::Success));
    assert_eq!(
        state.last_export.as_ref().map(|e| e.content.as_str()),
        Some("name\nA\n")
    );
    assert_eq!(sent(&run(&mut state, Message::ExportCsv)).len(), 1);
}

// ─────────────────────────────────────────────────────────
// Table
// ─────────────────────────────────────────────────────────

#[test]
fn test_filter_is_local() {
    let mut state = loaded(
        "Pages",
        vec![json!({"name": "CustomerList"}), json!({"name": "OrderList"})],
    );
    let actions = run(
        &mut state,
        Message::ApplyFilter {
            column: "name".into(),
            needle: "cust".into(),
        },
    );
    assert!(actions.is_empty());
    assert_eq!(state.visible.len(), 1);
    assert_eq!(state.items.len(), 2);

    run(&mut state, Message::ClearFilter);
    assert_eq!(state.visible.len(), 2);
}

#[test]
fn test_filter_on_unknown_column_reports_error() {
    let mut state = loaded("Pages", vec![json!({"name": "A"})]);
    run(
        &mut state,
        Message::ApplyFilter {
            column: "nope".into(),
            needle: "x".into(),
        },
    );
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));
    assert_eq!(state.visible.len(), 1);
}

#[test]
fn test_local_sort_never_round_trips() {
    let mut state = loaded("Pages", vec![json!({"name": "b"}), json!({"name": "A"})]);
    let actions = run(
        &mut state,
        Message::Sort {
            column: "name".into(),
        },
    );
    assert!(actions.is_empty());
    assert_eq!(state.visible[0]["name"], "A");

    run(
        &mut state,
        Message::Sort {
            column: "name".into(),
        },
    );
    assert_eq!(state.visible[0]["name"], "b");
}

#[test]
fn test_host_sort_requests_first_page() {
    let mut state = loaded("DataObjects", vec![json!({"name": "Customer"})]);
    let actions = run(
        &mut state,
        Message::Sort {
            column: "propertyCount".into(),
        },
    );
    let requests = sent(&actions);
    let PanelRequest::RequestPage { page, .. } = requests[0] else {
        panic!("expected page request");
    };
    assert_eq!(page.page_number, 1);
    assert_eq!(page.sort, Some(SortSpec::ascending("propertyCount")));

    // Toggle is queued behind the outstanding request
    run(
        &mut state,
        Message::Sort {
            column: "propertyCount".into(),
        },
    );
    assert_eq!(state.sort, Some(SortSpec::descending("propertyCount")));
}

#[test]
fn test_paging_controls() {
    let mut state = new_state("Pages");
    run(&mut state, Message::Open);
    run(&mut state, set_data("Pages", vec![json!({"name": "A"})], 15, 1));

    assert!(run(&mut state, Message::PrevPage).is_empty());
    let actions = run(&mut state, Message::NextPage);
    let requests = sent(&actions);
    let PanelRequest::RequestPage { page, .. } = requests[0] else {
        panic!("expected page request");
    };
    assert_eq!(page.page_number, 2);
}

#[test]
fn test_set_page_is_clamped() {
    let mut state = loaded("Pages", vec![json!({"name": "A"})]);
    let actions = run(&mut state, Message::SetPage(40));
    let requests = sent(&actions);
    let PanelRequest::RequestPage { page, .. } = requests[0] else {
        panic!("expected page request");
    };
    assert_eq!(page.page_number, 1);
}

#[test]
fn test_selection_and_export_of_selected_rows() {
    let mut state = loaded(
        "Pages",
        vec![json!({"name": "A"}), json!({"name": "B"}), json!({"name": "C"})],
    );
    run(&mut state, Message::ToggleSelect("B".into()));
    run(&mut state, Message::ToggleSelect("C".into()));
    run(&mut state, Message::ToggleSelect("C".into()));

    let actions = run(&mut state, Message::ExportCsv);
    let requests = sent(&actions);
    let PanelRequest::ExportToCsv { items, export_type } = requests[0] else {
        panic!("expected export");
    };
    assert_eq!(export_type, "Pages");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "B");
}

#[test]
fn test_export_of_nothing_is_a_warning() {
    let mut state = loaded("Pages", vec![]);
    assert!(run(&mut state, Message::ExportCsv).is_empty());
    assert_eq!(notice_level(&state), Some(NoticeLevel::Warning));
}

// ─────────────────────────────────────────────────────────
// Name entry
// ─────────────────────────────────────────────────────────

#[test]
fn test_local_check_never_reaches_host() {
    let mut state = loaded("DataObjects", vec![]);
    let actions = run(&mut state, Message::NameInput("customer".into()));
    assert!(actions.is_empty());
    assert!(matches!(
        state.name_form.validation,
        NameValidation::Invalid(_)
    ));
    assert!(!state.submit_enabled());
}

#[test]
fn test_host_rejection_keeps_submit_disabled() {
    let mut state = loaded("Workflows", vec![]);
    let actions = run(&mut state, Message::NameInput("process".into()));
    assert_eq!(
        sent(&actions),
        vec![&PanelRequest::ValidateName {
            field: "flowName".into(),
            value: "process".into()
        }]
    );
    assert!(!state.submit_enabled());

    run(
        &mut state,
        Message::Host(HostEvent::NameValidation {
            is_valid: false,
            message: "Name must be in PascalCase format (e.g. Process)".into(),
        }),
    );
    assert!(matches!(
        state.name_form.validation,
        NameValidation::Rejected(ref m) if m.contains("PascalCase")
    ));
    assert!(!state.submit_enabled());
    assert!(state.name_form.message().is_some());
}

#[test]
fn test_verdict_for_old_input_is_ignored() {
    let mut state = loaded("Workflows", vec![]);
    run(&mut state, Message::NameInput("Approve".into()));
    assert!(run(&mut state, Message::NameInput("Approved".into())).is_empty());

    // Verdict for "Approve" arrives after the input moved on
    let actions = run(
        &mut state,
        Message::Host(HostEvent::NameValidation {
            is_valid: true,
            message: String::new(),
        }),
    );
    assert_eq!(state.name_form.validation, NameValidation::Pending);
    assert_eq!(
        sent(&actions),
        vec![&PanelRequest::ValidateName {
            field: "flowName".into(),
            value: "Approved".into()
        }]
    );

    run(
        &mut state,
        Message::Host(HostEvent::NameValidation {
            is_valid: false,
            message: "A workflow named 'Approved' already exists".into(),
        }),
    );
    assert!(matches!(
        state.name_form.validation,
        NameValidation::Rejected(_)
    ));
}

#[test]
fn test_submit_after_acceptance() {
    let mut state = loaded("DataObjects", vec![]);
    run(&mut state, Message::SubmitName);
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));

    run(&mut state, Message::NameInput("Shipment".into()));
    run(
        &mut state,
        Message::Host(HostEvent::NameValidation {
            is_valid: true,
            message: String::new(),
        }),
    );
    assert!(state.submit_enabled());

    let actions = run(&mut state, Message::SubmitName);
    assert_eq!(
        sent(&actions),
        vec![&PanelRequest::AddItem {
            view: "DataObjects".into(),
            field: "name".into(),
            name: "Shipment".into()
        }]
    );
    assert!(state.cache_stale);
    assert!(!state.submit_enabled());

    run(
        &mut state,
        Message::Host(HostEvent::complete("addDataObjectsItem")),
    );
    assert_eq!(state.name_form.input, "");
    assert_eq!(state.name_form.validation, NameValidation::Idle);
}

#[test]
fn test_model_validation_error_rejects_name() {
    let mut state = loaded("DataObjects", vec![]);
    run(
        &mut state,
        Message::Host(HostEvent::ModelValidationSetError {
            message: "A data object named 'Customer' already exists".into(),
        }),
    );
    assert!(matches!(
        state.name_form.validation,
        NameValidation::Rejected(_)
    ));
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));
}

// ─────────────────────────────────────────────────────────
// Change requests
// ─────────────────────────────────────────────────────────

fn change_requests() -> PanelState {
    loaded(
        "ChangeRequests",
        vec![
            json!({"RequestCode": "REQ-001", "Code": "CR1", "Status": "Pending"}),
            json!({"RequestCode": "REQ-001", "Code": "CR2", "Status": "Approved"}),
        ],
    )
}

#[test]
fn test_review_uses_row_request_code() {
    let mut state = change_requests();
    let actions = run(
        &mut state,
        Message::ReviewChangeRequest {
            action: ChangeRequestAction::Reject,
            code: "CR1".into(),
            reason: Some("Not needed".into()),
        },
    );
    assert_eq!(
        sent(&actions),
        vec![&PanelRequest::ChangeRequest {
            action: ChangeRequestAction::Reject,
            request_code: "REQ-001".into(),
            code: "CR1".into(),
            reason: Some("Not needed".into())
        }]
    );
    assert!(state.cache_stale);
}

#[test]
fn test_review_of_unknown_row_is_an_error() {
    let mut state = change_requests();
    let actions = run(
        &mut state,
        Message::ReviewChangeRequest {
            action: ChangeRequestAction::Approve,
            code: "CR9".into(),
            reason: None,
        },
    );
    assert!(actions.is_empty());
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));
}

#[test]
fn test_conflict_is_a_warning() {
    let mut state = change_requests();
    run(
        &mut state,
        Message::Host(HostEvent::ChangeRequestConflict {
            code: "CR3".into(),
            reason: panelkit_core::STALE_DATA_REASON.into(),
        }),
    );
    let notice = state.notice.as_ref().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.text.contains("CR3"));
}

#[test]
fn test_operation_error_leaves_data_untouched() {
    let mut state = change_requests();
    run(
        &mut state,
        Message::ReviewChangeRequest {
            action: ChangeRequestAction::Apply,
            code: "CR2".into(),
            reason: None,
        },
    );
    run(
        &mut state,
        Message::Host(HostEvent::error_for(
            "applyChangeRequest",
            "Path not found in model: objects[9].name",
        )),
    );
    run(
        &mut state,
        Message::Host(HostEvent::complete("applyChangeRequest")),
    );

    let notice = state.notice.as_ref().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.text, "Path not found in model: objects[9].name");
    assert_eq!(state.items.len(), 2);
    assert_eq!(state.load, LoadState::Loaded);
    assert!(!state.flights.is_in_flight("applyChangeRequest"));
}

#[test]
fn test_load_error_marks_panel_failed() {
    let mut state = new_state("Pages");
    run(&mut state, Message::Open);
    run(
        &mut state,
        Message::Host(HostEvent::error_for("pagesWebviewReady", "Model file missing")),
    );
    assert_eq!(state.load, LoadState::Failed("Model file missing".into()));
    run(
        &mut state,
        Message::Host(HostEvent::complete("pagesWebviewReady")),
    );
    assert!(!state.is_busy());
}

#[test]
fn test_failed_page_keeps_queued_follow_up_single() {
    let rows: Vec<Value> = (0..40).map(|i| json!({"name": format!("P{i}")})).collect();
    let mut state = new_state("DataObjects");
    run(&mut state, Message::Open);
    run(&mut state, set_data("DataObjects", rows[..10].to_vec(), 40, 1));

    assert_eq!(sent(&run(&mut state, Message::SetPage(2))).len(), 1);
    // Queued behind page 2
    assert!(sent(&run(&mut state, Message::SetPage(3))).is_empty());

    // The error alone keeps page 2 outstanding
    let actions = run(
        &mut state,
        Message::Host(HostEvent::error_for("requestDataObjectsPage", "Model busy")),
    );
    assert!(sent(&actions).is_empty());
    assert!(state.flights.is_in_flight("requestDataObjectsPage"));

    // Its completion releases page 3, which is then the one in flight
    let actions = run(
        &mut state,
        Message::Host(HostEvent::complete("requestDataObjectsPage")),
    );
    let requests = sent(&actions);
    assert_eq!(requests.len(), 1);
    let PanelRequest::RequestPage { page, .. } = requests[0] else {
        panic!("expected page request");
    };
    assert_eq!(page.page_number, 3);
    assert!(state.flights.is_in_flight("requestDataObjectsPage"));

    // Another click while page 3 is outstanding is only queued
    assert!(sent(&run(&mut state, Message::SetPage(4))).is_empty());
}

#[test]
fn test_failed_name_check_sends_queued_check_on_completion() {
    let mut state = loaded("Workflows", vec![]);
    run(&mut state, Message::NameInput("Approve".into()));
    run(&mut state, Message::NameInput("ApproveOrder".into()));

    let actions = run(
        &mut state,
        Message::Host(HostEvent::error_for("validateName", "Model not loaded")),
    );
    assert!(sent(&actions).is_empty());
    assert!(state.flights.is_in_flight("validateName"));

    let actions = run(&mut state, Message::Host(HostEvent::complete("validateName")));
    assert_eq!(sent(&actions).len(), 1);
    assert_eq!(state.name_form.checking.as_deref(), Some("ApproveOrder"));

    run(
        &mut state,
        Message::Host(HostEvent::NameValidation {
            is_valid: true,
            message: String::new(),
        }),
    );
    assert_eq!(state.name_form.validation, NameValidation::Valid);
}

// ─────────────────────────────────────────────────────────
// Fabrication
// ─────────────────────────────────────────────────────────

fn fabrication(rows: Vec<Value>) -> PanelState {
    loaded("FabricationRequests", rows)
}

#[test]
fn test_cancel_only_while_queued() {
    let mut state = fabrication(vec![
        json!({"code": "FR-0001", "status": "Queued"}),
        json!({"code": "FR-0002", "status": "Processing"}),
    ]);
    assert!(run(
        &mut state,
        Message::CancelFabrication {
            code: "FR-0002".into()
        }
    )
    .is_empty());
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));

    let actions = run(
        &mut state,
        Message::CancelFabrication {
            code: "FR-0001".into(),
        },
    );
    assert_eq!(
        sent(&actions),
        vec![&PanelRequest::CancelFabricationRequest {
            code: "FR-0001".into()
        }]
    );
}

#[test]
fn test_add_fabrication_requires_description() {
    let mut state = fabrication(vec![]);
    assert!(run(
        &mut state,
        Message::AddFabricationRequest {
            description: "  ".into()
        }
    )
    .is_empty());
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));
}

#[test]
fn test_download_progress_lifecycle() {
    let mut state = fabrication(vec![json!({"code": "FR-0001", "status": "Completed"})]);
    let actions = run(
        &mut state,
        Message::DownloadResults {
            code: "FR-0001".into(),
        },
    );
    assert_eq!(sent(&actions).len(), 1);
    assert_eq!(state.operation.state(), &OperationState::Started);

    let progress = |phase: &str, percent: f64| {
        Message::Host(HostEvent::Progress {
            operation: DOWNLOAD_OPERATION.into(),
            phase: phase.into(),
            percent,
            step: format!("{phase} {percent}"),
        })
    };
    run(&mut state, progress("download", 50.0));
    run(&mut state, progress("download", 25.0));
    assert_eq!(state.operation.percent(), Some(50.0));
    run(&mut state, progress("download", 100.0));
    run(&mut state, progress("extract", 0.0));
    assert_eq!(state.operation.percent(), Some(0.0));

    run(
        &mut state,
        Message::Host(HostEvent::Completed {
            operation: DOWNLOAD_OPERATION.into(),
            message: Some("Results extracted".into()),
        }),
    );
    assert!(matches!(
        state.operation.state(),
        OperationState::Completed { .. }
    ));
    assert!(!state.flights.is_in_flight(DOWNLOAD_OPERATION));
    assert_eq!(notice_level(&state), Some(NoticeLevel::Success));
}

#[test]
fn test_download_failure_shows_host_message() {
    let mut state = fabrication(vec![json!({"code": "FR-0001", "status": "Completed"})]);
    run(
        &mut state,
        Message::DownloadResults {
            code: "FR-0001".into(),
        },
    );
    run(
        &mut state,
        Message::Host(HostEvent::error_for(DOWNLOAD_OPERATION, "Archive is corrupt")),
    );
    run(
        &mut state,
        Message::Host(HostEvent::complete(DOWNLOAD_OPERATION)),
    );
    assert_eq!(
        state.operation.state(),
        &OperationState::Failed {
            message: "Archive is corrupt".into()
        }
    );
    // Retry is possible again
    assert_eq!(
        sent(&run(
            &mut state,
            Message::DownloadResults {
                code: "FR-0001".into()
            }
        ))
        .len(),
        1
    );
}

#[test]
fn test_download_requires_completed_job() {
    let mut state = fabrication(vec![json!({"code": "FR-0001", "status": "Queued"})]);
    assert!(run(
        &mut state,
        Message::DownloadResults {
            code: "FR-0001".into()
        }
    )
    .is_empty());
    assert_eq!(state.operation.state(), &OperationState::Idle);
}

// ─────────────────────────────────────────────────────────
// Auto-refresh
// ─────────────────────────────────────────────────────────

#[test]
fn test_refresh_arms_while_jobs_pending_and_disarms_after() {
    let mut state = new_state("FabricationRequests");
    run(&mut state, Message::Open);
    let actions = run(
        &mut state,
        set_data(
            "FabricationRequests",
            vec![json!({"code": "FR-0001", "status": "Queued"})],
            1,
            1,
        ),
    );
    assert!(matches!(
        actions.as_slice(),
        [UpdateAction::StartRefreshTimer { .. }]
    ));

    // Tick resends the page, and a second tick waits for its reply
    assert_eq!(sent(&run(&mut state, Message::RefreshTick)).len(), 1);
    assert!(run(&mut state, Message::RefreshTick).is_empty());

    let actions = run(
        &mut state,
        set_data(
            "FabricationRequests",
            vec![json!({"code": "FR-0001", "status": "Completed"})],
            1,
            1,
        ),
    );
    assert_eq!(actions, vec![UpdateAction::StopRefreshTimer]);
    assert!(run(&mut state, Message::RefreshTick).is_empty());
}

#[test]
fn test_views_without_jobs_never_poll() {
    let mut state = loaded("Pages", vec![json!({"name": "A", "status": "Queued"})]);
    assert!(!state.refresh.is_armed());
    assert!(run(&mut state, Message::RefreshTick).is_empty());
}

// ─────────────────────────────────────────────────────────
// Timeouts
// ─────────────────────────────────────────────────────────

#[test]
fn test_unanswered_load_times_out() {
    let mut state = new_state("Pages");
    state.request_timeout = Some(Duration::ZERO);
    run(&mut state, Message::Open);
    run(&mut state, Message::Tick);

    assert!(matches!(state.load, LoadState::Failed(ref m) if m.contains("timed out")));
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));
    assert!(!state.is_busy());
}

#[test]
fn test_timeout_disabled_waits_forever() {
    let mut state = new_state("Pages");
    state.request_timeout = None;
    run(&mut state, Message::Open);
    run(&mut state, Message::Tick);
    assert_eq!(state.load, LoadState::Loading);
}

#[test]
fn test_timed_out_name_check_resets_form() {
    let mut state = loaded("Workflows", vec![]);
    state.request_timeout = Some(Duration::ZERO);
    run(&mut state, Message::NameInput("Approve".into()));
    run(&mut state, Message::Tick);
    assert_eq!(state.name_form.validation, NameValidation::Idle);
    assert!(!state.flights.is_in_flight("validateName"));
}

// ─────────────────────────────────────────────────────────
// Story mapping
// ─────────────────────────────────────────────────────────

fn stories() -> PanelState {
    loaded(
        "UserStories",
        vec![
            json!({"storyCode": "US-1", "storyText": "As a Manager, I want to add a customer"}),
            json!({"storyCode": "US-2", "storyText": "Customers should be addable"}),
        ],
    )
}

#[test]
fn test_suggestion_is_never_sent() {
    let mut state = stories();
    let actions = run(
        &mut state,
        Message::SuggestPageForStory {
            story_code: "US-1".into(),
        },
    );
    assert!(actions.is_empty());
    let story = state.story.as_ref().unwrap();
    assert_eq!(story.page_name, "CustomerAdd");
    assert_eq!(story.parts.role, "Manager");
}

#[test]
fn test_unparsed_story_gives_empty_suggestion() {
    let mut state = stories();
    run(
        &mut state,
        Message::SuggestPageForStory {
            story_code: "US-2".into(),
        },
    );
    assert_eq!(state.story.as_ref().unwrap().page_name, "");
    assert_eq!(notice_level(&state), Some(NoticeLevel::Info));

    // Confirming nothing fails
    assert!(run(&mut state, Message::ConfirmStoryMapping { page_name: None }).is_empty());
    assert_eq!(notice_level(&state), Some(NoticeLevel::Error));
}

#[test]
fn test_confirm_sends_suggestion_or_override() {
    let mut state = stories();
    run(
        &mut state,
        Message::SuggestPageForStory {
            story_code: "US-1".into(),
        },
    );
    let actions = run(
        &mut state,
        Message::ConfirmStoryMapping {
            page_name: Some("customer add".into()),
        },
    );
    assert!(actions.is_empty());
    assert!(state.story.is_some());

    let actions = run(
        &mut state,
        Message::ConfirmStoryMapping {
            page_name: Some("NewCustomer".into()),
        },
    );
    assert_eq!(
        sent(&actions),
        vec![&PanelRequest::SaveStoryPageMapping {
            story_code: "US-1".into(),
            page_name: "NewCustomer".into()
        }]
    );
    assert!(state.story.is_none());
}

#[test]
fn test_dismiss_notice() {
    let mut state = loaded("Pages", vec![]);
    run(&mut state, Message::ExportCsv);
    assert!(state.notice.is_some());
    run(&mut state, Message::DismissNotice);
    assert!(state.notice.is_none());
}
