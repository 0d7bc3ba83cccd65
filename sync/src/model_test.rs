use super::*;

fn record(id: &str, kind: ThreadKind) -> ThreadRecord {
    ThreadRecord {
        id: id.to_owned(),
        kind,
        state: RunState::Running,
        priority: 5,
    }
}

// =============================================================
// Serde shapes
// =============================================================

#[test]
fn thread_record_uses_backend_field_names() {
    let json = serde_json::json!({
        "id": "7",
        "type": "SENDER",
        "state": "RUNNING",
        "priority": 3
    });
    let parsed: ThreadRecord = serde_json::from_value(json).expect("deserialize");
    assert_eq!(parsed.id, "7");
    assert_eq!(parsed.kind, ThreadKind::Sender);
    assert_eq!(parsed.state, RunState::Running);
    assert_eq!(parsed.priority, 3);
}

#[test]
fn thread_record_serializes_type_field() {
    let text = serde_json::to_string(&record("1", ThreadKind::Receiver)).expect("serialize");
    assert!(text.contains("\"type\":\"RECEIVER\""));
    assert!(text.contains("\"state\":\"RUNNING\""));
}

#[test]
fn run_state_rejects_lowercase() {
    assert!(serde_json::from_str::<RunState>("\"running\"").is_err());
}

#[test]
fn run_state_wire_values() {
    assert_eq!(RunState::Running.as_str(), "RUNNING");
    assert_eq!(RunState::Stopped.as_str(), "STOPPED");
}

#[test]
fn thread_kind_labels() {
    assert_eq!(ThreadKind::Sender.label(), "sender");
    assert_eq!(ThreadKind::Receiver.label(), "receiver");
}

#[test]
fn queue_page_uses_camel_case_total_pages() {
    let json = serde_json::json!({
        "content": ["a", "b"],
        "totalPages": 4
    });
    let parsed: QueuePage = serde_json::from_value(json).expect("deserialize");
    assert_eq!(parsed.total_pages, 4);
    assert_eq!(parsed.content.len(), 2);
}

// =============================================================
// Snapshot defaults
// =============================================================

#[test]
fn snapshot_default_is_connecting_and_empty() {
    let snapshot = Snapshot::default();
    assert_eq!(snapshot.connection, ConnectionState::Connecting);
    assert!(snapshot.senders.is_empty());
    assert!(snapshot.receivers.is_empty());
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.error.is_none());
    assert_eq!(snapshot.current_page, 0);
    assert_eq!(snapshot.total_pages, 0);
}

// =============================================================
// replace_threads
// =============================================================

#[test]
fn replace_threads_swaps_only_the_named_collection() {
    let mut snapshot = Snapshot::default();
    snapshot.replace_threads(ThreadKind::Sender, vec![record("1", ThreadKind::Sender)]);
    snapshot.replace_threads(ThreadKind::Receiver, vec![record("2", ThreadKind::Receiver)]);

    snapshot.replace_threads(ThreadKind::Sender, vec![record("3", ThreadKind::Sender)]);
    assert_eq!(snapshot.senders.len(), 1);
    assert_eq!(snapshot.senders[0].id, "3");
    assert_eq!(snapshot.receivers[0].id, "2");
}

#[test]
fn replace_threads_keeps_server_order() {
    let mut snapshot = Snapshot::default();
    snapshot.replace_threads(
        ThreadKind::Sender,
        vec![record("b", ThreadKind::Sender), record("a", ThreadKind::Sender)],
    );
    let ids: Vec<&str> = snapshot.senders.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["b", "a"]);
}

// =============================================================
// apply_queue_page
// =============================================================

#[test]
fn apply_queue_page_replaces_content_and_total() {
    let mut snapshot = Snapshot::default();
    snapshot.apply_queue_page(QueuePage {
        content: vec![serde_json::json!("m1")],
        total_pages: 3,
    });
    assert_eq!(snapshot.messages, vec![serde_json::json!("m1")]);
    assert_eq!(snapshot.total_pages, 3);
}

#[test]
fn apply_queue_page_clamps_cursor_when_pages_shrink() {
    let mut snapshot = Snapshot {
        current_page: 5,
        total_pages: 6,
        ..Snapshot::default()
    };
    snapshot.apply_queue_page(QueuePage {
        content: vec![],
        total_pages: 2,
    });
    assert_eq!(snapshot.current_page, 1);
}

#[test]
fn apply_queue_page_resets_cursor_on_empty_queue() {
    let mut snapshot = Snapshot {
        current_page: 3,
        total_pages: 4,
        ..Snapshot::default()
    };
    snapshot.apply_queue_page(QueuePage::default());
    assert_eq!(snapshot.current_page, 0);
    assert_eq!(snapshot.total_pages, 0);
}

#[test]
fn apply_queue_page_keeps_in_range_cursor() {
    let mut snapshot = Snapshot {
        current_page: 1,
        total_pages: 4,
        ..Snapshot::default()
    };
    snapshot.apply_queue_page(QueuePage {
        content: vec![],
        total_pages: 4,
    });
    assert_eq!(snapshot.current_page, 1);
}

// =============================================================
// Errors
// =============================================================

#[test]
fn record_error_preserves_data() {
    let mut snapshot = Snapshot::default();
    snapshot.replace_threads(ThreadKind::Sender, vec![record("1", ThreadKind::Sender)]);
    snapshot.record_error("failed to fetch data".to_owned());
    assert_eq!(snapshot.error.as_deref(), Some("failed to fetch data"));
    assert_eq!(snapshot.senders.len(), 1);
}

#[test]
fn newer_error_replaces_older() {
    let mut snapshot = Snapshot::default();
    snapshot.record_error("first".to_owned());
    snapshot.record_error("second".to_owned());
    assert_eq!(snapshot.error.as_deref(), Some("second"));
}

#[test]
fn clear_error_resets_to_none() {
    let mut snapshot = Snapshot::default();
    snapshot.record_error("oops".to_owned());
    snapshot.clear_error();
    assert!(snapshot.error.is_none());
}
