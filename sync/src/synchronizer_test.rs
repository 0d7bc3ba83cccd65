use super::*;
use std::time::Duration;

fn test_config() -> SyncConfig {
    // Port 9 (discard) is not listening; direct fetches fail at connect.
    SyncConfig {
        backend_origin: "http://127.0.0.1:9".to_owned(),
        realtime_endpoint: "ws://127.0.0.1:9/channel".to_owned(),
        poll_interval: Duration::from_millis(50),
        page_size: 2,
    }
}

fn sender(id: &str, priority: u8) -> ThreadRecord {
    ThreadRecord {
        id: id.to_owned(),
        kind: ThreadKind::Sender,
        state: RunState::Running,
        priority,
    }
}

fn thread_push(topic: Topic, threads: &[ThreadRecord]) -> Frame {
    Frame::request(topic, Op::Push).with_data(serde_json::to_value(threads).expect("serialize"))
}

fn queue_push(page: u32, content: &[&str], total_pages: u32) -> Frame {
    Frame::request(Topic::QueuePage, Op::Push)
        .with_page(page)
        .with_data(serde_json::json!({ "content": content, "totalPages": total_pages }))
}

// =============================================================
// Construction
// =============================================================

#[test]
fn new_snapshot_starts_connecting_with_config_page_size() {
    let synchronizer = Synchronizer::new(test_config());
    let snapshot = synchronizer.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Connecting);
    assert_eq!(snapshot.page_size, 2);
    assert!(snapshot.senders.is_empty());
    assert!(snapshot.error.is_none());
}

#[test]
fn sessions_are_unique_per_instance() {
    let a = Synchronizer::new(test_config());
    let b = Synchronizer::new(test_config());
    assert_ne!(a.session(), b.session());
}

// =============================================================
// Thread pushes
// =============================================================

#[test]
fn thread_push_replaces_whole_collection() {
    let synchronizer = Synchronizer::new(test_config());
    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::SenderThreads, &[sender("7", 5), sender("8", 1)]),
    );
    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::SenderThreads, &[sender("7", 3)]),
    );

    let snapshot = synchronizer.snapshot();
    assert_eq!(snapshot.senders.len(), 1);
    assert_eq!(snapshot.senders[0].id, "7");
    assert_eq!(snapshot.senders[0].priority, 3);
}

#[test]
fn thread_push_targets_only_its_topic() {
    let synchronizer = Synchronizer::new(test_config());
    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::ReceiverThreads, &[sender("1", 5)]),
    );

    let snapshot = synchronizer.snapshot();
    assert!(snapshot.senders.is_empty());
    assert_eq!(snapshot.receivers.len(), 1);
}

#[test]
fn thread_push_clears_current_error() {
    let synchronizer = Synchronizer::new(test_config());
    lock(&synchronizer.ctx)
        .snapshot
        .record_error("stale error".to_owned());

    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::SenderThreads, &[sender("1", 5)]),
    );
    assert!(synchronizer.snapshot().error.is_none());
}

#[test]
fn malformed_thread_push_is_dropped() {
    let synchronizer = Synchronizer::new(test_config());
    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::SenderThreads, &[sender("1", 5)]),
    );

    let malformed =
        Frame::request(Topic::SenderThreads, Op::Push).with_data(serde_json::json!({"bad": true}));
    apply_push_frame(&synchronizer.ctx, &malformed);

    assert_eq!(synchronizer.snapshot().senders.len(), 1);
}

#[test]
fn non_push_frames_are_ignored() {
    let synchronizer = Synchronizer::new(test_config());
    let refresh = Frame::request(Topic::SenderThreads, Op::Refresh)
        .with_data(serde_json::json!([{"id": "1", "type": "SENDER", "state": "RUNNING", "priority": 1}]));
    apply_push_frame(&synchronizer.ctx, &refresh);
    assert!(synchronizer.snapshot().senders.is_empty());
}

// =============================================================
// Queue pushes
// =============================================================

#[test]
fn queue_push_applies_for_current_page() {
    let synchronizer = Synchronizer::new(test_config());
    let frame = queue_push(0, &["m1", "m2"], 3);
    apply_push_frame(&synchronizer.ctx, &frame);

    let snapshot = synchronizer.snapshot();
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.total_pages, 3);
    assert_eq!(snapshot.current_page, 0);
}

#[test]
fn queue_push_for_stale_page_is_discarded() {
    let synchronizer = Synchronizer::new(test_config());
    apply_push_frame(&synchronizer.ctx, &queue_push(0, &["m1"], 3));

    apply_push_frame(&synchronizer.ctx, &queue_push(2, &["m5"], 3));

    let snapshot = synchronizer.snapshot();
    assert_eq!(snapshot.messages, vec![serde_json::json!("m1")]);
    assert_eq!(snapshot.current_page, 0);
}

#[test]
fn queue_push_for_other_session_is_ignored() {
    let synchronizer = Synchronizer::new(test_config());
    let frame = queue_push(0, &["m1"], 1).with_session("someone-else");
    apply_push_frame(&synchronizer.ctx, &frame);
    assert!(synchronizer.snapshot().messages.is_empty());
}

#[test]
fn queue_push_for_own_session_applies() {
    let synchronizer = Synchronizer::new(test_config());
    let session = synchronizer.session().to_owned();
    let frame = queue_push(0, &["m1"], 1).with_session(&session);
    apply_push_frame(&synchronizer.ctx, &frame);
    assert_eq!(synchronizer.snapshot().messages.len(), 1);
}

#[test]
fn sessionless_queue_push_is_a_broadcast() {
    let synchronizer = Synchronizer::new(test_config());
    apply_push_frame(&synchronizer.ctx, &queue_push(0, &["m1"], 1));
    assert_eq!(synchronizer.snapshot().messages.len(), 1);
}

#[test]
fn queue_push_without_page_tag_is_dropped() {
    let synchronizer = Synchronizer::new(test_config());
    let frame = Frame::request(Topic::QueuePage, Op::Push)
        .with_data(serde_json::json!({ "content": ["m1"], "totalPages": 1 }));
    apply_push_frame(&synchronizer.ctx, &frame);
    assert!(synchronizer.snapshot().messages.is_empty());
}

// =============================================================
// Disposal
// =============================================================

#[test]
fn nothing_applies_after_dispose() {
    let synchronizer = Synchronizer::new(test_config());
    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::SenderThreads, &[sender("1", 5)]),
    );
    synchronizer.dispose();

    let mut updates = synchronizer.subscribe();
    updates.mark_unchanged();
    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::SenderThreads, &[sender("2", 5)]),
    );

    let snapshot = synchronizer.snapshot();
    assert_eq!(snapshot.senders.len(), 1);
    assert_eq!(snapshot.senders[0].id, "1");
    assert!(!updates.has_changed().expect("watch alive"));
}

#[test]
fn dispose_is_idempotent() {
    let synchronizer = Synchronizer::new(test_config());
    synchronizer.dispose();
    synchronizer.dispose();
}

// =============================================================
// Cursor movement against an unreachable backend
// =============================================================

#[tokio::test]
async fn set_page_clamps_to_zero_while_queue_is_unknown() {
    let synchronizer = Synchronizer::new(test_config());
    synchronizer.set_page(7).await;

    let snapshot = synchronizer.snapshot();
    assert_eq!(snapshot.current_page, 0);
    assert_eq!(
        snapshot.error.as_deref(),
        Some("failed to fetch message queue")
    );
}

#[tokio::test]
async fn set_page_clamps_into_known_page_range() {
    let synchronizer = Synchronizer::new(test_config());
    lock(&synchronizer.ctx).snapshot.total_pages = 3;

    synchronizer.set_page(9).await;
    assert_eq!(synchronizer.snapshot().current_page, 2);
}

#[tokio::test]
async fn mutation_failure_records_error_and_keeps_data() {
    let synchronizer = Synchronizer::new(test_config());
    apply_push_frame(
        &synchronizer.ctx,
        &thread_push(Topic::SenderThreads, &[sender("1", 5)]),
    );

    synchronizer.create_threads(1, 1).await;

    let snapshot = synchronizer.snapshot();
    assert_eq!(snapshot.error.as_deref(), Some("failed to create threads"));
    assert_eq!(snapshot.senders.len(), 1);
}
