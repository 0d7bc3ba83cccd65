//! The live-data synchronizer.
//!
//! DESIGN
//! ======
//! One synchronizer instance owns the three feeds for one mounted view.
//! `initialize` resolves the delivery mode once per session: the realtime
//! channel if the handshake succeeds, fixed-interval polling otherwise. A
//! degraded session never promotes back to the channel. Consumers observe
//! state through a watch channel of [`Snapshot`] values and drive
//! mutations through the operations below.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures never escape an operation: they are recorded as the
//! snapshot's current error while previously fetched data is kept. A later
//! success clears the error. The channel-handshake failure is informational
//! only; it switches the session to polling.

#[cfg(test)]
#[path = "synchronizer_test.rs"]
mod synchronizer_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use wire::{Frame, Op, Topic};

use crate::api::ApiClient;
use crate::channel::{Channel, ChannelEvent};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::feed::FeedMode;
use crate::model::{ConnectionState, QueuePage, RunState, Snapshot, ThreadKind, ThreadRecord};

/// Mutable core. Locked briefly, never across an await.
struct Shared {
    snapshot: Snapshot,
    mode: FeedMode,
    disposed: bool,
    updates: watch::Sender<Snapshot>,
}

impl Shared {
    /// Push the current snapshot to subscribers. Silent after disposal.
    fn publish(&self) {
        if !self.disposed {
            let _ = self.updates.send(self.snapshot.clone());
        }
    }

    /// Queue a frame on the realtime channel, if one is active.
    fn send_frame(&self, frame: Frame) {
        if let FeedMode::Push(channel) = &self.mode {
            if !channel.send(frame) {
                tracing::warn!("realtime channel handle closed");
            }
        }
    }
}

/// Handles shared between the synchronizer and its background tasks.
#[derive(Clone)]
struct Ctx {
    shared: Arc<Mutex<Shared>>,
    api: ApiClient,
    config: SyncConfig,
    session: String,
}

/// Client-side synchronizer for the sender/receiver dashboard.
///
/// Create one per mounted view, call [`initialize`](Self::initialize)
/// once, and call [`dispose`](Self::dispose) when the view unmounts;
/// background tasks stop reporting the moment disposal begins.
pub struct Synchronizer {
    ctx: Ctx,
    updates: watch::Receiver<Snapshot>,
}

impl Synchronizer {
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        let api = ApiClient::new(&config.backend_origin);
        let snapshot = Snapshot {
            page_size: config.page_size,
            ..Snapshot::default()
        };
        let (tx, rx) = watch::channel(snapshot.clone());
        let shared = Shared {
            snapshot,
            mode: FeedMode::Connecting,
            disposed: false,
            updates: tx,
        };
        Self {
            ctx: Ctx {
                shared: Arc::new(Mutex::new(shared)),
                api,
                config,
                session: uuid::Uuid::new_v4().to_string(),
            },
            updates: rx,
        }
    }

    /// Opaque identity correlating this session's channel requests.
    #[must_use]
    pub fn session(&self) -> &str {
        &self.ctx.session
    }

    /// Current state value.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.updates.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.updates.clone()
    }

    /// Kick off backend thread lifecycles, then resolve the delivery mode:
    /// realtime channel if the handshake succeeds, polling otherwise. In
    /// the polling case all three feeds are fetched before this returns.
    pub async fn initialize(&self) {
        if let Err(error) = self.ctx.api.start_lifecycles().await {
            tracing::warn!(%error, "thread lifecycle start failed");
            let mut shared = lock(&self.ctx);
            shared
                .snapshot
                .record_error("failed to start thread lifecycles".to_owned());
            shared.publish();
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        match Channel::connect(&self.ctx.config.realtime_endpoint, events_tx).await {
            Ok(channel) => go_live(&self.ctx, channel, events_rx),
            Err(error) => {
                tracing::info!(%error, "realtime channel unavailable, falling back to polling");
                degrade(
                    &self.ctx,
                    "realtime channel unavailable; falling back to polling",
                )
                .await;
            }
        }
    }

    /// Create sender and receiver threads in parallel, then re-sync both
    /// collections. Amounts of zero are passed through to the backend.
    pub async fn create_threads(&self, senders: u32, receivers: u32) {
        let result = self.ctx.api.create_threads(senders, receivers).await;
        finish_mutation(&self.ctx, result, "failed to create threads").await;
    }

    /// Update one thread's run state, then re-sync both collections.
    pub async fn update_thread_state(&self, thread: &ThreadRecord, state: RunState) {
        let result = self
            .ctx
            .api
            .update_thread_state(thread.kind, &thread.id, state)
            .await;
        finish_mutation(&self.ctx, result, "failed to update thread state").await;
    }

    /// Update one thread's priority, then re-sync both collections.
    pub async fn update_thread_priority(&self, thread: &ThreadRecord, priority: u8) {
        let result = self
            .ctx
            .api
            .update_thread_priority(thread.kind, &thread.id, priority)
            .await;
        finish_mutation(&self.ctx, result, "failed to update thread priority").await;
    }

    /// Delete one thread, then re-sync both collections.
    pub async fn delete_thread(&self, thread: &ThreadRecord) {
        let result = self.ctx.api.delete_thread(thread.kind, &thread.id).await;
        finish_mutation(&self.ctx, result, "failed to delete thread").await;
    }

    /// Delete every thread of `kind`, then re-sync both collections.
    pub async fn delete_all_threads(&self, kind: ThreadKind) {
        let result = self.ctx.api.delete_all_threads(kind).await;
        let failure = format!("failed to delete {} threads", kind.label());
        finish_mutation(&self.ctx, result, &failure).await;
    }

    /// Move the queue cursor to `page` and request that page's content.
    ///
    /// The cursor moves immediately; content follows when the response
    /// tagged with this page arrives. Requests are page-tagged so a slow
    /// response for a superseded page is discarded instead of overwriting
    /// newer data. Out-of-range pages are clamped once the page count is
    /// known.
    pub async fn set_page(&self, page: u32) {
        let direct_fetch = {
            let mut shared = lock(&self.ctx);
            if shared.disposed {
                return;
            }
            let total = shared.snapshot.total_pages;
            let page = if total > 0 { page.min(total - 1) } else { 0 };
            shared.snapshot.current_page = page;
            shared.publish();
            if shared.mode.is_live() {
                let frame = Frame::request(Topic::QueuePage, Op::Page)
                    .with_session(&self.ctx.session)
                    .with_page(page)
                    .with_data(serde_json::json!({ "size": self.ctx.config.page_size }));
                shared.send_frame(frame);
                None
            } else {
                Some(page)
            }
        };

        if let Some(page) = direct_fetch {
            fetch_queue_page(&self.ctx, page).await;
        }
    }

    /// Tear the session down: notify the channel with the session identity
    /// if still connected, close it, and stop any poll task. No state is
    /// published after this returns; late responses are ignored.
    pub fn dispose(&self) {
        let mut shared = lock(&self.ctx);
        if shared.disposed {
            return;
        }
        shared.disposed = true;
        if shared.mode.is_live() {
            shared.send_frame(Frame::unsubscribe(&self.ctx.session));
        }
        shared.mode.replace(FeedMode::Connecting);
        tracing::debug!(session = %self.ctx.session, "synchronizer disposed");
    }
}

fn lock(ctx: &Ctx) -> MutexGuard<'_, Shared> {
    ctx.shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Install the realtime channel: subscribe state, prime all three feeds
/// over the channel, and start the inbound event pump.
fn go_live(ctx: &Ctx, channel: Channel, events: mpsc::UnboundedReceiver<ChannelEvent>) {
    let mut shared = lock(ctx);
    if shared.disposed {
        channel.close();
        return;
    }
    shared.mode.replace(FeedMode::Push(channel));
    shared.snapshot.connection = ConnectionState::Live;

    let session = ctx.session.as_str();
    shared.send_frame(Frame::request(Topic::SenderThreads, Op::Refresh).with_session(session));
    shared.send_frame(Frame::request(Topic::ReceiverThreads, Op::Refresh).with_session(session));
    shared.send_frame(
        Frame::request(Topic::QueuePage, Op::Page)
            .with_session(session)
            .with_page(shared.snapshot.current_page)
            .with_data(serde_json::json!({ "size": ctx.config.page_size })),
    );
    shared.publish();

    tokio::spawn(run_push_events(ctx.clone(), events));
    tracing::info!(session = %ctx.session, "realtime channel live");
}

/// Switch the session to polling: record the informational error, start
/// the interval task, and fetch all three feeds right away.
async fn degrade(ctx: &Ctx, note: &str) {
    {
        let mut shared = lock(ctx);
        if shared.disposed {
            return;
        }
        shared.snapshot.connection = ConnectionState::Degraded;
        shared.snapshot.record_error(note.to_owned());
        shared.mode.replace(FeedMode::Poll(tokio::spawn(run_poll_feed(ctx.clone()))));
        shared.publish();
    }

    // The poll task waits a full interval before its first tick; the
    // initial fetch happens here, immediately.
    fetch_all(ctx).await;
}

async fn run_poll_feed(ctx: Ctx) {
    loop {
        tokio::time::sleep(ctx.config.poll_interval).await;
        fetch_all(&ctx).await;
    }
}

/// Pump inbound channel events until the socket goes away.
async fn run_push_events(ctx: Ctx, mut events: mpsc::UnboundedReceiver<ChannelEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ChannelEvent::Frame(frame) => apply_push_frame(&ctx, &frame),
            ChannelEvent::Closed => {
                if lock(&ctx).disposed {
                    return;
                }
                tracing::warn!("realtime channel lost, falling back to polling");
                degrade(&ctx, "realtime channel lost; falling back to polling").await;
                return;
            }
        }
    }
}

/// Apply one server push to the snapshot. Stale or misaddressed frames
/// are dropped; malformed payloads are logged and dropped.
fn apply_push_frame(ctx: &Ctx, frame: &Frame) {
    if frame.op != Op::Push {
        return;
    }
    let Some(topic) = frame.topic else {
        return;
    };

    let mut shared = lock(ctx);
    if shared.disposed {
        return;
    }

    match topic {
        Topic::SenderThreads | Topic::ReceiverThreads => {
            match serde_json::from_value::<Vec<ThreadRecord>>(frame.data.clone()) {
                Ok(threads) => {
                    let kind = if topic == Topic::SenderThreads {
                        ThreadKind::Sender
                    } else {
                        ThreadKind::Receiver
                    };
                    shared.snapshot.replace_threads(kind, threads);
                    shared.snapshot.clear_error();
                    shared.publish();
                }
                Err(error) => {
                    tracing::warn!(%error, topic = topic.as_str(), "dropping malformed push payload");
                }
            }
        }
        Topic::QueuePage => {
            // Queue pushes are session-addressed; ignore other sessions'.
            if frame
                .session
                .as_deref()
                .is_some_and(|session| session != ctx.session)
            {
                return;
            }
            let Some(page) = frame.page else {
                tracing::warn!("dropping queue push without page tag");
                return;
            };
            if page != shared.snapshot.current_page {
                tracing::debug!(
                    page,
                    current = shared.snapshot.current_page,
                    "discarding stale queue page"
                );
                return;
            }
            match serde_json::from_value::<QueuePage>(frame.data.clone()) {
                Ok(queue) => {
                    shared.snapshot.apply_queue_page(queue);
                    shared.snapshot.clear_error();
                    shared.publish();
                }
                Err(error) => {
                    tracing::warn!(%error, "dropping malformed queue payload");
                }
            }
        }
    }
}

/// Fetch all three feeds jointly and apply them as a unit.
async fn fetch_all(ctx: &Ctx) {
    let page = {
        let shared = lock(ctx);
        if shared.disposed {
            return;
        }
        shared.snapshot.current_page
    };

    let result = tokio::try_join!(
        ctx.api.fetch_sender_threads(),
        ctx.api.fetch_receiver_threads(),
        ctx.api.fetch_queue_page(page, ctx.config.page_size),
    );

    let mut shared = lock(ctx);
    if shared.disposed {
        return;
    }
    match result {
        Ok((senders, receivers, queue)) => {
            shared.snapshot.senders = senders;
            shared.snapshot.receivers = receivers;
            // The cursor may have moved while this fetch was in flight; a
            // stale page must not overwrite the newer request's data.
            if page == shared.snapshot.current_page {
                shared.snapshot.apply_queue_page(queue);
            }
            shared.snapshot.clear_error();
        }
        Err(error) => {
            tracing::warn!(%error, "feed fetch failed");
            shared
                .snapshot
                .record_error("failed to fetch data; is the backend running?".to_owned());
        }
    }
    shared.publish();
}

/// Fetch both thread collections jointly and apply them as a unit.
async fn fetch_threads(ctx: &Ctx) {
    let result = tokio::try_join!(
        ctx.api.fetch_sender_threads(),
        ctx.api.fetch_receiver_threads(),
    );

    let mut shared = lock(ctx);
    if shared.disposed {
        return;
    }
    match result {
        Ok((senders, receivers)) => {
            shared.snapshot.senders = senders;
            shared.snapshot.receivers = receivers;
            shared.snapshot.clear_error();
        }
        Err(error) => {
            tracing::warn!(%error, "thread refresh failed");
            shared
                .snapshot
                .record_error("failed to fetch threads".to_owned());
        }
    }
    shared.publish();
}

/// Complete a mutation: on success clear the error and re-sync the thread
/// collections through whichever delivery mode is active at call time; on
/// failure record the operation's message and keep existing data.
async fn finish_mutation(ctx: &Ctx, result: Result<(), SyncError>, failure: &str) {
    match result {
        Ok(()) => {
            {
                let mut shared = lock(ctx);
                if shared.disposed {
                    return;
                }
                shared.snapshot.clear_error();
                shared.publish();
            }
            refresh_threads(ctx).await;
        }
        Err(error) => {
            tracing::warn!(%error, "mutation failed");
            let mut shared = lock(ctx);
            if shared.disposed {
                return;
            }
            shared.snapshot.record_error(failure.to_owned());
            shared.publish();
        }
    }
}

/// Re-sync thread collections after a mutation: ask the channel to re-push
/// when live, fetch directly otherwise. The branch is taken per call.
async fn refresh_threads(ctx: &Ctx) {
    let live = {
        let shared = lock(ctx);
        if shared.disposed {
            return;
        }
        if shared.mode.is_live() {
            let session = ctx.session.as_str();
            shared.send_frame(
                Frame::request(Topic::SenderThreads, Op::Refresh).with_session(session),
            );
            shared.send_frame(
                Frame::request(Topic::ReceiverThreads, Op::Refresh).with_session(session),
            );
            true
        } else {
            false
        }
    };

    if !live {
        fetch_threads(ctx).await;
    }
}

/// Fetch one queue page directly (polling mode), guarding against a
/// cursor that moved while the request was in flight.
async fn fetch_queue_page(ctx: &Ctx, page: u32) {
    let result = ctx.api.fetch_queue_page(page, ctx.config.page_size).await;

    let mut shared = lock(ctx);
    if shared.disposed {
        return;
    }
    match result {
        Ok(queue) => {
            if page != shared.snapshot.current_page {
                tracing::debug!(
                    page,
                    current = shared.snapshot.current_page,
                    "discarding stale queue fetch"
                );
                return;
            }
            shared.snapshot.apply_queue_page(queue);
            shared.snapshot.clear_error();
            shared.publish();
        }
        Err(error) => {
            tracing::warn!(%error, "queue page fetch failed");
            shared
                .snapshot
                .record_error("failed to fetch message queue".to_owned());
            shared.publish();
        }
    }
}
