//! Entity and snapshot types for the dashboard feeds.
//!
//! DESIGN
//! ======
//! All feed state lives in a single [`Snapshot`] owned by the synchronizer
//! and handed to consumers by value. Records are replaced wholesale on
//! every update; nothing here merges or diffs.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of backend worker thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreadKind {
    Sender,
    Receiver,
}

impl ThreadKind {
    /// Lowercase label for log and error messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Receiver => "receiver",
        }
    }
}

/// Run state of a worker thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    Running,
    Stopped,
}

impl RunState {
    /// Wire value used in backend query parameters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
        }
    }
}

/// A backend-managed worker thread as the backend reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ThreadKind,
    pub state: RunState,
    /// Scheduling priority, 1 (lowest) to 10 (highest).
    pub priority: u8,
}

/// One page of the message queue. `content` values are opaque to the
/// client; they are displayed or serialized, never interpreted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePage {
    pub content: Vec<Value>,
    pub total_pages: u32,
}

/// Delivery mode the synchronizer is currently in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Initial or transitional: no delivery mechanism active yet.
    #[default]
    Connecting,
    /// Realtime channel active.
    Live,
    /// Polling fallback active.
    Degraded,
}

/// Consumer-facing view of the three feeds plus connection and error state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub senders: Vec<ThreadRecord>,
    pub receivers: Vec<ThreadRecord>,
    pub messages: Vec<Value>,
    pub current_page: u32,
    pub total_pages: u32,
    /// Fixed for the session.
    pub page_size: u32,
    pub connection: ConnectionState,
    /// Most recent operation failure, cleared by the next success.
    pub error: Option<String>,
}

impl Snapshot {
    /// Replace one thread collection wholesale. Server order is kept.
    pub fn replace_threads(&mut self, kind: ThreadKind, threads: Vec<ThreadRecord>) {
        match kind {
            ThreadKind::Sender => self.senders = threads,
            ThreadKind::Receiver => self.receivers = threads,
        }
    }

    /// Apply a queue page fetched for the current cursor, keeping the
    /// cursor inside the new page range.
    pub fn apply_queue_page(&mut self, page: QueuePage) {
        self.total_pages = page.total_pages;
        self.messages = page.content;
        if self.total_pages == 0 {
            self.current_page = 0;
        } else if self.current_page >= self.total_pages {
            self.current_page = self.total_pages - 1;
        }
    }

    /// Record a failure. Previously fetched data is left untouched:
    /// stale-but-valid beats empty.
    pub fn record_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Clear the current error after a successful operation.
    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
