//! Shared frame model and JSON codec for the realtime dashboard channel.
//!
//! This crate owns the wire representation used by the synchronizer and by
//! anything speaking the channel protocol on the backend side. Payloads stay
//! flexible (`serde_json::Value`); framing is JSON text, one frame per
//! WebSocket text message.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text could not be decoded as a [`Frame`].
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Data feed a frame addresses. One variant per push topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topic {
    /// Sender-thread collection updates.
    #[serde(rename = "threads:sender")]
    SenderThreads,
    /// Receiver-thread collection updates.
    #[serde(rename = "threads:receiver")]
    ReceiverThreads,
    /// Paginated message-queue updates.
    #[serde(rename = "queue:page")]
    QueuePage,
}

impl Topic {
    /// Wire name of the topic.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SenderThreads => "threads:sender",
            Self::ReceiverThreads => "threads:receiver",
            Self::QueuePage => "queue:page",
        }
    }
}

/// What a frame does on the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    /// Client asks the server to re-push the topic's current data.
    Refresh,
    /// Client requests a specific queue page; carries `page` and `session`.
    Page,
    /// Server delivers data for a topic.
    Push,
    /// Client is leaving; the server should drop its subscriptions.
    Unsubscribe,
}

/// A single message on the realtime channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Unique identifier for this frame (UUID string).
    pub id: String,
    /// Session identity of the client the frame belongs to, if any.
    pub session: Option<String>,
    /// Milliseconds since the Unix epoch when the frame was created.
    pub ts: i64,
    /// Feed the frame addresses. `None` only for session-wide frames
    /// (unsubscribe).
    pub topic: Option<Topic>,
    /// Role of the frame on the channel.
    pub op: Op,
    /// Queue page this frame requests or answers, if any.
    pub page: Option<u32>,
    /// Arbitrary JSON payload.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Build a request frame for `topic` with a fresh id and empty payload.
    #[must_use]
    pub fn request(topic: Topic, op: Op) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session: None,
            ts: now_ms(),
            topic: Some(topic),
            op,
            page: None,
            data: Value::Object(Map::new()),
        }
    }

    /// Build the session-wide unsubscribe notification.
    #[must_use]
    pub fn unsubscribe(session: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session: Some(session.to_owned()),
            ts: now_ms(),
            topic: None,
            op: Op::Unsubscribe,
            page: None,
            data: Value::Object(Map::new()),
        }
    }

    /// Tag the frame with the owning session identity.
    #[must_use]
    pub fn with_session(mut self, session: &str) -> Self {
        self.session = Some(session.to_owned());
        self
    }

    /// Tag the frame with the queue page it requests or answers.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Attach a payload to the frame.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Encode a frame into JSON text.
#[must_use]
pub fn encode_frame(frame: &Frame) -> String {
    // Serializing a Frame cannot fail: every field is a plain JSON type
    // and map keys are strings.
    serde_json::to_string(frame).unwrap_or_default()
}

/// Decode JSON text into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed text, unknown topics, or
/// unknown ops.
pub fn decode_frame(text: &str) -> Result<Frame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
