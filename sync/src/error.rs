//! Transport error taxonomy.

/// Failure inside a single transport operation.
///
/// These never cross the synchronizer boundary: the operation that hit the
/// failure records a human-readable message on the snapshot instead of
/// propagating the error to the presentation layer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{operation} returned HTTP {status}")]
    Status { operation: &'static str, status: u16 },
    #[error("invalid backend origin: {0}")]
    InvalidOrigin(String),
    #[error("websocket connect failed: {0}")]
    ChannelConnect(Box<tokio_tungstenite::tungstenite::Error>),
}
