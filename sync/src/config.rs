//! Synchronizer configuration.
//!
//! All knobs are explicit fields passed at construction; a session never
//! reads configuration globally.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::error::SyncError;

/// Settings for one synchronizer session.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// HTTP origin of the backend, e.g. `http://127.0.0.1:8080`.
    pub backend_origin: String,
    /// WebSocket endpoint of the realtime channel.
    pub realtime_endpoint: String,
    /// Interval between poll fetches while degraded.
    pub poll_interval: Duration,
    /// Queue page size, fixed for the session.
    pub page_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backend_origin: "http://127.0.0.1:8080".to_owned(),
            realtime_endpoint: "ws://127.0.0.1:8080/channel".to_owned(),
            poll_interval: Duration::from_millis(5000),
            page_size: 14,
        }
    }
}

impl SyncConfig {
    /// Build a config for `origin`, deriving the channel endpoint from it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidOrigin`] if `origin` is not an http(s)
    /// URL.
    pub fn for_origin(origin: &str) -> Result<Self, SyncError> {
        let realtime_endpoint = realtime_endpoint_for(origin)?;
        Ok(Self {
            backend_origin: origin.trim_end_matches('/').to_owned(),
            realtime_endpoint,
            ..Self::default()
        })
    }
}

/// Map an http(s) origin onto the ws(s) channel endpoint it serves.
fn realtime_endpoint_for(origin: &str) -> Result<String, SyncError> {
    let origin = origin.trim_end_matches('/');
    if let Some(rest) = origin.strip_prefix("http://") {
        return Ok(format!("ws://{rest}/channel"));
    }
    if let Some(rest) = origin.strip_prefix("https://") {
        return Ok(format!("wss://{rest}/channel"));
    }

    Err(SyncError::InvalidOrigin(origin.to_owned()))
}
