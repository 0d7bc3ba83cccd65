//! Delivery-mode selection.

use tokio::task::JoinHandle;

use crate::channel::Channel;

/// The single data-freshness strategy in effect for the session.
///
/// Exactly one delivery mechanism is active at any moment: the realtime
/// channel (`Push`) or the poll task (`Poll`). `Connecting` covers the
/// instant before the first resolution and the inert state after disposal.
pub(crate) enum FeedMode {
    Connecting,
    Push(Channel),
    Poll(JoinHandle<()>),
}

impl FeedMode {
    pub(crate) fn is_live(&self) -> bool {
        matches!(self, Self::Push(_))
    }

    /// Install `next`, tearing down the superseded mechanism.
    pub(crate) fn replace(&mut self, next: FeedMode) {
        match std::mem::replace(self, next) {
            FeedMode::Connecting => {}
            FeedMode::Push(channel) => channel.close(),
            FeedMode::Poll(task) => task.abort(),
        }
    }
}
