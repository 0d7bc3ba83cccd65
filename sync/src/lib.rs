//! # sync
//!
//! Client-side live-data synchronization for the threadboard dashboard.
//!
//! The [`Synchronizer`] keeps a locally-cached view of three backend feeds
//! (sender threads, receiver threads, one page of the message queue) fresh
//! through whichever delivery mode the session resolves to: the realtime
//! push channel when the handshake succeeds, fixed-interval polling when it
//! does not. Consumers observe state as [`Snapshot`] values on a watch
//! channel and drive mutations through the synchronizer's operations.

pub mod api;
pub mod channel;
pub mod config;
mod error;
mod feed;
pub mod model;
pub mod synchronizer;

pub use config::SyncConfig;
pub use error::SyncError;
pub use model::{ConnectionState, QueuePage, RunState, Snapshot, ThreadKind, ThreadRecord};
pub use synchronizer::Synchronizer;
