//! REST client for the thread and queue endpoints.
//!
//! ERROR HANDLING
//! ==============
//! Every call resolves to `Result<_, SyncError>`; a non-2xx status becomes
//! a `SyncError::Status` naming the operation. Paired sender/receiver
//! calls are joined and fail as a unit so the caller never applies a torn
//! update where one collection reflects a newer backend state than the
//! other.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use crate::error::SyncError;
use crate::model::{QueuePage, RunState, ThreadKind, ThreadRecord};

/// Thin REST wrapper bound to one backend origin.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    origin: String,
}

impl ApiClient {
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            origin: origin.trim_end_matches('/').to_owned(),
        }
    }

    /// One-time lifecycle kick-off for both thread kinds.
    ///
    /// # Errors
    ///
    /// Fails if either kick-off call fails.
    pub async fn start_lifecycles(&self) -> Result<(), SyncError> {
        tokio::try_join!(
            self.send_ok(
                "start sender lifecycle",
                reqwest::Method::GET,
                "/senderThreads/startSenderThreadsLifeCycle",
            ),
            self.send_ok(
                "start receiver lifecycle",
                reqwest::Method::GET,
                "/receiverThreads/startReceiverThreadsLifeCycle",
            ),
        )?;
        Ok(())
    }

    /// Fetch the full sender-thread collection.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx status.
    pub async fn fetch_sender_threads(&self) -> Result<Vec<ThreadRecord>, SyncError> {
        self.get_json("fetch sender threads", "/senderThreads/getAllSenderThreads")
            .await
    }

    /// Fetch the full receiver-thread collection.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx status.
    pub async fn fetch_receiver_threads(&self) -> Result<Vec<ThreadRecord>, SyncError> {
        self.get_json(
            "fetch receiver threads",
            "/receiverThreads/getAllReceiverThreads",
        )
        .await
    }

    /// Fetch one queue page.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx status.
    pub async fn fetch_queue_page(&self, page: u32, size: u32) -> Result<QueuePage, SyncError> {
        let path = format!("/messageQueue/getMessageQueue?page={page}&size={size}");
        self.get_json("fetch message queue", &path).await
    }

    /// Create `senders` sender threads and `receivers` receiver threads in
    /// parallel.
    ///
    /// # Errors
    ///
    /// Fails if either creation call fails.
    pub async fn create_threads(&self, senders: u32, receivers: u32) -> Result<(), SyncError> {
        let sender_path =
            format!("/senderThreads/createSenderThreadsWithAmount?senderAmount={senders}");
        let receiver_path =
            format!("/receiverThreads/createReceiverThreadsWithAmount?receiverAmount={receivers}");
        tokio::try_join!(
            self.send_ok("create sender threads", reqwest::Method::POST, &sender_path),
            self.send_ok(
                "create receiver threads",
                reqwest::Method::POST,
                &receiver_path,
            ),
        )?;
        Ok(())
    }

    /// Update one thread's run state.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx status.
    pub async fn update_thread_state(
        &self,
        kind: ThreadKind,
        id: &str,
        state: RunState,
    ) -> Result<(), SyncError> {
        let path = update_state_path(kind, id, state);
        self.send_ok("update thread state", reqwest::Method::PUT, &path)
            .await
    }

    /// Update one thread's priority.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx status.
    pub async fn update_thread_priority(
        &self,
        kind: ThreadKind,
        id: &str,
        priority: u8,
    ) -> Result<(), SyncError> {
        let path = update_priority_path(kind, id, priority);
        self.send_ok("update thread priority", reqwest::Method::PUT, &path)
            .await
    }

    /// Delete one thread.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx status.
    pub async fn delete_thread(&self, kind: ThreadKind, id: &str) -> Result<(), SyncError> {
        let path = delete_path(kind, id);
        self.send_ok("delete thread", reqwest::Method::DELETE, &path)
            .await
    }

    /// Delete every thread of one kind.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a non-2xx status.
    pub async fn delete_all_threads(&self, kind: ThreadKind) -> Result<(), SyncError> {
        self.send_ok("delete all threads", reqwest::Method::DELETE, delete_all_path(kind))
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<T, SyncError> {
        let response = self.http.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn send_ok(
        &self,
        operation: &'static str,
        method: reqwest::Method,
        path: &str,
    ) -> Result<(), SyncError> {
        let response = self.http.request(method, self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.origin)
    }
}

fn kind_base(kind: ThreadKind) -> &'static str {
    match kind {
        ThreadKind::Sender => "senderThreads",
        ThreadKind::Receiver => "receiverThreads",
    }
}

fn update_state_path(kind: ThreadKind, id: &str, state: RunState) -> String {
    let endpoint = match kind {
        ThreadKind::Sender => "updateSenderThreadState",
        ThreadKind::Receiver => "updateReceiverThreadState",
    };
    format!(
        "/{base}/{id}/{endpoint}?id={id}&threadState={state}",
        base = kind_base(kind),
        state = state.as_str(),
    )
}

fn update_priority_path(kind: ThreadKind, id: &str, priority: u8) -> String {
    let endpoint = match kind {
        ThreadKind::Sender => "updateSenderThreadPriority",
        ThreadKind::Receiver => "updateReceiverThreadPriority",
    };
    format!(
        "/{base}/{id}/{endpoint}?id={id}&priority={priority}",
        base = kind_base(kind),
    )
}

fn delete_path(kind: ThreadKind, id: &str) -> String {
    let endpoint = match kind {
        ThreadKind::Sender => "deleteSenderThreadById",
        ThreadKind::Receiver => "deleteReceiverThreadById",
    };
    format!("/{base}/{endpoint}?id={id}", base = kind_base(kind))
}

fn delete_all_path(kind: ThreadKind) -> &'static str {
    match kind {
        ThreadKind::Sender => "/senderThreads/deleteAllSenderThreads",
        ThreadKind::Receiver => "/receiverThreads/deleteAllReceiverThreads",
    }
}
