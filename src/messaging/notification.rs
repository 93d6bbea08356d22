// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Asynchronous notification dispatch.
//!
//! Producers push jobs onto the head of a shared queue and signal the worker.
//! The worker wakes on the signal (or after the wake interval), removes jobs
//! from the tail and publishes each one. Delivery is at-most-once: a job that
//! fails to serialize or send is logged and dropped.

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine_core::events::{ActionType, NotificationMessage};
use crate::engine_core::models::RepositoryItem;
use crate::messaging::transport::MessageTransport;

/// One pending notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationJob {
    pub action: ActionType,
    pub item: RepositoryItem,
}

struct Shared {
    queue: Mutex<VecDeque<NotificationJob>>,
    signal: Notify,
    running: AtomicBool,
    transport: Arc<dyn MessageTransport>,
    destination: String,
    wake_interval: Duration,
}

impl Shared {
    fn take_next(&self) -> Option<NotificationJob> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).pop_back()
    }

    async fn publish(&self, job: NotificationJob) {
        let message = NotificationMessage::new(job.action, job.item);
        let payload = match serde_json::to_vec(&message) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize notification: {}", e);
                return;
            }
        };

        match self.transport.send(&self.destination, Bytes::from(payload)).await {
            Ok(()) => debug!(
                action = message.action.as_str(),
                message_id = %message.message_id,
                "Notification published"
            ),
            Err(e) => warn!(
                action = message.action.as_str(),
                library = %message.item.library_name,
                "Notification dropped, send failed: {}",
                e
            ),
        }
    }
}

pub struct NotificationService {
    shared: Arc<Shared>,
    worker: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
    shutdown_timeout: Duration,
}

impl NotificationService {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        destination: impl Into<String>,
        wake_interval: Duration,
        shutdown_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                signal: Notify::new(),
                running: AtomicBool::new(false),
                transport,
                destination: destination.into(),
                wake_interval,
            }),
            worker: Mutex::new(None),
            shutdown_timeout,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Jobs enqueued but not yet taken by the worker.
    pub fn pending_jobs(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Spawn the worker. Calling `start` on a running service does nothing.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_worker(Arc::clone(&self.shared), token.clone()));
        self.shared.running.store(true, Ordering::SeqCst);
        *worker = Some((handle, token));
        info!(destination = %self.shared.destination, "Notification service started");
    }

    /// Stop the worker, waiting at most the shutdown timeout for it to drain.
    ///
    /// Jobs still queued afterwards are discarded.
    pub async fn shutdown(&self) {
        let Some((mut handle, token)) = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        else {
            return;
        };

        self.shared.running.store(false, Ordering::SeqCst);
        token.cancel();
        self.shared.signal.notify_one();

        if tokio::time::timeout(self.shutdown_timeout, &mut handle)
            .await
            .is_err()
        {
            warn!("Notification worker did not stop in time; aborting");
            handle.abort();
        }

        let abandoned = {
            let mut queue = self.shared.queue.lock().unwrap_or_else(|e| e.into_inner());
            let n = queue.len();
            queue.clear();
            n
        };
        if abandoned > 0 {
            warn!(abandoned, "Discarded undelivered notifications at shutdown");
        }

        self.shared.transport.destroy_connections();
        info!("Notification service stopped");
    }

    pub fn item_published(&self, item: RepositoryItem) {
        self.enqueue(ActionType::Publish, item);
    }

    pub fn item_modified(&self, item: RepositoryItem) {
        self.enqueue(ActionType::Modified, item);
    }

    pub fn item_locked(&self, item: RepositoryItem) {
        self.enqueue(ActionType::Locked, item);
    }

    pub fn item_unlocked(&self, item: RepositoryItem) {
        self.enqueue(ActionType::Unlocked, item);
    }

    pub fn item_status_changed(&self, item: RepositoryItem) {
        self.enqueue(ActionType::StatusChanged, item);
    }

    pub fn item_deleted(&self, item: RepositoryItem) {
        self.enqueue(ActionType::Deleted, item);
    }

    fn enqueue(&self, action: ActionType, item: RepositoryItem) {
        if !self.is_running() {
            info!(
                action = action.as_str(),
                library = %item.library_name,
                "Notification service stopped; event dropped"
            );
            return;
        }
        self.shared
            .queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_front(NotificationJob { action, item });
        self.shared.signal.notify_one();
    }
}

async fn run_worker(shared: Arc<Shared>, token: CancellationToken) {
    debug!("Notification worker running");
    loop {
        while let Some(job) = shared.take_next() {
            shared.publish(job).await;
        }
        if token.is_cancelled() {
            break;
        }
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::timeout(shared.wake_interval, shared.signal.notified()) => {}
        }
    }
    debug!("Notification worker exited");
}
