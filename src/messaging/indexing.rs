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

//! Indexing trigger service.
//!
//! A background commit listener keeps a subscription on the indexing
//! response destination. While the subscription is up the service is
//! available and index jobs are sent; while it is down submissions are
//! skipped and the listener reconnects with a fixed backoff.

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::engine_core::events::{
    IndexingJob, IndexingResponse, IndexingResponseType, Subscription,
};
use crate::engine_core::models::RepositoryItem;
use crate::messaging::transport::{is_connection_failure, MessageReceiver, MessageTransport};
use crate::utils::retry::retry_with_backoff;

/// Destinations and timers of the indexing service
#[derive(Debug, Clone)]
pub struct IndexingSettings {
    pub job_destination: String,
    pub response_destination: String,
    pub reconnect_backoff: Duration,
    pub receive_timeout: Duration,
}

struct Shared {
    transport: Arc<dyn MessageTransport>,
    settings: IndexingSettings,
    available: watch::Sender<bool>,
    reader_generation: AtomicU64,
}

impl Shared {
    fn set_available(&self, available: bool) {
        self.available.send_replace(available);
    }

    fn handle_response(&self, payload: &[u8]) {
        match serde_json::from_slice::<IndexingResponse>(payload) {
            Ok(response) => match response.response_type {
                IndexingResponseType::CommitAcknowledgement => {
                    let generation = self.reader_generation.fetch_add(1, Ordering::SeqCst) + 1;
                    debug!(generation, "Index commit acknowledged; reader refreshed");
                }
                IndexingResponseType::Error => {
                    warn!(
                        message = response.message.as_deref().unwrap_or_default(),
                        "Indexing service reported an error"
                    );
                }
            },
            Err(e) => warn!("Unreadable indexing response: {}", e),
        }
    }
}

pub struct IndexingService {
    shared: Arc<Shared>,
    listener: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
}

impl IndexingService {
    pub fn new(transport: Arc<dyn MessageTransport>, settings: IndexingSettings) -> Self {
        let (available, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                transport,
                settings,
                available,
                reader_generation: AtomicU64::new(0),
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn is_available(&self) -> bool {
        *self.shared.available.borrow()
    }

    /// Receiver observing every availability update published by the listener.
    pub fn subscribe_availability(&self) -> watch::Receiver<bool> {
        self.shared.available.subscribe()
    }

    /// Number of index reader refreshes triggered by commit acknowledgements.
    pub fn reader_generation(&self) -> u64 {
        self.shared.reader_generation.load(Ordering::SeqCst)
    }

    pub fn start(&self) {
        let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if listener.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_commit_listener(Arc::clone(&self.shared), token.clone()));
        *listener = Some((handle, token));
        info!("Indexing service started");
    }

    /// Stop the commit listener, waiting at most twice the receive timeout.
    pub async fn shutdown(&self) {
        let Some((mut handle, token)) = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        else {
            return;
        };

        token.cancel();
        let join_timeout = self.shared.settings.receive_timeout * 2;
        if tokio::time::timeout(join_timeout, &mut handle).await.is_err() {
            warn!("Commit listener did not stop in time; aborting");
            handle.abort();
        }
        self.shared.set_available(false);
        self.shared.transport.destroy_connections();
        info!("Indexing service stopped");
    }

    pub async fn submit_create_index(&self, items: Vec<RepositoryItem>) {
        if items.is_empty() {
            return;
        }
        self.submit(IndexingJob::create_index(items)).await;
    }

    pub async fn submit_delete_index(&self, items: Vec<RepositoryItem>) {
        if items.is_empty() {
            return;
        }
        self.submit(IndexingJob::delete_index(items)).await;
    }

    pub async fn submit_delete_all(&self) {
        self.submit(IndexingJob::delete_all()).await;
    }

    pub async fn submit_subscription(&self, subscription: Subscription) {
        self.submit(IndexingJob::subscription(subscription)).await;
    }

    async fn submit(&self, job: IndexingJob) {
        if !self.is_available() {
            debug!(job_type = ?job.job_type, "Indexing unavailable; job skipped");
            return;
        }
        let payload = match serde_json::to_vec(&job) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize indexing job: {}", e);
                return;
            }
        };
        if let Err(e) = self
            .shared
            .transport
            .send(&self.shared.settings.job_destination, Bytes::from(payload))
            .await
        {
            warn!(job_type = ?job.job_type, "Indexing job not sent: {}", e);
        }
    }
}

async fn connect(shared: &Shared, token: &CancellationToken) -> Option<Box<dyn MessageReceiver>> {
    let destination = shared.settings.response_destination.as_str();
    let transport = &shared.transport;
    retry_with_backoff(
        shared.settings.reconnect_backoff,
        token,
        move || transport.open_receiver(destination),
        |e| {
            shared.set_available(false);
            warn!(
                destination,
                backoff_ms = shared.settings.reconnect_backoff.as_millis() as u64,
                "Indexing broker unavailable: {}",
                e
            );
        },
    )
    .await
}

async fn run_commit_listener(shared: Arc<Shared>, token: CancellationToken) {
    'connect: loop {
        let Some(mut receiver) = connect(&shared, &token).await else {
            break;
        };
        shared.set_available(true);
        info!("Commit listener connected");

        loop {
            let result = tokio::select! {
                _ = token.cancelled() => break 'connect,
                result = receiver.receive(shared.settings.receive_timeout) => result,
            };
            match result {
                Ok(Some(payload)) => shared.handle_response(&payload),
                Ok(None) => {}
                Err(e) if is_connection_failure(&e) => {
                    warn!("Commit listener lost its connection: {}", e);
                    shared.set_available(false);
                    continue 'connect;
                }
                Err(e) => error!("Commit listener receive failed: {}", e),
            }
        }
    }
    shared.set_available(false);
    debug!("Commit listener exited");
}
