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

//! Fan-out of repository events to their consumers.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

use crate::engine_core::events::RepositoryEvent;
use crate::engine_core::traits::RepositoryListener;
use crate::messaging::indexing::IndexingService;
use crate::messaging::notification::NotificationService;

#[async_trait]
impl RepositoryListener for NotificationService {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn on_event(&self, event: &RepositoryEvent) {
        match event {
            RepositoryEvent::Published { item } => self.item_published(item.clone()),
            RepositoryEvent::Modified { item } => self.item_modified(item.clone()),
            RepositoryEvent::Locked { item } => self.item_locked(item.clone()),
            RepositoryEvent::Unlocked { item } => self.item_unlocked(item.clone()),
            RepositoryEvent::StatusChanged { item, .. } => self.item_status_changed(item.clone()),
            RepositoryEvent::Deleted { item } => self.item_deleted(item.clone()),
        }
    }
}

#[async_trait]
impl RepositoryListener for IndexingService {
    fn name(&self) -> &'static str {
        "indexing"
    }

    async fn on_event(&self, event: &RepositoryEvent) {
        match event {
            RepositoryEvent::Deleted { item } => self.submit_delete_index(vec![item.clone()]).await,
            RepositoryEvent::Published { item }
            | RepositoryEvent::Modified { item }
            | RepositoryEvent::Locked { item }
            | RepositoryEvent::Unlocked { item }
            | RepositoryEvent::StatusChanged { item, .. } => {
                self.submit_create_index(vec![item.clone()]).await
            }
        }
    }
}

/// Ordered set of listeners that receive every repository event.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn RepositoryListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<dyn RepositoryListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub async fn dispatch(&self, event: &RepositoryEvent) {
        for listener in &self.listeners {
            trace!(listener = listener.name(), action = event.action().as_str(), "Dispatching event");
            listener.on_event(event).await;
        }
    }
}
