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

//! Repository lifecycle events and the wire messages derived from them.
//!
//! `RepositoryEvent` is the internal event stream consumed by listeners.
//! The notification and indexing message types are the JSON payloads those
//! listeners hand to the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine_core::models::{ItemStatus, RepositoryItem};

/// Lifecycle events raised by repository mutations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryEvent {
    /// A new library version was published
    Published { item: RepositoryItem },
    /// Content of an existing item changed
    Modified { item: RepositoryItem },
    Locked { item: RepositoryItem },
    Unlocked { item: RepositoryItem },
    /// The item moved to a new lifecycle status
    StatusChanged {
        item: RepositoryItem,
        previous: ItemStatus,
    },
    /// The item was removed from the repository
    Deleted { item: RepositoryItem },
}

impl RepositoryEvent {
    pub fn item(&self) -> &RepositoryItem {
        match self {
            RepositoryEvent::Published { item }
            | RepositoryEvent::Modified { item }
            | RepositoryEvent::Locked { item }
            | RepositoryEvent::Unlocked { item }
            | RepositoryEvent::StatusChanged { item, .. }
            | RepositoryEvent::Deleted { item } => item,
        }
    }

    pub fn action(&self) -> ActionType {
        match self {
            RepositoryEvent::Published { .. } => ActionType::Publish,
            RepositoryEvent::Modified { .. } => ActionType::Modified,
            RepositoryEvent::Locked { .. } => ActionType::Locked,
            RepositoryEvent::Unlocked { .. } => ActionType::Unlocked,
            RepositoryEvent::StatusChanged { .. } => ActionType::StatusChanged,
            RepositoryEvent::Deleted { .. } => ActionType::Deleted,
        }
    }

    /// Build the event that corresponds to an action on an item.
    ///
    /// `previous` is the status the item had before the action; only status
    /// changes carry it.
    pub fn for_action(action: ActionType, item: RepositoryItem, previous: ItemStatus) -> Self {
        match action {
            ActionType::Publish => RepositoryEvent::Published { item },
            ActionType::Modified => RepositoryEvent::Modified { item },
            ActionType::Locked => RepositoryEvent::Locked { item },
            ActionType::Unlocked => RepositoryEvent::Unlocked { item },
            ActionType::StatusChanged => RepositoryEvent::StatusChanged { item, previous },
            ActionType::Deleted => RepositoryEvent::Deleted { item },
        }
    }
}

/// Notification action carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Publish,
    Modified,
    Locked,
    Unlocked,
    StatusChanged,
    Deleted,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Publish => "PUBLISH",
            ActionType::Modified => "MODIFIED",
            ActionType::Locked => "LOCKED",
            ActionType::Unlocked => "UNLOCKED",
            ActionType::StatusChanged => "STATUS_CHANGED",
            ActionType::Deleted => "DELETED",
        }
    }
}

/// JSON body published for every notification job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    pub action: ActionType,
    pub item: RepositoryItem,
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl NotificationMessage {
    pub fn new(action: ActionType, item: RepositoryItem) -> Self {
        Self {
            action,
            item,
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexingJobType {
    CreateIndex,
    DeleteIndex,
    DeleteAll,
    Subscription,
}

/// A user's subscription to change notifications for a namespace or library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub user_id: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_name: Option<String>,
    #[serde(default)]
    pub event_types: Vec<ActionType>,
}

/// Control message sent to the indexing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingJob {
    pub job_type: IndexingJobType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<RepositoryItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

impl IndexingJob {
    pub fn create_index(items: Vec<RepositoryItem>) -> Self {
        Self {
            job_type: IndexingJobType::CreateIndex,
            items,
            subscription: None,
        }
    }

    pub fn delete_index(items: Vec<RepositoryItem>) -> Self {
        Self {
            job_type: IndexingJobType::DeleteIndex,
            items,
            subscription: None,
        }
    }

    pub fn delete_all() -> Self {
        Self {
            job_type: IndexingJobType::DeleteAll,
            items: Vec::new(),
            subscription: None,
        }
    }

    pub fn subscription(subscription: Subscription) -> Self {
        Self {
            job_type: IndexingJobType::Subscription,
            items: Vec::new(),
            subscription: Some(subscription),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexingResponseType {
    CommitAcknowledgement,
    Error,
}

/// Response published by the indexing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingResponse {
    pub response_type: IndexingResponseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
