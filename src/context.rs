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

//! Process-owned repository context.
//!
//! Holds the security manager and the messaging services, starts and stops
//! the background tasks, and runs repository mutations behind an
//! authorization check followed by event fan-out.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::engine::security_manager::RepositorySecurityManager;
use crate::engine::user_store::FileAuthenticationProvider;
use crate::engine_core::audit::SecurityAuditLogger;
use crate::engine_core::constants::messaging;
use crate::engine_core::errors::{RepositoryError, RepositorySecurityError};
use crate::engine_core::events::{ActionType, RepositoryEvent};
use crate::engine_core::models::{RepositoryItem, RepositoryPermission, UserPrincipal};
use crate::engine_core::password::PasswordValidator;
use crate::messaging::{
    EventDispatcher, IndexingService, IndexingSettings, MessageTransport, NotificationService,
    TcpMessageTransport,
};
use crate::persistence::{FileChangeSetManager, SecurityFileLayout};

pub struct RepositoryContext {
    security: Arc<RepositorySecurityManager>,
    notifications: Option<Arc<NotificationService>>,
    indexing: Option<Arc<IndexingService>>,
    dispatcher: EventDispatcher,
    audit: SecurityAuditLogger,
}

impl RepositoryContext {
    /// Build the file-backed security stack and, when a broker is
    /// configured, the enabled messaging services.
    pub fn from_config(config: &Config) -> Result<Self, RepositoryError> {
        config.validate()?;
        let security = Arc::new(build_security_manager(config)?);
        let transport = config
            .broker_address
            .as_ref()
            .map(|address| Arc::new(TcpMessageTransport::new(address.clone())) as Arc<dyn MessageTransport>);
        Ok(Self::new(config, security, transport))
    }

    /// Assemble a context around an existing security manager and transport.
    pub fn new(
        config: &Config,
        security: Arc<RepositorySecurityManager>,
        transport: Option<Arc<dyn MessageTransport>>,
    ) -> Self {
        let mut dispatcher = EventDispatcher::new();
        let mut notifications = None;
        let mut indexing = None;

        if let Some(transport) = transport {
            if config.notifications_enabled {
                let service = Arc::new(NotificationService::new(
                    Arc::clone(&transport),
                    messaging::NOTIFICATION_DESTINATION,
                    config.worker_wake_interval(),
                    config.shutdown_timeout(),
                ));
                dispatcher.register(service.clone());
                notifications = Some(service);
            }
            if config.indexing_enabled {
                let service = Arc::new(IndexingService::new(
                    transport,
                    IndexingSettings {
                        job_destination: messaging::INDEXING_JOB_DESTINATION.to_string(),
                        response_destination: messaging::INDEXING_RESPONSE_DESTINATION.to_string(),
                        reconnect_backoff: config.reconnect_backoff(),
                        receive_timeout: config.receive_timeout(),
                    },
                ));
                dispatcher.register(service.clone());
                indexing = Some(service);
            }
        }

        Self {
            security,
            notifications,
            indexing,
            dispatcher,
            audit: SecurityAuditLogger::new(),
        }
    }

    pub fn security(&self) -> &Arc<RepositorySecurityManager> {
        &self.security
    }

    pub fn notifications(&self) -> Option<&Arc<NotificationService>> {
        self.notifications.as_ref()
    }

    pub fn indexing(&self) -> Option<&Arc<IndexingService>> {
        self.indexing.as_ref()
    }

    pub fn start(&self) {
        if let Some(service) = &self.notifications {
            service.start();
        }
        if let Some(service) = &self.indexing {
            service.start();
        }
        info!(listeners = self.dispatcher.len(), "Repository context started");
    }

    pub async fn shutdown(&self) {
        if let Some(service) = &self.notifications {
            service.shutdown().await;
        }
        if let Some(service) = &self.indexing {
            service.shutdown().await;
        }
        info!("Repository context stopped");
    }

    pub async fn dispatch(&self, event: &RepositoryEvent) {
        self.dispatcher.dispatch(event).await;
    }

    /// Authorize `action` on `item`, run `mutation`, then publish the event.
    ///
    /// The mutation returns the item as it stands afterwards; that item is
    /// carried by the event. Delivery problems never fail the call.
    pub async fn guarded_mutation<F, Fut>(
        &self,
        user: &UserPrincipal,
        action: ActionType,
        item: &RepositoryItem,
        mutation: F,
    ) -> Result<RepositoryItem, RepositoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RepositoryItem, RepositoryError>>,
    {
        if !self.is_action_authorized(user, action, item) {
            return Err(RepositorySecurityError::AccessDenied(format!(
                "{} not permitted in namespace {}",
                action.as_str(),
                item.namespace
            ))
            .into());
        }
        self.audit.access(
            user.user_id(),
            &item.namespace,
            action.as_str(),
            true,
        );

        let updated = mutation().await?;
        let event = RepositoryEvent::for_action(action, updated.clone(), item.status);
        debug!(action = action.as_str(), library = %updated.library_name, "Mutation applied");
        self.dispatch(&event).await;
        Ok(updated)
    }

    fn is_action_authorized(
        &self,
        user: &UserPrincipal,
        action: ActionType,
        item: &RepositoryItem,
    ) -> bool {
        match action {
            ActionType::Publish | ActionType::Deleted => {
                self.security
                    .is_authorized(user, &item.namespace, RepositoryPermission::Write)
            }
            ActionType::Modified | ActionType::Locked | ActionType::Unlocked => {
                self.security.is_write_authorized(user, item)
            }
            ActionType::StatusChanged => self.security.is_promote_authorized(user, item),
        }
    }
}

/// File-backed security manager for the configured repository root.
pub fn build_security_manager(config: &Config) -> Result<RepositorySecurityManager, RepositoryError> {
    let layout = SecurityFileLayout::new(&config.repository_root);
    let change_sets = Arc::new(FileChangeSetManager::new(&config.repository_root));
    let validator =
        PasswordValidator::new(config.digest_algorithm.as_deref(), Some(&config.password_charset))?;
    let provider = Arc::new(FileAuthenticationProvider::new(
        &layout,
        change_sets.clone(),
        validator,
    ));
    Ok(RepositorySecurityManager::new(layout, change_sets, provider))
}
