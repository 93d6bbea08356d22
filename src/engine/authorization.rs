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

//! Namespace authorization resource.
//!
//! Grants and denies are stored per namespace. Resolution accumulates the
//! entries of a namespace and all of its ancestors, then applies deny-wins:
//! the effective permission is the highest granted permission that is not
//! also denied.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::engine_core::errors::RepositoryError;
use crate::engine_core::models::{
    AuthorizationSpec, NamespaceAuthorizations, RepositoryPermission, UserPrincipal,
};
use crate::persistence::{security_file, with_change_set, ChangeSetManager, SecurityFileLayout};

pub struct AuthorizationResource {
    layout: SecurityFileLayout,
    change_sets: Arc<dyn ChangeSetManager>,
    cache: RwLock<HashMap<String, Arc<NamespaceAuthorizations>>>,
}

impl AuthorizationResource {
    pub fn new(layout: SecurityFileLayout, change_sets: Arc<dyn ChangeSetManager>) -> Self {
        Self {
            layout,
            change_sets,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Authorizations recorded directly on `namespace` (empty if none).
    pub fn get_authorizations(
        &self,
        namespace: &str,
    ) -> Result<Arc<NamespaceAuthorizations>, RepositoryError> {
        let key = normalize(namespace);
        if let Some(cached) = self.cache.read().unwrap_or_else(|e| e.into_inner()).get(key) {
            return Ok(Arc::clone(cached));
        }

        // Load under the write lock so a concurrent save cannot be overtaken
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(key) {
            return Ok(Arc::clone(cached));
        }
        let path = self.layout.namespace_authorizations(key)?;
        let loaded = Arc::new(security_file::load(&path)?.unwrap_or_default());
        cache.insert(key.to_string(), Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn get_granted_permissions(
        &self,
        user: &UserPrincipal,
        namespace: &str,
    ) -> Result<BTreeSet<RepositoryPermission>, RepositoryError> {
        self.collect(user, namespace, |auths| &auths.grants)
    }

    pub fn get_denied_permissions(
        &self,
        user: &UserPrincipal,
        namespace: &str,
    ) -> Result<BTreeSet<RepositoryPermission>, RepositoryError> {
        self.collect(user, namespace, |auths| &auths.denies)
    }

    /// Highest permission in `granted - denied`, or `None` if nothing remains.
    pub fn get_effective_permission(
        &self,
        user: &UserPrincipal,
        namespace: &str,
    ) -> Result<RepositoryPermission, RepositoryError> {
        let granted = self.get_granted_permissions(user, namespace)?;
        let denied = self.get_denied_permissions(user, namespace)?;
        let effective = granted
            .difference(&denied)
            .max()
            .copied()
            .unwrap_or(RepositoryPermission::None);
        debug!(
            user = user.user_id(),
            namespace,
            %effective,
            "Resolved effective permission"
        );
        Ok(effective)
    }

    /// Persist the authorizations of a namespace and reload them.
    pub fn save_authorizations(
        &self,
        namespace: &str,
        authorizations: &NamespaceAuthorizations,
    ) -> Result<(), RepositoryError> {
        let key = normalize(namespace);
        let path = self.layout.namespace_authorizations(key)?;
        with_change_set(self.change_sets.as_ref(), |cs| {
            security_file::save(cs, &path, authorizations)
        })?;
        info!(namespace = key, "Namespace authorizations saved");

        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        match security_file::load::<NamespaceAuthorizations>(&path) {
            Ok(reloaded) => {
                cache.insert(key.to_string(), Arc::new(reloaded.unwrap_or_default()));
            }
            Err(e) => {
                cache.remove(key);
                warn!(namespace = key, "Reload of namespace authorizations failed: {}", e);
            }
        }
        Ok(())
    }

    fn collect<F>(
        &self,
        user: &UserPrincipal,
        namespace: &str,
        entries: F,
    ) -> Result<BTreeSet<RepositoryPermission>, RepositoryError>
    where
        F: Fn(&NamespaceAuthorizations) -> &Vec<AuthorizationSpec>,
    {
        let mut permissions = BTreeSet::new();
        for ns in namespace_hierarchy(namespace) {
            let auths = self.get_authorizations(&ns)?;
            permissions.extend(
                entries(&auths)
                    .iter()
                    .filter(|spec| spec.applies_to(user.authorization_ids()))
                    .map(|spec| spec.permission),
            );
        }
        Ok(permissions)
    }
}

fn normalize(namespace: &str) -> &str {
    namespace.trim().trim_end_matches('/')
}

/// The namespace followed by each ancestor, cut at `/` boundaries.
///
/// `http://example.com/a/b` yields itself, `http://example.com/a` and
/// `http://example.com`. The authority is never split.
pub fn namespace_hierarchy(namespace: &str) -> Vec<String> {
    let namespace = normalize(namespace);
    let authority_start = namespace.find("://").map(|i| i + 3).unwrap_or(0);

    let mut hierarchy = vec![namespace.to_string()];
    let mut current = namespace;
    while let Some(idx) = current.rfind('/') {
        if idx <= authority_start {
            break;
        }
        current = &current[..idx];
        hierarchy.push(current.to_string());
    }
    hierarchy
}
