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

//! Repository security manager.
//!
//! Entry point for authentication and authorization decisions. Credentials
//! are verified by the configured `AuthenticationProvider`; group membership
//! and namespace authorizations come from the file-backed resources.
//!
//! Authorization checks fail closed: if a security file cannot be read the
//! check answers `false` and the failure is logged.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use tracing::{debug, error};

use crate::engine::authorization::AuthorizationResource;
use crate::engine::groups::GroupAssignmentsResource;
use crate::engine_core::audit::SecurityAuditLogger;
use crate::engine_core::constants::{auth, layout, principals};
use crate::engine_core::errors::{RepositoryError, RepositorySecurityError};
use crate::engine_core::models::{
    ItemStatus, NamespaceAuthorizations, RepositoryItem, RepositoryPermission, UserGroup,
    UserPrincipal,
};
use crate::engine_core::traits::AuthenticationProvider;
use crate::persistence::{ChangeSetManager, SecurityFileLayout};

pub struct RepositorySecurityManager {
    provider: Arc<dyn AuthenticationProvider>,
    authorizations: AuthorizationResource,
    groups: GroupAssignmentsResource,
    audit: SecurityAuditLogger,
}

impl RepositorySecurityManager {
    pub fn new(
        layout: SecurityFileLayout,
        change_sets: Arc<dyn ChangeSetManager>,
        provider: Arc<dyn AuthenticationProvider>,
    ) -> Self {
        Self {
            provider,
            groups: GroupAssignmentsResource::new(&layout, Arc::clone(&change_sets)),
            authorizations: AuthorizationResource::new(layout, change_sets),
            audit: SecurityAuditLogger::new(),
        }
    }

    pub fn authentication_provider(&self) -> &Arc<dyn AuthenticationProvider> {
        &self.provider
    }

    /// Resolve the principal for an `Authorization` header value.
    ///
    /// No header means anonymous access. A present header must be a valid
    /// `Basic` credential; it is never demoted to anonymous.
    pub fn authenticate(
        &self,
        authorization_header: Option<&str>,
    ) -> Result<UserPrincipal, RepositorySecurityError> {
        let Some(header) = authorization_header else {
            return Ok(UserPrincipal::anonymous());
        };
        let (user_id, password) = parse_basic_credentials(header)?;
        self.authenticate_user(&user_id, &password)
    }

    pub fn authenticate_user(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<UserPrincipal, RepositorySecurityError> {
        if user_id.is_empty() {
            self.audit.authentication(user_id, false);
            return Err(RepositorySecurityError::InvalidCredentials);
        }

        let valid = self.provider.is_valid_user(user_id, password).map_err(|e| {
            error!(user_id, "Authentication provider failed: {}", e);
            provider_failure(e)
        })?;
        if !valid {
            self.audit.authentication(user_id, false);
            return Err(RepositorySecurityError::InvalidCredentials);
        }

        let principal = self.build_principal(user_id)?;
        self.audit.authentication(user_id, true);
        Ok(principal)
    }

    /// Principal for an already trusted user id.
    pub fn get_user(&self, user_id: &str) -> Result<UserPrincipal, RepositorySecurityError> {
        let exists = self
            .provider
            .get_user_info(user_id)
            .map_err(provider_failure)?
            .is_some();
        if !exists {
            return Err(RepositorySecurityError::UnknownUser(user_id.to_string()));
        }
        self.build_principal(user_id)
    }

    fn build_principal(&self, user_id: &str) -> Result<UserPrincipal, RepositorySecurityError> {
        let groups = self
            .groups
            .get_assigned_groups(user_id)
            .map_err(provider_failure)?;
        let principal = UserPrincipal::new(user_id, groups);

        match self.provider.get_user_info(user_id).map_err(provider_failure)? {
            Some(info) => Ok(principal.with_profile(&info)),
            None => Ok(principal),
        }
    }

    /// True if the `Administrators` group lists the user.
    pub fn is_administrator(&self, user: &UserPrincipal) -> bool {
        match self.groups.get_assigned_groups(user.user_id()) {
            Ok(groups) => groups.iter().any(|g| g == principals::ADMINISTRATORS_GROUP),
            Err(e) => {
                error!(user = user.user_id(), "Group lookup failed: {}", e);
                false
            }
        }
    }

    pub fn get_effective_permission(
        &self,
        user: &UserPrincipal,
        namespace: &str,
    ) -> Result<RepositoryPermission, RepositoryError> {
        self.authorizations.get_effective_permission(user, namespace)
    }

    pub fn is_authorized(
        &self,
        user: &UserPrincipal,
        namespace: &str,
        permission: RepositoryPermission,
    ) -> bool {
        if self.is_administrator(user) {
            return true;
        }
        let authorized = match self.authorizations.get_effective_permission(user, namespace) {
            Ok(effective) => effective >= permission,
            Err(e) => {
                error!(namespace, "Authorization lookup failed: {}", e);
                false
            }
        };
        if !authorized {
            self.audit
                .access(user.user_id(), namespace, permission.as_str(), false);
        }
        authorized
    }

    pub fn is_read_authorized(&self, user: &UserPrincipal, item: &RepositoryItem) -> bool {
        self.is_authorized(user, &item.namespace, RepositoryPermission::Read)
    }

    /// Write access additionally requires the item to still be a draft.
    pub fn is_write_authorized(&self, user: &UserPrincipal, item: &RepositoryItem) -> bool {
        if item.status != ItemStatus::Draft {
            debug!(
                library = %item.library_name,
                status = ?item.status,
                "Write rejected for non-draft item"
            );
            return false;
        }
        self.is_authorized(user, &item.namespace, RepositoryPermission::Write)
    }

    pub fn is_promote_authorized(&self, user: &UserPrincipal, item: &RepositoryItem) -> bool {
        self.is_authorized(user, &item.namespace, RepositoryPermission::Promote)
    }

    pub fn get_authorizations(
        &self,
        namespace: &str,
    ) -> Result<Arc<NamespaceAuthorizations>, RepositoryError> {
        self.authorizations.get_authorizations(namespace)
    }

    pub fn save_authorizations(
        &self,
        namespace: &str,
        authorizations: &NamespaceAuthorizations,
    ) -> Result<(), RepositoryError> {
        self.authorizations
            .save_authorizations(namespace, authorizations)?;
        self.audit
            .security_file_saved(layout::AUTHORIZATIONS_FILE, namespace);
        Ok(())
    }

    pub fn get_assigned_groups(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        self.groups.get_assigned_groups(user_id)
    }

    pub fn get_group_names(&self) -> Result<Vec<String>, RepositoryError> {
        self.groups.get_group_names()
    }

    pub fn get_assigned_users(&self, group_name: &str) -> Result<Vec<String>, RepositoryError> {
        self.groups.get_assigned_users(group_name)
    }

    pub fn save_group_assignments(&self, groups: &[UserGroup]) -> Result<(), RepositoryError> {
        self.groups.save_group_assignments(groups)?;
        self.audit
            .security_file_saved(layout::GROUP_ASSIGNMENTS_FILE, "repository");
        Ok(())
    }
}

fn provider_failure(e: RepositoryError) -> RepositorySecurityError {
    match e {
        RepositoryError::Security(inner) => inner,
        other => RepositorySecurityError::ProviderFailure(other.to_string()),
    }
}

/// Split `Basic base64(userId:password)` into its two parts.
pub fn parse_basic_credentials(header: &str) -> Result<(String, String), RepositorySecurityError> {
    let malformed = |reason: &str| RepositorySecurityError::MalformedAuthorizationHeader(reason.to_string());

    let (scheme, encoded) = header
        .trim()
        .split_once(' ')
        .ok_or_else(|| malformed("missing credentials"))?;
    if !scheme.eq_ignore_ascii_case(auth::BASIC_SCHEME) {
        return Err(malformed("unsupported scheme"));
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| malformed("invalid base64"))?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed("invalid UTF-8"))?;
    let (user_id, password) = decoded
        .split_once(':')
        .ok_or_else(|| malformed("missing ':' separator"))?;

    Ok((user_id.to_string(), password.to_string()))
}
