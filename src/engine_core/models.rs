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

//! Domain models for the repository security core.
//!
//! This module contains pure data structures representing principals, groups,
//! permissions, namespace authorizations and repository items. It is designed
//! to be free of I/O side effects.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::engine_core::constants::principals::ANONYMOUS_USER_ID;

/// An authenticated (or anonymous) user together with its group memberships.
///
/// The authorization id set is derived at construction and always contains
/// the anonymous id and the user's own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    user_id: String,
    last_name: Option<String>,
    first_name: Option<String>,
    email_address: Option<String>,
    assigned_groups: BTreeSet<String>,
    authorization_ids: BTreeSet<String>,
}

impl UserPrincipal {
    pub fn new(user_id: impl Into<String>, assigned_groups: impl IntoIterator<Item = String>) -> Self {
        let user_id = user_id.into();
        let assigned_groups: BTreeSet<String> = assigned_groups.into_iter().collect();
        let mut authorization_ids = assigned_groups.clone();
        authorization_ids.insert(ANONYMOUS_USER_ID.to_string());
        authorization_ids.insert(user_id.clone());

        Self {
            user_id,
            last_name: None,
            first_name: None,
            email_address: None,
            assigned_groups,
            authorization_ids,
        }
    }

    /// Principal used for requests that carry no credentials at all.
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER_ID, Vec::new())
    }

    /// Copies the profile fields of a provider record onto this principal.
    pub fn with_profile(mut self, info: &UserInfo) -> Self {
        self.last_name = info.last_name.clone();
        self.first_name = info.first_name.clone();
        self.email_address = info.email_address.clone();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    pub fn first_name(&self) -> Option<&str> {
        self.first_name.as_deref()
    }

    pub fn email_address(&self) -> Option<&str> {
        self.email_address.as_deref()
    }

    pub fn assigned_groups(&self) -> &BTreeSet<String> {
        &self.assigned_groups
    }

    pub fn authorization_ids(&self) -> &BTreeSet<String> {
        &self.authorization_ids
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }
}

/// A named group with its ordered member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    pub group_name: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

impl UserGroup {
    pub fn new(group_name: impl Into<String>, member_ids: Vec<String>) -> Self {
        Self {
            group_name: group_name.into(),
            member_ids,
        }
    }
}

/// Provider-side user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,
}

impl UserInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            last_name: None,
            first_name: None,
            email_address: None,
            encrypted_password: None,
        }
    }

    /// Copy of this record with the stored password removed.
    pub fn without_password(&self) -> Self {
        Self {
            encrypted_password: None,
            ..self.clone()
        }
    }
}

/// Repository permissions, totally ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryPermission {
    None,
    Read,
    Write,
    Promote,
}

impl RepositoryPermission {
    pub const ALL: [RepositoryPermission; 4] = [
        RepositoryPermission::None,
        RepositoryPermission::Read,
        RepositoryPermission::Write,
        RepositoryPermission::Promote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryPermission::None => "NONE",
            RepositoryPermission::Read => "READ",
            RepositoryPermission::Write => "WRITE",
            RepositoryPermission::Promote => "PROMOTE",
        }
    }
}

impl fmt::Display for RepositoryPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepositoryPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(RepositoryPermission::None),
            "READ" => Ok(RepositoryPermission::Read),
            "WRITE" => Ok(RepositoryPermission::Write),
            "PROMOTE" => Ok(RepositoryPermission::Promote),
            other => Err(format!("unknown permission '{}'", other)),
        }
    }
}

/// One grant or deny entry: a permission and the principals it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationSpec {
    pub permission: RepositoryPermission,
    #[serde(default)]
    pub principals: BTreeSet<String>,
}

impl AuthorizationSpec {
    pub fn new<I, S>(permission: RepositoryPermission, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            permission,
            principals: principals.into_iter().map(Into::into).collect(),
        }
    }

    /// True when any of the given authorization ids is named by this entry
    pub fn applies_to(&self, authorization_ids: &BTreeSet<String>) -> bool {
        !self.principals.is_disjoint(authorization_ids)
    }
}

/// Grants and denies recorded for a single namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceAuthorizations {
    #[serde(default)]
    pub grants: Vec<AuthorizationSpec>,
    #[serde(default)]
    pub denies: Vec<AuthorizationSpec>,
}

impl NamespaceAuthorizations {
    pub fn grant<I, S>(mut self, permission: RepositoryPermission, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants.push(AuthorizationSpec::new(permission, principals));
        self
    }

    pub fn deny<I, S>(mut self, permission: RepositoryPermission, principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denies.push(AuthorizationSpec::new(permission, principals));
        self
    }
}

/// Persisted form of the group assignments file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignments {
    #[serde(default)]
    pub groups: BTreeMap<String, BTreeSet<String>>,
}

impl GroupAssignments {
    pub fn from_groups(groups: &[UserGroup]) -> Self {
        let mut assignments = Self::default();
        for group in groups {
            assignments
                .groups
                .entry(group.group_name.clone())
                .or_default()
                .extend(group.member_ids.iter().cloned());
        }
        assignments
    }
}

/// Library lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Draft,
    UnderReview,
    Final,
    Obsolete,
}

/// Lock state of a managed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemState {
    ManagedUnlocked,
    ManagedLocked,
    ManagedWip,
}

/// Metadata of a library managed by the repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryItem {
    pub namespace: String,
    pub base_namespace: String,
    pub library_name: String,
    pub version: String,
    pub filename: String,
    pub status: ItemStatus,
    pub state: ItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by_user: Option<String>,
}

impl RepositoryItem {
    /// Draft, unlocked item whose base namespace equals its namespace.
    pub fn draft(
        namespace: impl Into<String>,
        library_name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let library_name = library_name.into();
        let version = version.into();
        Self {
            base_namespace: namespace.clone(),
            filename: format!("{}_{}.otm", library_name, version.replace('.', "_")),
            namespace,
            library_name,
            version,
            status: ItemStatus::Draft,
            state: ItemState::ManagedUnlocked,
            locked_by_user: None,
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }
}
