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

//! Flat-file user directory stored in `security/users.yaml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::engine_core::errors::{RepositoryError, RepositorySecurityError};
use crate::engine_core::models::UserInfo;
use crate::engine_core::password::PasswordValidator;
use crate::engine_core::traits::AuthenticationProvider;
use crate::persistence::{security_file, with_change_set, ChangeSetManager, SecurityFileLayout};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistry {
    #[serde(default)]
    pub users: Vec<UserInfo>,
}

impl UserRegistry {
    fn find(&self, user_id: &str) -> Option<&UserInfo> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    fn find_mut(&mut self, user_id: &str) -> Option<&mut UserInfo> {
        self.users.iter_mut().find(|u| u.user_id == user_id)
    }
}

pub struct FileAuthenticationProvider {
    path: PathBuf,
    change_sets: Arc<dyn ChangeSetManager>,
    validator: PasswordValidator,
    cache: RwLock<Option<Arc<UserRegistry>>>,
}

impl FileAuthenticationProvider {
    pub fn new(
        layout: &SecurityFileLayout,
        change_sets: Arc<dyn ChangeSetManager>,
        validator: PasswordValidator,
    ) -> Self {
        Self {
            path: layout.users(),
            change_sets,
            validator,
            cache: RwLock::new(None),
        }
    }

    pub fn validator(&self) -> &PasswordValidator {
        &self.validator
    }

    fn snapshot(&self) -> Result<Arc<UserRegistry>, RepositoryError> {
        if let Some(cached) = self.cache.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(Arc::clone(cached));
        }
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.as_ref() {
            return Ok(Arc::clone(cached));
        }
        let loaded = Arc::new(security_file::load(&self.path)?.unwrap_or_default());
        *cache = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Read-modify-write of the registry inside one change set.
    ///
    /// A rejection from `edit` leaves the file untouched and is returned as is.
    fn mutate<F>(&self, edit: F) -> Result<(), RepositoryError>
    where
        F: FnOnce(&mut UserRegistry) -> Result<(), RepositoryError>,
    {
        let mut rejection = None;
        with_change_set(self.change_sets.as_ref(), |cs| {
            let mut registry: UserRegistry = security_file::load(&self.path)?.unwrap_or_default();
            match edit(&mut registry) {
                Ok(()) => security_file::save(cs, &self.path, &registry),
                Err(e) => {
                    rejection = Some(e);
                    Ok(())
                }
            }
        })?;
        if let Some(e) = rejection {
            return Err(e);
        }

        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
        if let Err(e) = self.snapshot() {
            warn!("Reload of user registry failed: {}", e);
        }
        Ok(())
    }
}

fn unknown_user(user_id: &str) -> RepositoryError {
    RepositorySecurityError::UnknownUser(user_id.to_string()).into()
}

impl AuthenticationProvider for FileAuthenticationProvider {
    fn is_valid_user(&self, user_id: &str, password: &str) -> Result<bool, RepositoryError> {
        let registry = self.snapshot()?;
        let Some(stored) = registry.find(user_id).and_then(|u| u.encrypted_password.as_deref())
        else {
            debug!(user_id, "No stored password for user");
            return Ok(false);
        };
        self.validator.is_valid_password(password, stored)
    }

    fn get_user_info(&self, user_id: &str) -> Result<Option<UserInfo>, RepositoryError> {
        Ok(self.snapshot()?.find(user_id).map(UserInfo::without_password))
    }

    fn get_all_users(&self) -> Result<Vec<UserInfo>, RepositoryError> {
        let mut users: Vec<UserInfo> = self
            .snapshot()?
            .users
            .iter()
            .map(UserInfo::without_password)
            .collect();
        users.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(users)
    }

    fn add_user(&self, user: &UserInfo, password: &str) -> Result<(), RepositoryError> {
        if user.user_id.trim().is_empty() {
            return Err(RepositoryError::IllegalArgument("user id must not be empty".into()));
        }
        let mut record = user.clone();
        record.encrypted_password = Some(self.validator.encrypt_password(password)?);

        self.mutate(|registry| {
            if registry.find(&record.user_id).is_some() {
                return Err(RepositoryError::IllegalArgument(format!(
                    "user '{}' already exists",
                    record.user_id
                )));
            }
            registry.users.push(record);
            Ok(())
        })?;
        info!(user_id = %user.user_id, "User added");
        Ok(())
    }

    fn update_user(&self, user: &UserInfo) -> Result<(), RepositoryError> {
        self.mutate(|registry| {
            let existing = registry
                .find_mut(&user.user_id)
                .ok_or_else(|| unknown_user(&user.user_id))?;
            existing.last_name = user.last_name.clone();
            existing.first_name = user.first_name.clone();
            existing.email_address = user.email_address.clone();
            Ok(())
        })
    }

    fn delete_user(&self, user_id: &str) -> Result<(), RepositoryError> {
        self.mutate(|registry| {
            let before = registry.users.len();
            registry.users.retain(|u| u.user_id != user_id);
            if registry.users.len() == before {
                return Err(unknown_user(user_id));
            }
            Ok(())
        })?;
        info!(user_id, "User deleted");
        Ok(())
    }

    fn set_user_password(&self, user_id: &str, password: &str) -> Result<(), RepositoryError> {
        let encrypted = self.validator.encrypt_password(password)?;
        self.mutate(|registry| {
            let existing = registry
                .find_mut(user_id)
                .ok_or_else(|| unknown_user(user_id))?;
            existing.encrypted_password = Some(encrypted);
            Ok(())
        })
    }

    fn search_candidate_users(
        &self,
        criteria: &str,
        max_results: usize,
    ) -> Result<Vec<UserInfo>, RepositoryError> {
        let needle = criteria.trim().to_lowercase();
        let matches = |field: Option<&str>| {
            field
                .map(|value| value.to_lowercase().contains(&needle))
                .unwrap_or(false)
        };

        let mut found: Vec<UserInfo> = self
            .snapshot()?
            .users
            .iter()
            .filter(|u| {
                matches(Some(&u.user_id))
                    || matches(u.last_name.as_deref())
                    || matches(u.first_name.as_deref())
                    || matches(u.email_address.as_deref())
            })
            .map(UserInfo::without_password)
            .collect();
        found.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        found.truncate(max_results);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::FileChangeSetManager;
    use tempfile::TempDir;

    fn provider(dir: &TempDir) -> FileAuthenticationProvider {
        let layout = SecurityFileLayout::new(dir.path());
        let change_sets = Arc::new(FileChangeSetManager::new(dir.path()));
        let validator = PasswordValidator::new(Some("SHA-1"), None).unwrap();
        FileAuthenticationProvider::new(&layout, change_sets, validator)
    }

    fn user(id: &str, last: &str) -> UserInfo {
        UserInfo {
            last_name: Some(last.to_string()),
            ..UserInfo::new(id)
        }
    }

    #[test]
    fn test_add_and_verify_user() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);
        provider.add_user(&user("alice", "Smith"), "secret").unwrap();

        assert!(provider.is_valid_user("alice", "secret").unwrap());
        assert!(!provider.is_valid_user("alice", "wrong").unwrap());
        assert!(!provider.is_valid_user("nobody", "secret").unwrap());

        let info = provider.get_user_info("alice").unwrap().unwrap();
        assert!(info.encrypted_password.is_none());
    }

    #[test]
    fn test_duplicate_user_is_rejected_without_persistence_error() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);
        provider.add_user(&user("alice", "Smith"), "a").unwrap();
        let result = provider.add_user(&user("alice", "Jones"), "b");
        assert!(matches!(result, Err(RepositoryError::IllegalArgument(_))));
        assert_eq!(provider.get_all_users().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_user_mutations() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);
        let err = provider.delete_user("ghost").unwrap_err();
        assert_eq!(
            err.as_security(),
            Some(&RepositorySecurityError::UnknownUser("ghost".into()))
        );
    }

    #[test]
    fn test_search_is_case_insensitive_sorted_and_truncated() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);
        provider.add_user(&user("zoe", "Miller"), "x").unwrap();
        provider.add_user(&user("adam", "Millbrook"), "x").unwrap();
        provider.add_user(&user("bob", "Stone"), "x").unwrap();

        let found = provider.search_candidate_users("MILL", 10).unwrap();
        let ids: Vec<_> = found.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["adam", "zoe"]);

        assert_eq!(provider.search_candidate_users("", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_set_password_replaces_credentials() {
        let dir = TempDir::new().unwrap();
        let provider = provider(&dir);
        provider.add_user(&user("carol", "Diaz"), "old").unwrap();
        provider.set_user_password("carol", "new").unwrap();
        assert!(provider.is_valid_user("carol", "new").unwrap());
        assert!(!provider.is_valid_user("carol", "old").unwrap());
    }
}
