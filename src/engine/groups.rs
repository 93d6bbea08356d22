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

//! Group membership resource backed by `security/group-assignments.yaml`.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

use crate::engine_core::errors::RepositoryError;
use crate::engine_core::models::{GroupAssignments, UserGroup};
use crate::persistence::{security_file, with_change_set, ChangeSetManager, SecurityFileLayout};

pub struct GroupAssignmentsResource {
    path: PathBuf,
    change_sets: Arc<dyn ChangeSetManager>,
    cache: RwLock<Option<Arc<GroupAssignments>>>,
}

impl GroupAssignmentsResource {
    pub fn new(layout: &SecurityFileLayout, change_sets: Arc<dyn ChangeSetManager>) -> Self {
        Self {
            path: layout.group_assignments(),
            change_sets,
            cache: RwLock::new(None),
        }
    }

    /// Sorted names of the groups whose member list contains `user_id`.
    ///
    /// Member ids are matched case-insensitively.
    pub fn get_assigned_groups(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        let assignments = self.snapshot()?;
        Ok(assignments
            .groups
            .iter()
            .filter(|(_, members)| members.iter().any(|m| m.eq_ignore_ascii_case(user_id)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    pub fn get_group_names(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(self.snapshot()?.groups.keys().cloned().collect())
    }

    /// Sorted members of `group_name`; empty when the group does not exist.
    pub fn get_assigned_users(&self, group_name: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .snapshot()?
            .groups
            .get(group_name)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Replace the persisted group assignments with `groups`.
    pub fn save_group_assignments(&self, groups: &[UserGroup]) -> Result<(), RepositoryError> {
        let assignments = GroupAssignments::from_groups(groups);
        with_change_set(self.change_sets.as_ref(), |cs| {
            security_file::save(cs, &self.path, &assignments)
        })?;
        info!(groups = assignments.groups.len(), "Group assignments saved");
        self.refresh();
        Ok(())
    }

    fn snapshot(&self) -> Result<Arc<GroupAssignments>, RepositoryError> {
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

    fn refresh(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
        if let Err(e) = self.snapshot() {
            warn!("Reload of group assignments failed: {}", e);
        }
    }
}
