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

//! Seams between the security core and its collaborators.
//!
//! `AuthenticationProvider` is the user directory the security manager
//! verifies credentials against. `RepositoryListener` is implemented by every
//! consumer of repository lifecycle events.

use async_trait::async_trait;

use crate::engine_core::errors::RepositoryError;
use crate::engine_core::events::RepositoryEvent;
use crate::engine_core::models::UserInfo;

/// User directory used for credential checks and account management.
pub trait AuthenticationProvider: Send + Sync {
    /// Returns true if the user exists and the password matches its stored value.
    fn is_valid_user(&self, user_id: &str, password: &str) -> Result<bool, RepositoryError>;

    /// Profile of a single user, without its stored password.
    fn get_user_info(&self, user_id: &str) -> Result<Option<UserInfo>, RepositoryError>;

    fn get_all_users(&self) -> Result<Vec<UserInfo>, RepositoryError>;

    /// Create a user; `password` is stored in encrypted form.
    fn add_user(&self, user: &UserInfo, password: &str) -> Result<(), RepositoryError>;

    fn update_user(&self, user: &UserInfo) -> Result<(), RepositoryError>;

    fn delete_user(&self, user_id: &str) -> Result<(), RepositoryError>;

    fn set_user_password(&self, user_id: &str, password: &str) -> Result<(), RepositoryError>;

    /// Users whose id, names or email contain `criteria`, at most `max_results`.
    fn search_candidate_users(
        &self,
        criteria: &str,
        max_results: usize,
    ) -> Result<Vec<UserInfo>, RepositoryError>;
}

/// Consumer of repository lifecycle events.
///
/// Implementations must not fail the mutation that raised the event; delivery
/// problems are logged by the listener itself.
#[async_trait]
pub trait RepositoryListener: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_event(&self, event: &RepositoryEvent);
}
