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

//! Repository core constants - Single source of truth for names and defaults.
//!
//! This module centralizes well-known principal ids, file layout names,
//! message destinations and timer defaults so that every component agrees
//! on them.

/// Well-known principals
pub mod principals {
    /// Authorization id carried by every principal, including unauthenticated ones
    pub const ANONYMOUS_USER_ID: &str = "anonymous";
    /// Members of this group bypass namespace grant/deny resolution
    pub const ADMINISTRATORS_GROUP: &str = "Administrators";
}

/// Password storage prefixes
pub mod password {
    pub const MD5_PREFIX: &str = "{MD5}";
    pub const SHA_PREFIX: &str = "{SHA}";
    pub const SSHA_PREFIX: &str = "{SSHA}";
    /// Salt length used when producing new `{SSHA}` values
    pub const SALT_LENGTH: usize = 8;
    /// Charset used when none is configured
    pub const DEFAULT_CHARSET: &str = "UTF-8";
}

/// Security file layout relative to the repository root
pub mod layout {
    pub const SECURITY_FOLDER: &str = "security";
    pub const NAMESPACES_FOLDER: &str = "namespaces";
    pub const GROUP_ASSIGNMENTS_FILE: &str = "group-assignments.yaml";
    pub const USERS_FILE: &str = "users.yaml";
    pub const AUTHORIZATIONS_FILE: &str = "authorizations.yaml";
    /// Cross-process writer lock taken for the lifetime of a change set
    pub const CHANGE_SET_LOCK_FILE: &str = ".changeset.lock";
}

/// HTTP-style authorization header handling
pub mod auth {
    pub const BASIC_SCHEME: &str = "Basic";
}

/// Message destinations and frame headers
pub mod messaging {
    pub const NOTIFICATION_DESTINATION: &str = "otm.repository.notifications";
    pub const INDEXING_JOB_DESTINATION: &str = "otm.repository.index.jobs";
    pub const INDEXING_RESPONSE_DESTINATION: &str = "otm.repository.index.responses";
    pub const HEADER_CONTENT_LENGTH: &str = "content-length";
    pub const HEADER_DESTINATION: &str = "destination";
    pub const HEADER_COMMAND: &str = "command";
    pub const COMMAND_SEND: &str = "SEND";
    pub const COMMAND_SUBSCRIBE: &str = "SUBSCRIBE";
}

/// Timer defaults (milliseconds)
pub mod timers {
    pub const DEFAULT_WORKER_WAKE_INTERVAL_MS: u64 = 10_000;
    pub const DEFAULT_RECONNECT_BACKOFF_MS: u64 = 10_000;
    pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 5_000;
    pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 10_000;
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_REPOSITORY_ROOT: &str = "OTM_REPOSITORY_ROOT";
    pub const ENV_DIGEST_ALGORITHM: &str = "OTM_DIGEST_ALGORITHM";
    pub const ENV_PASSWORD_CHARSET: &str = "OTM_PASSWORD_CHARSET";
    pub const ENV_BROKER_ADDRESS: &str = "OTM_BROKER_ADDRESS";
    pub const ENV_NOTIFICATIONS_ENABLED: &str = "OTM_NOTIFICATIONS_ENABLED";
    pub const ENV_INDEXING_ENABLED: &str = "OTM_INDEXING_ENABLED";
    pub const ENV_WORKER_WAKE_INTERVAL_MS: &str = "OTM_WORKER_WAKE_INTERVAL_MS";
    pub const ENV_RECONNECT_BACKOFF_MS: &str = "OTM_RECONNECT_BACKOFF_MS";
    pub const ENV_RECEIVE_TIMEOUT_MS: &str = "OTM_RECEIVE_TIMEOUT_MS";
    pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "OTM_SHUTDOWN_TIMEOUT_MS";
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
}

/// Transport Limits (DoS Protection)
pub mod limits {
    /// Maximum allowed message body size (10 MB)
    pub const MAX_MESSAGE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
    /// Maximum header block size before a frame is rejected
    pub const MAX_HEADER_SIZE_BYTES: usize = 4096;
}
