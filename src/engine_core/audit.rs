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

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    AuthenticationSucceeded,
    AuthenticationFailed,
    AccessGranted,
    AccessDenied,
    SecurityFileSaved,
}

#[derive(Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    event_type: AuditEventType,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

/// Emits security audit records on the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityAuditLogger;

impl SecurityAuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn log(&self, event_type: AuditEventType, user_id: &str, details: Option<Value>) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            event_type,
            user_id,
            details: details.as_ref(),
        };
        let payload = serde_json::to_string(&entry).unwrap_or_default();

        match event_type {
            AuditEventType::AuthenticationFailed | AuditEventType::AccessDenied => {
                warn!(target: "audit", payload = %payload, "SECURITY_AUDIT")
            }
            _ => info!(target: "audit", payload = %payload, "SECURITY_AUDIT"),
        }
    }

    pub fn authentication(&self, user_id: &str, succeeded: bool) {
        let event_type = if succeeded {
            AuditEventType::AuthenticationSucceeded
        } else {
            AuditEventType::AuthenticationFailed
        };
        self.log(event_type, user_id, None);
    }

    pub fn security_file_saved(&self, file: &str, scope: &str) {
        self.log(
            AuditEventType::SecurityFileSaved,
            "system",
            Some(serde_json::json!({ "file": file, "scope": scope })),
        );
    }

    pub fn access(&self, user_id: &str, namespace: &str, permission: &str, granted: bool) {
        let event_type = if granted {
            AuditEventType::AccessGranted
        } else {
            AuditEventType::AccessDenied
        };
        self.log(
            event_type,
            user_id,
            Some(serde_json::json!({ "namespace": namespace, "permission": permission })),
        );
    }
}
