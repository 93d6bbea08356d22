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

use crate::engine_core::constants::{config as keys, password, timers};
use crate::engine_core::errors::RepositoryError;
use crate::engine_core::password::DigestAlgorithm;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub repository_root: PathBuf,
    /// `None` selects passthrough password comparison
    pub digest_algorithm: Option<String>,
    pub password_charset: String,
    pub broker_address: Option<String>,
    pub notifications_enabled: bool,
    pub indexing_enabled: bool,
    pub worker_wake_interval_ms: u64,
    pub reconnect_backoff_ms: u64,
    pub receive_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

fn env_millis(key: &str, default: u64) -> Result<u64, RepositoryError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
            RepositoryError::Configuration(format!("{} must be a number of milliseconds", key))
        }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, RepositoryError> {
        let defaults = Self::default();
        let config = Self {
            repository_root: env::var(keys::ENV_REPOSITORY_ROOT)
                .map(PathBuf::from)
                .unwrap_or(defaults.repository_root),
            digest_algorithm: env::var(keys::ENV_DIGEST_ALGORITHM)
                .ok()
                .filter(|s| !s.trim().is_empty()),
            password_charset: env::var(keys::ENV_PASSWORD_CHARSET)
                .unwrap_or(defaults.password_charset),
            broker_address: env::var(keys::ENV_BROKER_ADDRESS).ok(),
            notifications_enabled: env::var(keys::ENV_NOTIFICATIONS_ENABLED)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.notifications_enabled),
            indexing_enabled: env::var(keys::ENV_INDEXING_ENABLED)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.indexing_enabled),
            worker_wake_interval_ms: env_millis(
                keys::ENV_WORKER_WAKE_INTERVAL_MS,
                defaults.worker_wake_interval_ms,
            )?,
            reconnect_backoff_ms: env_millis(
                keys::ENV_RECONNECT_BACKOFF_MS,
                defaults.reconnect_backoff_ms,
            )?,
            receive_timeout_ms: env_millis(keys::ENV_RECEIVE_TIMEOUT_MS, defaults.receive_timeout_ms)?,
            shutdown_timeout_ms: env_millis(
                keys::ENV_SHUTDOWN_TIMEOUT_MS,
                defaults.shutdown_timeout_ms,
            )?,
            log_level: env::var(keys::ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_format: env::var(keys::ENV_LOG_FORMAT).unwrap_or(defaults.log_format),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RepositoryError> {
        if let Some(algorithm) = &self.digest_algorithm {
            DigestAlgorithm::from_str(algorithm)?;
        }
        if (self.notifications_enabled || self.indexing_enabled) && self.broker_address.is_none() {
            return Err(RepositoryError::Configuration(format!(
                "{} is required when notifications or indexing are enabled",
                keys::ENV_BROKER_ADDRESS
            )));
        }
        for (name, value) in [
            (keys::ENV_WORKER_WAKE_INTERVAL_MS, self.worker_wake_interval_ms),
            (keys::ENV_RECONNECT_BACKOFF_MS, self.reconnect_backoff_ms),
            (keys::ENV_RECEIVE_TIMEOUT_MS, self.receive_timeout_ms),
            (keys::ENV_SHUTDOWN_TIMEOUT_MS, self.shutdown_timeout_ms),
        ] {
            if value == 0 {
                return Err(RepositoryError::Configuration(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn worker_wake_interval(&self) -> Duration {
        Duration::from_millis(self.worker_wake_interval_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_root: PathBuf::from("repository"),
            digest_algorithm: None,
            password_charset: password::DEFAULT_CHARSET.to_string(),
            broker_address: None,
            notifications_enabled: false,
            indexing_enabled: false,
            worker_wake_interval_ms: timers::DEFAULT_WORKER_WAKE_INTERVAL_MS,
            reconnect_backoff_ms: timers::DEFAULT_RECONNECT_BACKOFF_MS,
            receive_timeout_ms: timers::DEFAULT_RECEIVE_TIMEOUT_MS,
            shutdown_timeout_ms: timers::DEFAULT_SHUTDOWN_TIMEOUT_MS,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
