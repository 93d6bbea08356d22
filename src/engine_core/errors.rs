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

// Domain error types - Secure error handling with no information disclosure

use thiserror::Error;

/// Main error type for repository security operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Authentication or access failure (HTTP 401/403)
    #[error("Security error: {0}")]
    Security(#[from] RepositorySecurityError),

    /// A security file could not be persisted; the change set was rolled back
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Caller supplied a value the operation cannot process (e.g. unknown charset)
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// Digest algorithm is not supported (fatal at construction)
    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Security file content could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O Error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication and authorization failures.
///
/// Kept distinct from [`RepositoryError`] so callers can map every variant
/// to an access-denied response without inspecting messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositorySecurityError {
    /// User id / password pair was rejected
    #[error("Invalid user credentials")]
    InvalidCredentials,

    /// The authorization header is not a well-formed Basic credential
    #[error("Malformed authorization header: {0}")]
    MalformedAuthorizationHeader(String),

    /// No such user is known to the authentication provider
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The authentication provider itself failed
    #[error("Authentication provider failure: {0}")]
    ProviderFailure(String),

    /// The principal lacks the permission required for an operation
    #[error("Access denied: {0}")]
    AccessDenied(String),
}

impl RepositorySecurityError {
    /// HTTP status a front end should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            RepositorySecurityError::AccessDenied(_) => 403,
            _ => 401,
        }
    }

    /// Get user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            RepositorySecurityError::InvalidCredentials
            | RepositorySecurityError::UnknownUser(_)
            | RepositorySecurityError::MalformedAuthorizationHeader(_) => {
                "Authentication failed".to_string()
            }
            RepositorySecurityError::ProviderFailure(_) => {
                "Authentication service unavailable".to_string()
            }
            RepositorySecurityError::AccessDenied(reason) => format!("Access denied: {}", reason),
        }
    }
}

impl RepositoryError {
    /// Get user-friendly error message.
    pub fn user_message(&self) -> String {
        match self {
            RepositoryError::Security(e) => e.user_message(),
            RepositoryError::IllegalArgument(reason) => format!("Invalid request: {}", reason),
            RepositoryError::Persistence(_) => "Repository update failed".to_string(),
            RepositoryError::UnsupportedAlgorithm(_) | RepositoryError::Configuration(_) => {
                "Internal error".to_string()
            }
            RepositoryError::Serialization(_) => "Internal error".to_string(),
            RepositoryError::Io(_) => "Internal system error".to_string(),
        }
    }

    /// Returns the security error if this failure is authentication/authorization related.
    pub fn as_security(&self) -> Option<&RepositorySecurityError> {
        match self {
            RepositoryError::Security(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_status_mapping() {
        assert_eq!(RepositorySecurityError::InvalidCredentials.http_status(), 401);
        assert_eq!(
            RepositorySecurityError::AccessDenied("write".into()).http_status(),
            403
        );
    }

    #[test]
    fn test_user_message_does_not_leak_user_ids() {
        let err = RepositoryError::from(RepositorySecurityError::UnknownUser("bob".into()));
        assert!(!err.user_message().contains("bob"));
        assert!(err.as_security().is_some());
    }
}
