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

//! Credential verification against stored password digests.
//!
//! Stored values come in four shapes, selected by prefix:
//! plain hex digest, `{MD5}`/`{SHA}` base64 digest, and `{SSHA}` salted
//! base64 digest. When no algorithm is configured the validator runs in
//! passthrough mode and compares raw strings.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use sha2::digest::DynDigest;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::engine_core::constants::password;
use crate::engine_core::errors::RepositoryError;

/// Digest algorithms accepted for stored passwords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    fn new_hasher(&self) -> Box<dyn DynDigest + Send> {
        match self {
            DigestAlgorithm::Md5 => Box::new(md5::Md5::default()),
            DigestAlgorithm::Sha1 => Box::new(sha1::Sha1::default()),
            DigestAlgorithm::Sha256 => Box::new(sha2::Sha256::default()),
            DigestAlgorithm::Sha512 => Box::new(sha2::Sha512::default()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MD5" => Ok(DigestAlgorithm::Md5),
            "SHA" | "SHA1" | "SHA-1" => Ok(DigestAlgorithm::Sha1),
            "SHA256" | "SHA-256" => Ok(DigestAlgorithm::Sha256),
            "SHA512" | "SHA-512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(RepositoryError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Verifies credentials against stored password values.
///
/// One digest instance is shared by all callers; each reset/update/finalize
/// sequence holds its lock for the full computation.
pub struct PasswordValidator {
    algorithm: Option<DigestAlgorithm>,
    digest: Option<Mutex<Box<dyn DynDigest + Send>>>,
    charset: String,
}

impl fmt::Debug for PasswordValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordValidator")
            .field("algorithm", &self.algorithm)
            .field("charset", &self.charset)
            .finish()
    }
}

impl PasswordValidator {
    /// Create a validator for the named algorithm and charset.
    ///
    /// `None` for the algorithm selects passthrough mode. An unknown algorithm
    /// name fails here; an unknown charset only fails when a digest is computed.
    pub fn new(algorithm: Option<&str>, charset: Option<&str>) -> Result<Self, RepositoryError> {
        let algorithm = algorithm
            .filter(|name| !name.trim().is_empty())
            .map(DigestAlgorithm::from_str)
            .transpose()?;
        Ok(Self::with_algorithm(algorithm, charset))
    }

    pub fn with_algorithm(algorithm: Option<DigestAlgorithm>, charset: Option<&str>) -> Self {
        Self {
            algorithm,
            digest: algorithm.map(|a| Mutex::new(a.new_hasher())),
            charset: charset.unwrap_or(password::DEFAULT_CHARSET).to_string(),
        }
    }

    /// Validator that compares raw strings.
    pub fn passthrough() -> Self {
        Self::with_algorithm(None, None)
    }

    pub fn algorithm(&self) -> Option<DigestAlgorithm> {
        self.algorithm
    }

    pub fn is_passthrough(&self) -> bool {
        self.digest.is_none()
    }

    /// Returns true if `credentials` matches the stored password value.
    pub fn is_valid_password(
        &self,
        credentials: &str,
        stored_password: &str,
    ) -> Result<bool, RepositoryError> {
        if self.is_passthrough() {
            return Ok(credentials == stored_password);
        }

        if let Some(encoded) = stored_password.strip_prefix(password::SSHA_PREFIX) {
            return self.matches_salted(credentials, encoded);
        }

        if let Some(encoded) = stored_password
            .strip_prefix(password::MD5_PREFIX)
            .or_else(|| stored_password.strip_prefix(password::SHA_PREFIX))
        {
            let hash = self.digest(credentials, None)?;
            return Ok(STANDARD.encode(hash) == encoded);
        }

        let hash = self.digest(credentials, None)?;
        Ok(hex::encode(hash).eq_ignore_ascii_case(stored_password))
    }

    /// Produce the stored form of a new password.
    ///
    /// With a digest configured this is `{SSHA}` over a fresh random salt;
    /// in passthrough mode the password is stored as given.
    pub fn encrypt_password(&self, plain: &str) -> Result<String, RepositoryError> {
        if self.is_passthrough() {
            return Ok(plain.to_string());
        }
        let mut salt = [0u8; password::SALT_LENGTH];
        rand::rng().fill(&mut salt[..]);

        let mut value = self.digest(plain, Some(&salt))?;
        value.extend_from_slice(&salt);
        Ok(format!("{}{}", password::SSHA_PREFIX, STANDARD.encode(value)))
    }

    fn matches_salted(&self, credentials: &str, encoded: &str) -> Result<bool, RepositoryError> {
        let decoded = match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Stored {{SSHA}} value is not valid base64: {}", e);
                return Ok(false);
            }
        };

        let hash_len = self.hash_length();
        if decoded.len() <= hash_len {
            warn!(
                expected_hash_len = hash_len,
                actual_len = decoded.len(),
                "Stored {{SSHA}} value too short for configured digest"
            );
            return Ok(false);
        }

        let (expected, salt) = decoded.split_at(hash_len);
        let actual = self.digest(credentials, Some(salt))?;
        Ok(bool::from(actual.as_slice().ct_eq(expected)))
    }

    fn hash_length(&self) -> usize {
        self.digest
            .as_ref()
            .map(|d| d.lock().unwrap_or_else(|e| e.into_inner()).output_size())
            .unwrap_or(0)
    }

    fn digest(&self, credentials: &str, salt: Option<&[u8]>) -> Result<Vec<u8>, RepositoryError> {
        let bytes = self.encode(credentials)?;
        let Some(digest) = &self.digest else {
            return Err(RepositoryError::Configuration(
                "no digest algorithm configured".to_string(),
            ));
        };

        let mut hasher = digest.lock().unwrap_or_else(|e| e.into_inner());
        hasher.reset();
        hasher.update(&bytes);
        if let Some(salt) = salt {
            hasher.update(salt);
        }
        Ok(hasher.finalize_reset().into_vec())
    }

    fn encode(&self, credentials: &str) -> Result<Vec<u8>, RepositoryError> {
        let charset = self.charset.trim().to_ascii_uppercase().replace('_', "-");
        match charset.as_str() {
            "UTF-8" | "UTF8" => Ok(credentials.as_bytes().to_vec()),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => credentials
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        RepositoryError::IllegalArgument(format!(
                            "character U+{:04X} is not representable in {}",
                            u32::from(c),
                            self.charset
                        ))
                    })
                })
                .collect(),
            "US-ASCII" | "ASCII" => {
                if credentials.is_ascii() {
                    Ok(credentials.as_bytes().to_vec())
                } else {
                    Err(RepositoryError::IllegalArgument(format!(
                        "credentials are not representable in {}",
                        self.charset
                    )))
                }
            }
            _ => Err(RepositoryError::IllegalArgument(format!(
                "unsupported charset '{}'",
                self.charset
            ))),
        }
    }
}
