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

//! Security file load/save and the on-disk layout of security files.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engine_core::constants::layout;
use crate::engine_core::errors::RepositoryError;
use crate::persistence::change_set::ChangeSet;

/// Load a YAML security file. A missing file yields `None`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, RepositoryError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Security file not present");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    serde_yaml_ng::from_str(&content).map(Some).map_err(|e| {
        RepositoryError::Serialization(format!("invalid security file {}: {}", path.display(), e))
    })
}

/// Serialize `value` and write it through an open change set.
pub fn save<T: Serialize>(
    change_set: &mut dyn ChangeSet,
    path: &Path,
    value: &T,
) -> Result<(), RepositoryError> {
    let content =
        serde_yaml_ng::to_string(value).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    change_set.add_to_change_set(path)?;
    change_set.write(path, content.as_bytes())
}

/// Locations of the security files below a repository root.
#[derive(Debug, Clone)]
pub struct SecurityFileLayout {
    root: PathBuf,
}

impl SecurityFileLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn group_assignments(&self) -> PathBuf {
        self.root
            .join(layout::SECURITY_FOLDER)
            .join(layout::GROUP_ASSIGNMENTS_FILE)
    }

    pub fn users(&self) -> PathBuf {
        self.root.join(layout::SECURITY_FOLDER).join(layout::USERS_FILE)
    }

    /// `namespaces/<scheme>/<authority>/<path...>/authorizations.yaml` for a
    /// namespace URI. Segments are percent-encoded, so distinct namespaces
    /// never share a file.
    pub fn namespace_authorizations(&self, namespace: &str) -> Result<PathBuf, RepositoryError> {
        let mut path = self.root.join(layout::NAMESPACES_FOLDER);
        for segment in namespace_segments(namespace)? {
            path.push(segment);
        }
        path.push(layout::AUTHORIZATIONS_FILE);
        Ok(path)
    }
}

/// Split a namespace URI into scheme, authority and path folder names.
///
/// Queries, fragments and empty inner segments have no folder form and are
/// rejected.
fn namespace_segments(namespace: &str) -> Result<Vec<String>, RepositoryError> {
    let invalid = || RepositoryError::IllegalArgument(format!("invalid namespace '{}'", namespace));

    let (scheme, rest) = namespace.split_once("://").ok_or_else(invalid)?;
    if scheme.is_empty() || rest.contains(['?', '#', '\\']) {
        return Err(invalid());
    }
    let rest = rest.strip_suffix('/').unwrap_or(rest);

    let mut segments = vec![encode_segment(scheme)];
    for segment in rest.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
        segments.push(encode_segment(segment));
    }
    Ok(segments)
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_path_layout() {
        let layout = SecurityFileLayout::new("/repo");
        let path = layout
            .namespace_authorizations("http://www.example.com/ns/test/v1")
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/repo/namespaces/http/www.example.com/ns/test/v1/authorizations.yaml")
        );
    }

    #[test]
    fn test_namespace_rejects_traversal() {
        let layout = SecurityFileLayout::new("/repo");
        assert!(layout
            .namespace_authorizations("http://example.com/../../etc")
            .is_err());
        assert!(layout.namespace_authorizations("not-a-uri").is_err());
        assert!(layout.namespace_authorizations("http:///nohost").is_err());
        assert!(layout.namespace_authorizations("http://example.com/a//b").is_err());
        assert!(layout.namespace_authorizations("http://example.com/a?v=1").is_err());
        assert!(layout.namespace_authorizations("http://example.com/a#frag").is_err());
    }

    #[test]
    fn test_distinct_namespaces_map_to_distinct_files() {
        let layout = SecurityFileLayout::new("/repo");
        let pairs = [
            ("http://host:8080/ns", "http://host_8080/ns"),
            ("http://host:8080/ns", "http://host%3A8080/ns"),
            ("http://x.com/a", "https://x.com/a"),
            ("http://x.com/a b", "http://x.com/a%20b"),
        ];
        for (left, right) in pairs {
            assert_ne!(
                layout.namespace_authorizations(left).unwrap(),
                layout.namespace_authorizations(right).unwrap(),
                "{} and {} share a file",
                left,
                right
            );
        }
        assert_eq!(
            layout.namespace_authorizations("http://x.com/a/").unwrap(),
            layout.namespace_authorizations("http://x.com/a").unwrap()
        );
        assert!(layout
            .namespace_authorizations("http://host:8080/ns")
            .unwrap()
            .ends_with("http/host%3A8080/ns/authorizations.yaml"));
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let loaded: Option<Vec<String>> = load(&dir.path().join("missing.yaml")).unwrap();
        assert!(loaded.is_none());
    }
}
