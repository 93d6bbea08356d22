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

//! Change sets: atomic multi-file mutations of the repository tree.
//!
//! A change set is started, the files it will touch are registered, new
//! content is written and the set is committed. Until commit, every
//! registered file can be restored to the bytes it held (or its absence)
//! when it was registered.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

use crate::engine_core::constants::layout;
use crate::engine_core::errors::RepositoryError;

/// An open transaction over one or more files.
pub trait ChangeSet {
    /// Register a file; its current content is captured for rollback.
    fn add_to_change_set(&mut self, path: &Path) -> Result<(), RepositoryError>;

    /// Replace the content of a registered file.
    fn write(&mut self, path: &Path, contents: &[u8]) -> Result<(), RepositoryError>;

    fn commit_change_set(self: Box<Self>) -> Result<(), RepositoryError>;

    /// Restore every registered file to its captured state.
    fn rollback_change_set(self: Box<Self>) -> Result<(), RepositoryError>;
}

pub trait ChangeSetManager: Send + Sync {
    /// Open a change set. Blocks while another change set is open.
    fn start_change_set(&self) -> Result<Box<dyn ChangeSet + '_>, RepositoryError>;
}

/// Run `mutation` inside a fresh change set.
///
/// On failure the change set is rolled back and the original error is
/// returned as `Persistence`. Rollback failures are logged only.
pub fn with_change_set<F>(manager: &dyn ChangeSetManager, mutation: F) -> Result<(), RepositoryError>
where
    F: FnOnce(&mut dyn ChangeSet) -> Result<(), RepositoryError>,
{
    let mut change_set = manager
        .start_change_set()
        .map_err(|e| RepositoryError::Persistence(format!("cannot start change set: {}", e)))?;

    if let Err(e) = mutation(change_set.as_mut()) {
        if let Err(rollback_error) = change_set.rollback_change_set() {
            error!("Rollback failed after persistence error: {}", rollback_error);
        }
        return Err(match e {
            RepositoryError::Persistence(_) => e,
            other => RepositoryError::Persistence(other.to_string()),
        });
    }

    change_set
        .commit_change_set()
        .map_err(|e| RepositoryError::Persistence(format!("commit failed: {}", e)))
}

/// File-system change sets rooted at a repository directory.
///
/// One change set is open at a time within the process (mutex) and across
/// processes (exclusive lock on `<root>/.changeset.lock`).
#[derive(Debug)]
pub struct FileChangeSetManager {
    root: PathBuf,
    in_process: Mutex<()>,
}

impl FileChangeSetManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            in_process: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ChangeSetManager for FileChangeSetManager {
    fn start_change_set(&self) -> Result<Box<dyn ChangeSet + '_>, RepositoryError> {
        let guard = self.in_process.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(&self.root)?;
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.root.join(layout::CHANGE_SET_LOCK_FILE))?;
        lock_file.lock_exclusive()?;
        debug!(root = %self.root.display(), "Change set started");

        Ok(Box::new(FileChangeSet {
            _guard: guard,
            lock_file,
            snapshots: Vec::new(),
            finished: false,
        }))
    }
}

struct FileChangeSet<'a> {
    _guard: MutexGuard<'a, ()>,
    lock_file: File,
    snapshots: Vec<(PathBuf, Option<Vec<u8>>)>,
    finished: bool,
}

impl FileChangeSet<'_> {
    fn is_registered(&self, path: &Path) -> bool {
        self.snapshots.iter().any(|(p, _)| p == path)
    }

    fn restore(&mut self) -> Result<(), RepositoryError> {
        let mut first_error = None;
        for (path, original) in self.snapshots.drain(..).rev() {
            let result = match original {
                Some(bytes) => write_atomically(&path, &bytes),
                None if path.exists() => fs::remove_file(&path),
                None => Ok(()),
            };
            if let Err(e) = result {
                warn!(path = %path.display(), "Failed to restore file: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(RepositoryError::Io(e)),
            None => Ok(()),
        }
    }

    fn release(&mut self) {
        self.finished = true;
        if let Err(e) = FileExt::unlock(&self.lock_file) {
            warn!("Failed to release change set lock: {}", e);
        }
    }
}

impl ChangeSet for FileChangeSet<'_> {
    fn add_to_change_set(&mut self, path: &Path) -> Result<(), RepositoryError> {
        if self.is_registered(path) {
            return Ok(());
        }
        let original = match fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        self.snapshots.push((path.to_path_buf(), original));
        Ok(())
    }

    fn write(&mut self, path: &Path, contents: &[u8]) -> Result<(), RepositoryError> {
        if !self.is_registered(path) {
            self.add_to_change_set(path)?;
        }
        write_atomically(path, contents)?;
        Ok(())
    }

    fn commit_change_set(mut self: Box<Self>) -> Result<(), RepositoryError> {
        self.snapshots.clear();
        self.release();
        debug!("Change set committed");
        Ok(())
    }

    fn rollback_change_set(mut self: Box<Self>) -> Result<(), RepositoryError> {
        let result = self.restore();
        self.release();
        debug!("Change set rolled back");
        result
    }
}

impl Drop for FileChangeSet<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Change set dropped without commit; rolling back");
        if let Err(e) = self.restore() {
            error!("Rollback of abandoned change set failed: {}", e);
        }
        self.release();
    }
}

/// Write to a sibling temp file then rename it over `path`.
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let mut temp = File::create(&temp_path)?;
    temp.write_all(contents)?;
    temp.sync_all()?;
    drop(temp);

    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_commit_keeps_new_content() {
        let dir = TempDir::new().unwrap();
        let manager = FileChangeSetManager::new(dir.path());
        let file = dir.path().join("security").join("a.yaml");

        with_change_set(&manager, |cs| {
            cs.add_to_change_set(&file)?;
            cs.write(&file, b"new")
        })
        .unwrap();

        assert_eq!(fs::read(&file).unwrap(), b"new");
    }

    #[test]
    fn test_failed_mutation_restores_prior_state() {
        let dir = TempDir::new().unwrap();
        let manager = FileChangeSetManager::new(dir.path());
        let existing = dir.path().join("existing.yaml");
        let created = dir.path().join("created.yaml");
        fs::write(&existing, b"old").unwrap();

        let result = with_change_set(&manager, |cs| {
            cs.write(&existing, b"changed")?;
            cs.write(&created, b"fresh")?;
            Err(RepositoryError::Serialization("boom".into()))
        });

        assert!(matches!(result, Err(RepositoryError::Persistence(_))));
        assert_eq!(fs::read(&existing).unwrap(), b"old");
        assert!(!created.exists());
    }

    #[test]
    fn test_dropped_change_set_rolls_back() {
        let dir = TempDir::new().unwrap();
        let manager = FileChangeSetManager::new(dir.path());
        let file = dir.path().join("dropped.yaml");
        {
            let mut cs = manager.start_change_set().unwrap();
            cs.write(&file, b"uncommitted").unwrap();
        }
        assert!(!file.exists());

        // The lock was released, so a new change set can start
        let cs = manager.start_change_set().unwrap();
        cs.commit_change_set().unwrap();
    }
}
