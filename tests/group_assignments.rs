mod common;

use otm_repository_core::engine::groups::GroupAssignmentsResource;
use otm_repository_core::engine_core::errors::RepositoryError;
use otm_repository_core::engine_core::models::{NamespaceAuthorizations, RepositoryPermission, UserGroup};
use otm_repository_core::persistence::{
    ChangeSet, ChangeSetManager, FileChangeSetManager, SecurityFileLayout,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_save_then_read_reflects_exactly_the_saved_groups() {
    let dir = TempDir::new().unwrap();
    let security = common::security_manager(&dir);

    security
        .save_group_assignments(&[
            UserGroup::new("Writers", vec!["zed".into(), "amy".into()]),
            UserGroup::new("Auditors", vec!["amy".into()]),
        ])
        .unwrap();
    assert_eq!(security.get_group_names().unwrap(), vec!["Auditors", "Writers"]);
    assert_eq!(security.get_assigned_users("Writers").unwrap(), vec!["amy", "zed"]);
    assert_eq!(security.get_assigned_groups("amy").unwrap(), vec!["Auditors", "Writers"]);

    // Full replace: groups absent from the new set disappear
    security
        .save_group_assignments(&[UserGroup::new("Editors", vec!["zed".into()])])
        .unwrap();
    assert_eq!(security.get_group_names().unwrap(), vec!["Editors"]);
    assert!(security.get_assigned_users("Writers").unwrap().is_empty());
    assert!(security.get_assigned_groups("amy").unwrap().is_empty());
}

#[test]
fn test_saved_groups_survive_a_fresh_resource() {
    let dir = TempDir::new().unwrap();
    let layout = SecurityFileLayout::new(dir.path());
    let change_sets = Arc::new(FileChangeSetManager::new(dir.path()));

    GroupAssignmentsResource::new(&layout, change_sets.clone())
        .save_group_assignments(&[UserGroup::new("Readers", vec!["bob".into()])])
        .unwrap();

    let reloaded = GroupAssignmentsResource::new(&layout, change_sets);
    assert_eq!(reloaded.get_assigned_groups("bob").unwrap(), vec!["Readers"]);
    assert!(layout.group_assignments().exists());
}

/// Change sets whose writes always fail after registering the file.
struct FailingWrites {
    inner: FileChangeSetManager,
}

struct FailingChangeSet<'a> {
    inner: Box<dyn ChangeSet + 'a>,
}

impl ChangeSet for FailingChangeSet<'_> {
    fn add_to_change_set(&mut self, path: &Path) -> Result<(), RepositoryError> {
        self.inner.add_to_change_set(path)
    }

    fn write(&mut self, path: &Path, contents: &[u8]) -> Result<(), RepositoryError> {
        self.inner.write(path, &contents[..contents.len() / 2])?;
        Err(RepositoryError::Io(std::io::Error::other("disk full")))
    }

    fn commit_change_set(self: Box<Self>) -> Result<(), RepositoryError> {
        self.inner.commit_change_set()
    }

    fn rollback_change_set(self: Box<Self>) -> Result<(), RepositoryError> {
        self.inner.rollback_change_set()
    }
}

impl ChangeSetManager for FailingWrites {
    fn start_change_set(&self) -> Result<Box<dyn ChangeSet + '_>, RepositoryError> {
        Ok(Box::new(FailingChangeSet {
            inner: self.inner.start_change_set()?,
        }))
    }
}

#[test]
fn test_failed_save_rolls_back_and_reports_persistence_error() {
    let dir = TempDir::new().unwrap();
    let layout = SecurityFileLayout::new(dir.path());
    let good = Arc::new(FileChangeSetManager::new(dir.path()));
    GroupAssignmentsResource::new(&layout, good)
        .save_group_assignments(&[UserGroup::new("Readers", vec!["bob".into()])])
        .unwrap();
    let before = std::fs::read(layout.group_assignments()).unwrap();

    let failing = Arc::new(FailingWrites {
        inner: FileChangeSetManager::new(dir.path()),
    });
    let resource = GroupAssignmentsResource::new(&layout, failing.clone());
    let result = resource.save_group_assignments(&[UserGroup::new("Others", vec!["eve".into()])]);

    assert!(matches!(result, Err(RepositoryError::Persistence(_))));
    assert_eq!(std::fs::read(layout.group_assignments()).unwrap(), before);
    assert_eq!(resource.get_group_names().unwrap(), vec!["Readers"]);

    // Namespace saves share the same rollback path
    let security = otm_repository_core::engine::RepositorySecurityManager::new(
        layout.clone(),
        failing,
        Arc::new(otm_repository_core::engine::user_store::FileAuthenticationProvider::new(
            &layout,
            Arc::new(FileChangeSetManager::new(dir.path())),
            otm_repository_core::engine_core::password::PasswordValidator::passthrough(),
        )),
    );
    let ns = "http://www.example.com/ns/one";
    let result = security.save_authorizations(
        ns,
        &NamespaceAuthorizations::default().grant(RepositoryPermission::Read, ["bob"]),
    );
    assert!(matches!(result, Err(RepositoryError::Persistence(_))));
    assert!(!layout.namespace_authorizations(ns).unwrap().exists());
}
