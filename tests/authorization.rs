mod common;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use otm_repository_core::engine_core::errors::RepositorySecurityError;
use otm_repository_core::engine_core::models::{
    ItemStatus, NamespaceAuthorizations, RepositoryItem, RepositoryPermission, UserGroup, UserInfo,
    UserPrincipal,
};
use otm_repository_core::engine_core::models::RepositoryPermission::{Promote, Read, Write};
use tempfile::TempDir;

const NS1: &str = "http://www.example.com/ns/one";

fn readers_with_bob_denied_write(dir: &TempDir) -> otm_repository_core::engine::RepositorySecurityManager {
    let security = common::security_manager(dir);
    security
        .save_group_assignments(&[UserGroup::new("Readers", vec!["bob".into(), "carol".into()])])
        .unwrap();
    security
        .save_authorizations(
            NS1,
            &NamespaceAuthorizations::default()
                .grant(Read, ["Readers"])
                .grant(Write, ["Readers"])
                .deny(Write, ["bob"]),
        )
        .unwrap();
    security
}

#[test]
fn test_deny_wins_over_group_grant() {
    let dir = TempDir::new().unwrap();
    let security = readers_with_bob_denied_write(&dir);
    let bob = UserPrincipal::new("bob", security.get_assigned_groups("bob").unwrap());

    assert!(security.is_authorized(&bob, NS1, Read));
    assert!(!security.is_authorized(&bob, NS1, Write));
    assert_eq!(security.get_effective_permission(&bob, NS1).unwrap(), Read);

    let carol = UserPrincipal::new("carol", security.get_assigned_groups("carol").unwrap());
    assert!(security.is_authorized(&carol, NS1, Write));
    assert!(!security.is_authorized(&carol, NS1, Promote));
}

#[test]
fn test_group_member_match_is_case_insensitive() {
    let dir = TempDir::new().unwrap();
    let security = readers_with_bob_denied_write(&dir);
    assert_eq!(security.get_assigned_groups("BOB").unwrap(), vec!["Readers"]);
}

#[test]
fn test_anonymous_grant_applies_to_everyone() {
    let dir = TempDir::new().unwrap();
    let security = common::security_manager(&dir);
    security
        .save_authorizations(NS1, &NamespaceAuthorizations::default().grant(Read, ["anonymous"]))
        .unwrap();

    assert!(security.is_authorized(&UserPrincipal::anonymous(), NS1, Read));
    assert!(security.is_authorized(&UserPrincipal::new("dave", Vec::new()), NS1, Read));
    assert!(!security.is_authorized(&UserPrincipal::anonymous(), NS1, Write));
}

#[test]
fn test_unconfigured_namespace_resolves_to_none() {
    let dir = TempDir::new().unwrap();
    let security = common::security_manager(&dir);
    let user = UserPrincipal::new("erin", Vec::new());
    assert_eq!(
        security.get_effective_permission(&user, NS1).unwrap(),
        RepositoryPermission::None
    );
    assert!(!security.is_authorized(&user, NS1, Read));
}

#[test]
fn test_ancestor_namespace_grants_are_inherited() {
    let dir = TempDir::new().unwrap();
    let security = common::security_manager(&dir);
    security
        .save_authorizations(
            "http://www.example.com/ns",
            &NamespaceAuthorizations::default().grant(Write, ["frank"]),
        )
        .unwrap();
    security
        .save_authorizations(NS1, &NamespaceAuthorizations::default().deny(Write, ["frank"]))
        .unwrap();

    let frank = UserPrincipal::new("frank", Vec::new());
    assert!(security.is_authorized(&frank, "http://www.example.com/ns/two", Write));
    assert!(!security.is_authorized(&frank, NS1, Write));
}

#[test]
fn test_administrators_bypass_everything() {
    let dir = TempDir::new().unwrap();
    let security = readers_with_bob_denied_write(&dir);
    security
        .save_group_assignments(&[
            UserGroup::new("Readers", vec!["bob".into()]),
            UserGroup::new("Administrators", vec!["bob".into()]),
        ])
        .unwrap();

    let bob = UserPrincipal::new("bob", security.get_assigned_groups("bob").unwrap());
    assert!(security.is_administrator(&bob));
    assert!(security.is_authorized(&bob, NS1, Promote));
    assert!(security.is_authorized(&bob, "http://elsewhere.org/ns", Write));
}

#[test]
fn test_write_requires_draft_status() {
    let dir = TempDir::new().unwrap();
    let security = readers_with_bob_denied_write(&dir);
    let carol = UserPrincipal::new("carol", security.get_assigned_groups("carol").unwrap());

    let draft = RepositoryItem::draft(NS1, "Library", "1.0.0");
    assert!(security.is_write_authorized(&carol, &draft));
    assert!(security.is_read_authorized(&carol, &draft));

    for status in [ItemStatus::UnderReview, ItemStatus::Final, ItemStatus::Obsolete] {
        let item = draft.clone().with_status(status);
        assert!(!security.is_write_authorized(&carol, &item));
    }
}

#[test]
fn test_authenticate_header_flow() {
    let dir = TempDir::new().unwrap();
    let security = readers_with_bob_denied_write(&dir);
    security
        .authentication_provider()
        .add_user(&UserInfo::new("bob"), "secret")
        .unwrap();

    let anonymous = security.authenticate(None).unwrap();
    assert!(anonymous.is_anonymous());

    let header = format!("Basic {}", STANDARD.encode("bob:secret"));
    let bob = security.authenticate(Some(&header)).unwrap();
    assert_eq!(bob.user_id(), "bob");
    assert!(bob.assigned_groups().contains("Readers"));

    let wrong = format!("Basic {}", STANDARD.encode("bob:nope"));
    assert_eq!(
        security.authenticate(Some(&wrong)),
        Err(RepositorySecurityError::InvalidCredentials)
    );
    assert!(matches!(
        security.authenticate(Some("Basic ???")),
        Err(RepositorySecurityError::MalformedAuthorizationHeader(_))
    ));
}

#[test]
fn test_get_user_unknown() {
    let dir = TempDir::new().unwrap();
    let security = common::security_manager(&dir);
    assert_eq!(
        security.get_user("ghost"),
        Err(RepositorySecurityError::UnknownUser("ghost".into()))
    );
}
