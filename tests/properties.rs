use otm_repository_core::engine::authorization::{namespace_hierarchy, AuthorizationResource};
use otm_repository_core::engine_core::constants::principals::ANONYMOUS_USER_ID;
use otm_repository_core::engine_core::models::{
    NamespaceAuthorizations, RepositoryPermission, UserPrincipal,
};
use otm_repository_core::engine_core::password::PasswordValidator;
use otm_repository_core::persistence::{FileChangeSetManager, SecurityFileLayout};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;

fn permission() -> impl Strategy<Value = RepositoryPermission> {
    prop::sample::select(RepositoryPermission::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_authorization_ids_always_include_user_and_anonymous(
        user_id in "[a-z]{1,12}",
        groups in prop::collection::vec("[A-Z][a-z]{0,8}", 0..6)
    ) {
        let principal = UserPrincipal::new(user_id.clone(), groups.clone());
        let ids = principal.authorization_ids();
        prop_assert!(ids.contains(&user_id));
        prop_assert!(ids.contains(ANONYMOUS_USER_ID));
        for group in &groups {
            prop_assert!(ids.contains(group));
        }
    }

    #[test]
    fn test_denied_permission_is_never_effective(
        grants in prop::collection::vec(permission(), 0..5),
        denies in prop::collection::vec(permission(), 0..5)
    ) {
        let dir = TempDir::new().unwrap();
        let resource = AuthorizationResource::new(
            SecurityFileLayout::new(dir.path()),
            Arc::new(FileChangeSetManager::new(dir.path())),
        );
        let ns = "http://www.example.com/ns/prop";
        let mut auths = NamespaceAuthorizations::default();
        for p in &grants {
            auths = auths.grant(*p, ["Team"]);
        }
        for p in &denies {
            auths = auths.deny(*p, ["pat"]);
        }
        resource.save_authorizations(ns, &auths).unwrap();

        let user = UserPrincipal::new("pat", vec!["Team".to_string()]);
        let effective = resource.get_effective_permission(&user, ns).unwrap();
        let denied: BTreeSet<_> = denies.iter().copied().collect();
        let expected = grants
            .iter()
            .copied()
            .filter(|p| !denied.contains(p))
            .max()
            .unwrap_or(RepositoryPermission::None);

        prop_assert_eq!(effective, expected);
        if effective != RepositoryPermission::None {
            prop_assert!(!denied.contains(&effective));
        }
    }

    #[test]
    fn test_namespace_hierarchy_walks_up_to_authority(
        host in "[a-z]{1,10}\\.(com|org)",
        segments in prop::collection::vec("[a-z0-9]{1,6}", 0..5)
    ) {
        let root = format!("http://{}", host);
        let namespace = std::iter::once(root.clone())
            .chain(segments.iter().cloned())
            .collect::<Vec<_>>()
            .join("/");

        let hierarchy = namespace_hierarchy(&namespace);
        prop_assert_eq!(hierarchy.len(), segments.len() + 1);
        prop_assert_eq!(hierarchy.first(), Some(&namespace));
        prop_assert_eq!(hierarchy.last(), Some(&root));
        for pair in hierarchy.windows(2) {
            let parent = format!("{}/", pair[1]);
            prop_assert!(pair[0].starts_with(&parent), "{} is not below {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_passthrough_validation_is_plain_equality(
        credentials in "\\PC{0,16}",
        stored in "\\PC{0,16}"
    ) {
        let validator = PasswordValidator::passthrough();
        prop_assert_eq!(
            validator.is_valid_password(&credentials, &stored).unwrap(),
            credentials == stored
        );
    }

    #[test]
    fn test_encrypted_passwords_validate(password in "[ -~]{0,24}") {
        let validator = PasswordValidator::new(Some("SHA-256"), None).unwrap();
        let stored = validator.encrypt_password(&password).unwrap();
        prop_assert!(stored.starts_with("{SSHA}"), "unsalted stored form: {}", stored);
        let valid = validator.is_valid_password(&password, &stored).unwrap();
        prop_assert!(valid, "round trip failed for {:?}", password);
    }
}
