mod common;

use common::RecordingTransport;
use otm_repository_core::config::Config;
use otm_repository_core::context::RepositoryContext;
use otm_repository_core::engine_core::constants::messaging::NOTIFICATION_DESTINATION;
use otm_repository_core::engine_core::errors::{RepositoryError, RepositorySecurityError};
use otm_repository_core::engine_core::events::ActionType;
use otm_repository_core::messaging::MessageTransport;
use otm_repository_core::engine_core::models::{
    ItemStatus, NamespaceAuthorizations, RepositoryItem, RepositoryPermission, UserGroup,
    UserPrincipal,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const NS: &str = "http://www.example.com/ns/one";

fn context(dir: &TempDir, transport: Arc<RecordingTransport>) -> RepositoryContext {
    let config = Config {
        repository_root: dir.path().to_path_buf(),
        broker_address: Some("127.0.0.1:0".into()),
        notifications_enabled: true,
        indexing_enabled: false,
        ..Config::default()
    };
    let security = Arc::new(common::security_manager(dir));
    security
        .save_group_assignments(&[
            UserGroup::new("Editors", vec!["carol".into()]),
            UserGroup::new("Leads", vec!["lee".into()]),
        ])
        .unwrap();
    security
        .save_authorizations(
            NS,
            &NamespaceAuthorizations::default()
                .grant(RepositoryPermission::Write, ["Editors"])
                .grant(RepositoryPermission::Promote, ["Leads"]),
        )
        .unwrap();
    RepositoryContext::new(&config, security, Some(transport as Arc<dyn MessageTransport>))
}

fn principal(ctx: &RepositoryContext, user_id: &str) -> UserPrincipal {
    UserPrincipal::new(user_id, ctx.security().get_assigned_groups(user_id).unwrap())
}

async fn wait_for_notifications(transport: &RecordingTransport, count: usize) -> usize {
    for _ in 0..200 {
        let n = transport.sent_to(NOTIFICATION_DESTINATION).len();
        if n >= count {
            return n;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    transport.sent_to(NOTIFICATION_DESTINATION).len()
}

#[tokio::test]
async fn test_authorized_mutation_runs_and_publishes() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let ctx = context(&dir, transport.clone());
    ctx.start();

    let carol = principal(&ctx, "carol");
    let item = RepositoryItem::draft(NS, "Library", "1.0.0");
    let updated = ctx
        .guarded_mutation(&carol, ActionType::Publish, &item, || async {
            Ok::<_, RepositoryError>(item.clone())
        })
        .await
        .unwrap();
    assert_eq!(updated, item);
    assert_eq!(wait_for_notifications(&transport, 1).await, 1);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_denied_mutation_never_runs() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let ctx = context(&dir, transport.clone());
    ctx.start();

    let ran = AtomicBool::new(false);
    let outsider = principal(&ctx, "mallory");
    let item = RepositoryItem::draft(NS, "Library", "1.0.0");
    let result = ctx
        .guarded_mutation(&outsider, ActionType::Modified, &item, || async {
            ran.store(true, Ordering::SeqCst);
            Ok::<_, RepositoryError>(item.clone())
        })
        .await;

    match result {
        Err(RepositoryError::Security(RepositorySecurityError::AccessDenied(_))) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!ran.load(Ordering::SeqCst));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.sent_to(NOTIFICATION_DESTINATION).is_empty());
    ctx.shutdown().await;
}

async fn promoted() -> Result<RepositoryItem, RepositoryError> {
    Ok(RepositoryItem::draft(NS, "Library", "1.0.0").with_status(ItemStatus::UnderReview))
}

#[tokio::test]
async fn test_status_change_requires_promote() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let ctx = context(&dir, transport.clone());
    ctx.start();

    let item = RepositoryItem::draft(NS, "Library", "1.0.0");

    let carol = principal(&ctx, "carol");
    assert!(ctx
        .guarded_mutation(&carol, ActionType::StatusChanged, &item, promoted)
        .await
        .is_err());

    let lee = principal(&ctx, "lee");
    let updated = ctx
        .guarded_mutation(&lee, ActionType::StatusChanged, &item, promoted)
        .await
        .unwrap();
    assert_eq!(updated.status, ItemStatus::UnderReview);

    // Writes are refused once the item left draft
    assert!(ctx
        .guarded_mutation(&carol, ActionType::Modified, &updated, || async {
            Ok::<_, RepositoryError>(updated.clone())
        })
        .await
        .is_err());

    assert_eq!(wait_for_notifications(&transport, 1).await, 1);
    let sent = transport.sent_to(NOTIFICATION_DESTINATION);
    assert_eq!(sent[0]["action"], "STATUS_CHANGED");
    ctx.shutdown().await;
}

#[tokio::test]
async fn test_mutation_error_is_returned_without_event() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let ctx = context(&dir, transport.clone());
    ctx.start();

    let carol = principal(&ctx, "carol");
    let item = RepositoryItem::draft(NS, "Library", "1.0.0");
    let result = ctx
        .guarded_mutation(&carol, ActionType::Deleted, &item, || async {
            Err(RepositoryError::Persistence("storage offline".into()))
        })
        .await;
    assert!(matches!(result, Err(RepositoryError::Persistence(_))));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(transport.sent_to(NOTIFICATION_DESTINATION).is_empty());
    ctx.shutdown().await;
}
