use std::sync::Arc;

use super::*;
use crate::storage::{ArcStorage, MockStorage};

fn user(id: UserId) -> User {
    User {
        id,
        first_name: "Ann".to_string(),
        ..Default::default()
    }
}

fn chat(kind: &str) -> Chat {
    Chat {
        id: -100,
        kind: kind.to_string(),
    }
}

fn storage_allowing(allowed: bool) -> ArcStorage {
    let mut storage = MockStorage::new();
    storage
        .expect_is_user_allowed()
        .returning(move |_| Ok(allowed));
    Arc::new(storage)
}

#[tokio::test]
async fn test_admin() {
    let mut storage = MockStorage::new();
    storage.expect_is_user_allowed().never();
    let authorizer = Authorizer::new(Arc::new(storage)).with_admin_ids(vec![1, 2]);

    let access = authorizer.check(&user(2), &chat("private")).await.unwrap();
    assert_eq!(access, Access::Admin);
    assert!(access.is_admin());
}

#[tokio::test]
async fn test_allowed_user() {
    let authorizer = Authorizer::new(storage_allowing(true)).with_admin_ids(vec![1]);

    let access = authorizer.check(&user(7), &chat("private")).await.unwrap();
    assert_eq!(access, Access::Allowed);
    assert!(!access.is_admin());
}

#[tokio::test]
async fn test_denied_private_notifies() {
    let authorizer = Authorizer::new(storage_allowing(false));

    let access = authorizer.check(&user(7), &chat("private")).await.unwrap();
    assert_eq!(access, Access::Denied { notify: true });
    assert!(access.is_denied());
}

#[tokio::test]
async fn test_denied_group_is_silent() {
    let authorizer = Authorizer::new(storage_allowing(false));

    let access = authorizer.check(&user(7), &chat("supergroup")).await.unwrap();
    assert_eq!(access, Access::Denied { notify: false });
}

#[tokio::test]
async fn test_allow_all_users_in_groups() {
    let mut storage = MockStorage::new();
    storage
        .expect_is_user_allowed()
        .times(1)
        .returning(|_| Ok(false));
    let authorizer =
        Authorizer::new(Arc::new(storage)).with_allow_all_users_in_groups(true);

    let access = authorizer.check(&user(7), &chat("group")).await.unwrap();
    assert_eq!(access, Access::Allowed);

    // The flag does not open private chats.
    let access = authorizer.check(&user(7), &chat("private")).await.unwrap();
    assert_eq!(access, Access::Denied { notify: true });
}

#[tokio::test]
async fn test_storage_error() {
    let mut storage = MockStorage::new();
    storage
        .expect_is_user_allowed()
        .returning(|_| Err(eyre::eyre!("database is locked")));
    let authorizer = Authorizer::new(Arc::new(storage));

    let err = authorizer
        .check(&user(7), &chat("private"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "checking allowlist");
}

#[test]
fn test_from_config() {
    let config = TelegramConfig {
        admin_ids: vec![5],
        allow_all_users_in_groups: true,
        ..Default::default()
    };
    let authorizer = Authorizer::from_config(&config, storage_allowing(false));
    assert!(authorizer.is_admin(5));
    assert!(!authorizer.is_admin(6));
    assert!(authorizer.allow_all_users_in_groups);
}
