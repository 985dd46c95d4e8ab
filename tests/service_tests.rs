//! 会话服务集成测试

use board_service::{
    auth::{PasswordHasher, TokenCodec, TokenKind},
    error::AppError,
    models::user::{RegisterRequest, UpdateUserRequest},
    repository::{MemoryStore, UserStore},
    services::SessionManager,
};
use std::sync::{atomic::Ordering, Arc};

mod common;
use common::{FlakyUserStore, ACCESS_SECRET, REFRESH_SECRET};

fn codec() -> Arc<TokenCodec> {
    Arc::new(TokenCodec::new(ACCESS_SECRET, REFRESH_SECRET, 60).unwrap())
}

fn hasher() -> PasswordHasher {
    PasswordHasher::with_params(argon2::Params::MIN_M_COST * 8, 1, 1).unwrap()
}

fn manager(users: Arc<dyn UserStore>) -> SessionManager {
    SessionManager::new(users, codec(), hasher()).unwrap()
}

fn dan() -> RegisterRequest {
    RegisterRequest {
        username: Some("dan".to_string()),
        email: Some("dan@example.com".to_string()),
        password: Some("dan123".to_string()),
    }
}

#[tokio::test]
async fn test_register_hashes_password() {
    let users = Arc::new(MemoryStore::new());
    let sessions = manager(users.clone());

    let user = sessions.register(dan()).await.unwrap();

    assert_ne!(user.password_hash, "dan123");
    assert!(user.password_hash.starts_with("$argon2id$"));
    assert!(user.refresh_tokens.is_empty());
    assert!(hasher().verify("dan123", &user.password_hash));
}

#[tokio::test]
async fn test_register_rejects_missing_fields() {
    let sessions = manager(Arc::new(MemoryStore::new()));

    let mut req = dan();
    req.email = Some(String::new());
    assert!(matches!(sessions.register(req).await, Err(AppError::InvalidInput(_))));

    let mut req = dan();
    req.password = None;
    assert!(matches!(sessions.register(req).await, Err(AppError::InvalidInput(_))));
}

#[tokio::test]
async fn test_login_subject_matches_user() {
    let sessions = manager(Arc::new(MemoryStore::new()));
    let user = sessions.register(dan()).await.unwrap();

    let pair = sessions.login("dan", "dan123").await.unwrap();
    let codec = codec();

    assert_eq!(codec.verify(&pair.access_token, TokenKind::Access).unwrap(), user.id);
    assert_eq!(codec.verify(&pair.refresh_token, TokenKind::Refresh).unwrap(), user.id);
}

#[tokio::test]
async fn test_login_errors_are_identical() {
    let sessions = manager(Arc::new(MemoryStore::new()));
    sessions.register(dan()).await.unwrap();

    let wrong = sessions.login("dan", "nope").await.unwrap_err();
    let unknown = sessions.login("ghost", "dan123").await.unwrap_err();

    assert!(matches!(wrong, AppError::InvalidCredentials));
    assert!(matches!(unknown, AppError::InvalidCredentials));
    assert_eq!(wrong.user_message(), unknown.user_message());
}

#[tokio::test]
async fn test_refresh_keeps_list_size() {
    let users = Arc::new(MemoryStore::new());
    let sessions = manager(users.clone());
    let user = sessions.register(dan()).await.unwrap();

    let first = sessions.login("dan", "dan123").await.unwrap();
    let second = sessions.login("dan", "dan123").await.unwrap();

    let rotated = sessions.refresh(&first.refresh_token).await.unwrap();

    let stored = UserStore::find_by_id(users.as_ref(), &user.id)
        .await
        .unwrap()
        .unwrap()
        .refresh_tokens;
    assert_eq!(stored, vec![rotated.refresh_token, second.refresh_token]);
}

#[tokio::test]
async fn test_logout_then_refresh_is_reuse() {
    let users = Arc::new(MemoryStore::new());
    let sessions = manager(users.clone());
    let user = sessions.register(dan()).await.unwrap();
    let pair = sessions.login("dan", "dan123").await.unwrap();

    sessions.logout(&pair.refresh_token).await.unwrap();

    let err = sessions.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AppError::TokenReuse));
    assert!(UserStore::find_by_id(users.as_ref(), &user.id)
        .await
        .unwrap()
        .unwrap()
        .refresh_tokens
        .is_empty());
}

#[tokio::test]
async fn test_invalid_refresh_token_is_invalid_token() {
    let sessions = manager(Arc::new(MemoryStore::new()));

    assert!(matches!(
        sessions.refresh("not.a.token").await,
        Err(AppError::InvalidToken(_))
    ));
    assert!(matches!(
        sessions.logout("not.a.token").await,
        Err(AppError::InvalidToken(_))
    ));
}

#[tokio::test]
async fn test_reuse_fails_closed_when_revocation_fails() {
    let users = Arc::new(FlakyUserStore::default());
    let sessions = manager(users.clone());
    let user = sessions.register(dan()).await.unwrap();

    let pair = sessions.login("dan", "dan123").await.unwrap();
    sessions.refresh(&pair.refresh_token).await.unwrap();

    users.fail_clear.store(true, Ordering::SeqCst);

    let err = sessions.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(_)));
    assert!(err.is_retryable());

    let err = sessions.logout(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AppError::StoreUnavailable(_)));

    // nothing was cleared, and nothing was reported as success
    let stored = users.find_by_id(&user.id).await.unwrap().unwrap().refresh_tokens;
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_store_outage_surfaces_as_unavailable() {
    let users = Arc::new(FlakyUserStore::default());
    let sessions = manager(users.clone());
    sessions.register(dan()).await.unwrap();
    let pair = sessions.login("dan", "dan123").await.unwrap();

    users.fail_all.store(true, Ordering::SeqCst);

    assert!(matches!(
        sessions.login("dan", "dan123").await,
        Err(AppError::StoreUnavailable(_))
    ));
    assert!(matches!(
        sessions.refresh(&pair.refresh_token).await,
        Err(AppError::StoreUnavailable(_))
    ));
}

#[tokio::test]
async fn test_update_profile_and_password() {
    let users = Arc::new(MemoryStore::new());
    let sessions = manager(users.clone());
    let user = sessions.register(dan()).await.unwrap();
    let pair = sessions.login("dan", "dan123").await.unwrap();

    let updated = sessions
        .update_profile(
            &user.id,
            UpdateUserRequest {
                email: Some("dan@new.example.com".to_string()),
                password: Some("dan456".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.email, "dan@new.example.com");
    assert!(matches!(
        sessions.login("dan", "dan123").await,
        Err(AppError::InvalidCredentials)
    ));
    assert!(sessions.login("dan", "dan456").await.is_ok());

    // sessions issued before the change stay valid
    assert!(sessions.refresh(&pair.refresh_token).await.is_ok());

    assert!(matches!(
        sessions
            .update_profile(&user.id, UpdateUserRequest::default())
            .await,
        Err(AppError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_rejected_profile_update_changes_nothing() {
    let users = Arc::new(MemoryStore::new());
    let sessions = manager(users.clone());
    let user = sessions.register(dan()).await.unwrap();

    let err = sessions
        .update_profile(
            &user.id,
            UpdateUserRequest {
                email: Some("changed@example.com".to_string()),
                password: Some(String::new()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = sessions
        .update_profile(
            &user.id,
            UpdateUserRequest {
                email: Some(String::new()),
                password: Some("dan456".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let stored = UserStore::find_by_id(users.as_ref(), &user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.email, "dan@example.com");
    assert_eq!(stored.password_hash, user.password_hash);
    assert!(sessions.login("dan", "dan123").await.is_ok());
}
