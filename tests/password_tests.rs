//! 密码哈希功能测试
//!
//! 测试 Argon2id 密码哈希、配置化成本参数与异步校验

use board_service::auth::password::PasswordHasher;

mod common;
use common::create_test_config;

#[test]
fn test_hasher_from_config() {
    let config = create_test_config();
    let hasher = PasswordHasher::from_config(&config.security).unwrap();

    let hash = hasher.hash("dan123").unwrap();

    assert!(hash.starts_with("$argon2id$"));
    assert!(hash.contains(&format!("m={}", config.security.hash_memory_kib)));
    assert!(hasher.verify("dan123", &hash));
    assert!(!hasher.verify("Dan123", &hash));
}

#[test]
fn test_invalid_cost_config_rejected() {
    let mut config = create_test_config();
    config.security.hash_parallelism = 0;

    assert!(PasswordHasher::from_config(&config.security).is_err());
}

#[test]
fn test_empty_and_unicode_passwords() {
    let hasher = PasswordHasher::from_config(&create_test_config().security).unwrap();

    let hash = hasher.hash("").unwrap();
    assert!(hasher.verify("", &hash));
    assert!(!hasher.verify(" ", &hash));

    let hash = hasher.hash("密码🔐").unwrap();
    assert!(hasher.verify("密码🔐", &hash));
}

#[tokio::test]
async fn test_concurrent_verification() {
    let hasher = PasswordHasher::from_config(&create_test_config().security).unwrap();
    let hash = hasher.hash("dan123").unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let hasher = hasher.clone();
        let hash = hash.clone();
        handles.push(tokio::spawn(async move {
            let candidate = if i % 2 == 0 { "dan123" } else { "wrong" };
            (i, hasher.verify_blocking(candidate.to_string(), hash).await)
        }));
    }

    for handle in handles {
        let (i, ok) = handle.await.unwrap();
        assert_eq!(ok, i % 2 == 0);
    }
}
