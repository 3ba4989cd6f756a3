//! Tests for the refresh token facade

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use rk_shared::config::SecretStorage;

use crate::domain::value_objects::identifiers::TokenId;
use crate::errors::{DomainError, ValidationError};
use crate::repositories::{InMemoryTokenStore, MockTokenStore, RefreshTokenStore};
use crate::services::refresh_token::{RefreshTokenService, RefreshTokenServiceConfig};

const TTL: Duration = Duration::from_secs(5);

fn service() -> RefreshTokenService<InMemoryTokenStore> {
    RefreshTokenService::new(
        Arc::new(InMemoryTokenStore::new()),
        RefreshTokenServiceConfig::default(),
    )
}

fn new_user() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test]
async fn test_save_and_validate_root() {
    let service = service();
    let user = new_user();
    let id = service.create_token_id().to_string();

    service
        .save_refresh_token(&user, &id, &id, "secret", TTL)
        .await
        .unwrap();
    assert!(service.is_refresh_token_valid(&user, &id, &id).await.unwrap());
}

#[tokio::test]
async fn test_malformed_ids_are_rejected_before_storage() {
    let store = Arc::new(MockTokenStore::new());
    let service = RefreshTokenService::new(store.clone(), RefreshTokenServiceConfig::default());
    let id = service.create_token_id().to_string();

    let err = service
        .save_refresh_token("something random", &id, &id, "secret", TTL)
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = service
        .is_refresh_token_valid(&new_user(), "not-a-uuid", &id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::InvalidFormat { ref field, .. }) if field == "family_id"
    ));

    let err = service
        .invalidate_refresh_token(&new_user(), &id, "")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::RequiredField { ref field }) if field == "token_id"
    ));

    // Validation happens even when storage is down
    store.set_unavailable(true);
    let err = service
        .invalidate_refresh_token_family("42", &id)
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_numeric_user_ids() {
    let service = RefreshTokenService::new(
        Arc::new(InMemoryTokenStore::new()),
        RefreshTokenServiceConfig::numeric_users(),
    );
    let id = service.create_token_id().to_string();

    service
        .save_refresh_token("9999", &id, &id, "secret", TTL)
        .await
        .unwrap();
    assert!(service.is_refresh_token_valid("9999", &id, &id).await.unwrap());
    assert!(!service.is_refresh_token_valid("9998", &id, &id).await.unwrap());

    let err = service
        .is_refresh_token_valid(&new_user(), &id, &id)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_duplicate_save_is_conflict() {
    let service = service();
    let user = new_user();
    let id = service.create_token_id().to_string();

    service
        .save_refresh_token(&user, &id, &id, "first", TTL)
        .await
        .unwrap();
    let err = service
        .save_refresh_token(&user, &id, &id, "second", TTL)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    assert!(service.is_refresh_token_valid(&user, &id, &id).await.unwrap());
    assert!(service
        .verify_refresh_token(&user, &id, &id, "first")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_zero_ttl_is_accepted_but_never_valid() {
    let service = service();
    let user = new_user();
    let id = service.create_token_id().to_string();

    service
        .save_refresh_token(&user, &id, &id, "secret", Duration::ZERO)
        .await
        .unwrap();
    assert!(!service.is_refresh_token_valid(&user, &id, &id).await.unwrap());
}

#[tokio::test]
async fn test_overflowing_ttl_is_out_of_range() {
    let service = service();
    let id = service.create_token_id().to_string();

    let err = service
        .save_refresh_token(&new_user(), &id, &id, "secret", Duration::MAX)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "ttl"
    ));
}

#[tokio::test]
async fn test_default_ttl() {
    let config = RefreshTokenServiceConfig::default().with_default_ttl(Duration::from_secs(60));
    let service = RefreshTokenService::new(Arc::new(InMemoryTokenStore::new()), config);
    let user = new_user();
    let id = service.create_token_id().to_string();

    service
        .save_with_default_ttl(&user, &id, &id, "secret")
        .await
        .unwrap();

    let members = service.family_members(&user, &id).await.unwrap();
    assert_eq!(members.len(), 1);
    let lifetime = members[0].expires_at - members[0].created_at;
    assert_eq!(lifetime, chrono::Duration::seconds(60));
}

#[tokio::test]
async fn test_verify_refresh_token_with_hashed_secrets() {
    let config = RefreshTokenServiceConfig::default().with_secret_storage(SecretStorage::Sha256);
    let store = Arc::new(InMemoryTokenStore::new());
    let service = RefreshTokenService::new(store.clone(), config);
    let user = new_user();
    let id = service.create_token_id();
    let raw = id.to_string();

    service
        .save_refresh_token(&user, &raw, &raw, "opaque-secret", TTL)
        .await
        .unwrap();

    let stored = store.find(&id).await.unwrap().unwrap();
    assert_ne!(stored.secret_hash, "opaque-secret");
    assert_eq!(stored.secret_hash.len(), 64);

    assert!(service
        .verify_refresh_token(&user, &raw, &raw, "opaque-secret")
        .await
        .unwrap());
    assert!(!service
        .verify_refresh_token(&user, &raw, &raw, "guess")
        .await
        .unwrap());

    service
        .invalidate_refresh_token(&user, &raw, &raw)
        .await
        .unwrap();
    assert!(!service
        .verify_refresh_token(&user, &raw, &raw, "opaque-secret")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_invalidations_are_idempotent() {
    let service = service();
    let user = new_user();
    let id = service.create_token_id().to_string();
    let unknown = TokenId::generate().to_string();

    service
        .save_refresh_token(&user, &id, &id, "secret", TTL)
        .await
        .unwrap();

    for _ in 0..2 {
        service.invalidate_refresh_token(&user, &id, &id).await.unwrap();
        service.invalidate_refresh_token_family(&user, &id).await.unwrap();
        service.invalidate_user_refresh_tokens(&user).await.unwrap();
    }
    service
        .invalidate_refresh_token(&user, &unknown, &unknown)
        .await
        .unwrap();
    service
        .invalidate_refresh_token_family(&user, &unknown)
        .await
        .unwrap();
    service
        .invalidate_user_refresh_tokens(&new_user())
        .await
        .unwrap();

    assert!(!service.is_refresh_token_valid(&user, &id, &id).await.unwrap());
}

#[tokio::test]
async fn test_user_invalidation_capability_gap() {
    let service = RefreshTokenService::new(
        Arc::new(MockTokenStore::new()),
        RefreshTokenServiceConfig::default(),
    );
    assert!(!service.supports_user_invalidation());

    let err = service
        .invalidate_user_refresh_tokens(&new_user())
        .await
        .unwrap_err();
    assert!(err.is_unsupported());

    // Malformed input is still a validation error, not a capability gap
    let err = service
        .invalidate_user_refresh_tokens("garbage")
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_storage_failures_propagate_unchanged() {
    let store = Arc::new(MockTokenStore::new());
    let service = RefreshTokenService::new(store.clone(), RefreshTokenServiceConfig::default());
    let user = new_user();
    let id = service.create_token_id().to_string();

    store.set_unavailable(true);
    let err = service
        .save_refresh_token(&user, &id, &id, "secret", TTL)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Storage { .. }));

    let err = service
        .is_refresh_token_valid(&user, &id, &id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Storage { .. }));

    // No retry happened behind the caller's back
    store.set_unavailable(false);
    assert_eq!(store.len().await, 0);
}

#[tokio::test]
async fn test_active_tokens_excludes_invalidated() {
    let service = service();
    let user = new_user();
    let family = service.create_token_id().to_string();
    let next = service.create_token_id().to_string();

    service
        .save_refresh_token(&user, &family, &family, "one", TTL)
        .await
        .unwrap();
    service
        .save_refresh_token(&user, &family, &next, "two", TTL)
        .await
        .unwrap();
    service
        .invalidate_refresh_token(&user, &family, &family)
        .await
        .unwrap();

    let active = service.active_tokens(&user).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].token_id.to_string(), next);

    let members = service.family_members(&user, &family).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_service_over_trait_object() {
    let store: Arc<dyn RefreshTokenStore> = Arc::new(InMemoryTokenStore::new());
    let service = RefreshTokenService::new(store, RefreshTokenServiceConfig::default());
    let user = new_user();
    let id = service.create_token_id().to_string();

    service
        .save_refresh_token(&user, &id, &id, "secret", TTL)
        .await
        .unwrap();
    assert!(service.supports_user_invalidation());
    assert!(service.clone().is_refresh_token_valid(&user, &id, &id).await.unwrap());
}
