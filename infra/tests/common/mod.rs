//! Store-independent checks shared by the MySQL and Redis integration tests

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use rk_core::repositories::RefreshTokenStore;
use rk_core::services::{RefreshTokenService, RefreshTokenServiceConfig};

pub type Service = RefreshTokenService<dyn RefreshTokenStore>;

pub const TTL: Duration = Duration::from_secs(5);

pub fn service(store: Arc<dyn RefreshTokenStore>) -> Service {
    RefreshTokenService::new(store, RefreshTokenServiceConfig::default())
}

pub fn new_user() -> String {
    Uuid::new_v4().to_string()
}

pub async fn save(service: &Service, user: &str, family: Option<&str>) -> String {
    let id = service.create_token_id().to_string();
    let family = family.map(str::to_string).unwrap_or_else(|| id.clone());
    service
        .save_refresh_token(user, &family, &id, "secret", TTL)
        .await
        .unwrap();
    id
}

pub async fn rotation_chain(service: &Service) {
    let user = new_user();
    let root = save(service, &user, None).await;
    let child = save(service, &user, Some(&root)).await;

    assert!(service.is_refresh_token_valid(&user, &root, &root).await.unwrap());
    assert!(service.is_refresh_token_valid(&user, &root, &child).await.unwrap());
    assert!(!service.is_refresh_token_valid(&new_user(), &root, &child).await.unwrap());

    let members = service.family_members(&user, &root).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members[0].is_family_root());
}

pub async fn duplicate_id_conflicts(service: &Service) {
    let user = new_user();
    let id = save(service, &user, None).await;

    let err = service
        .save_refresh_token(&new_user(), &id, &id, "other", TTL)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // The original record is untouched
    assert!(service.is_refresh_token_valid(&user, &id, &id).await.unwrap());
}

pub async fn concurrent_duplicate_has_one_winner(service: Arc<Service>) {
    let id = service.create_token_id().to_string();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&service);
            let id = id.clone();
            tokio::spawn(async move {
                service
                    .save_refresh_token(&new_user(), &id, &id, "secret", TTL)
                    .await
            })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(e) => assert!(e.is_conflict()),
        }
    }
    assert_eq!(winners, 1);
}

pub async fn invalidation_scopes(service: &Service) {
    let user = new_user();
    let root = save(service, &user, None).await;
    let child = save(service, &user, Some(&root)).await;
    let other_family = save(service, &user, None).await;

    service.invalidate_refresh_token(&user, &root, &child).await.unwrap();
    assert!(!service.is_refresh_token_valid(&user, &root, &child).await.unwrap());
    assert!(service.is_refresh_token_valid(&user, &root, &root).await.unwrap());

    service.invalidate_refresh_token_family(&user, &root).await.unwrap();
    assert!(!service.is_refresh_token_valid(&user, &root, &root).await.unwrap());
    assert!(service
        .is_refresh_token_valid(&user, &other_family, &other_family)
        .await
        .unwrap());

    let bystander = new_user();
    let kept = save(service, &bystander, None).await;

    service.invalidate_user_refresh_tokens(&user).await.unwrap();
    assert!(!service
        .is_refresh_token_valid(&user, &other_family, &other_family)
        .await
        .unwrap());
    assert!(service.is_refresh_token_valid(&bystander, &kept, &kept).await.unwrap());

    // Absent targets are no-ops
    service.invalidate_user_refresh_tokens(&new_user()).await.unwrap();
    service
        .invalidate_refresh_token_family(&user, &Uuid::new_v4().to_string())
        .await
        .unwrap();
}

pub async fn expiry_and_reclamation(service: &Service) {
    let user = new_user();
    let id = service.create_token_id().to_string();
    service
        .save_refresh_token(&user, &id, &id, "secret", Duration::from_millis(500))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!service.is_refresh_token_valid(&user, &id, &id).await.unwrap());
    assert!(service.active_tokens(&user).await.unwrap().is_empty());

    let deleted = service
        .store()
        .delete_reclaimable(Utc::now())
        .await
        .unwrap();
    assert!(deleted >= 1);

    // Once reclaimed, the id can be stored again
    service
        .save_refresh_token(&user, &id, &id, "secret", TTL)
        .await
        .unwrap();
    assert!(service.is_refresh_token_valid(&user, &id, &id).await.unwrap());
}
