//! Example: Rotating refresh tokens through the configured store
//!
//! Walks a login, two refreshes, a replayed token and the resulting family
//! revocation, printing the chain after each step.
//!
//! Uses the in-memory store unless `TOKEN_STORE_BACKEND` selects another.
//! Run with: cargo run --example token_store_demo -p rk_infra

use std::sync::Arc;

use anyhow::Context;
use uuid::Uuid;

use rk_core::services::{
    RefreshTokenService, RefreshTokenServiceConfig, TokenCleanupConfig, TokenCleanupService,
};
use rk_shared::{init_tracing, IdKind};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = rk_infra::load_config().context("loading configuration")?;
    init_tracing(&config.logging)?;

    let store = rk_infra::connect_token_store(&config).await?;
    let service = RefreshTokenService::new(
        Arc::clone(&store),
        RefreshTokenServiceConfig::from(&config.token_store),
    );

    let user = match config.token_store.user_id_kind {
        IdKind::Uuid => Uuid::new_v4().to_string(),
        IdKind::Numeric => "42".to_string(),
    };

    // Login: the first token is the root of a new family
    let root = service.create_token_id().to_string();
    service
        .save_with_default_ttl(&user, &root, &root, "login-secret")
        .await?;
    println!("Login issued token {}", root);

    // Two refreshes, each retiring the token it consumed
    let mut current = root.clone();
    for step in 1..=2 {
        let next = service.create_token_id().to_string();
        service
            .save_with_default_ttl(&user, &root, &next, &format!("refresh-secret-{}", step))
            .await?;
        service.invalidate_refresh_token(&user, &root, &current).await?;
        println!("Refresh {} rotated {} -> {}", step, current, next);
        current = next;
    }

    print_chain(&service, &user, &root).await?;

    // A retired token comes back: treat it as theft and revoke the chain
    if !service.is_refresh_token_valid(&user, &root, &root).await? {
        println!("Replay of {} detected, revoking family", root);
        service.invalidate_refresh_token_family(&user, &root).await?;
    }

    print_chain(&service, &user, &root).await?;
    println!(
        "Active tokens left for user: {}",
        service.active_tokens(&user).await?.len()
    );

    let cleanup = TokenCleanupService::new(
        store,
        TokenCleanupConfig::from(&config.token_store.cleanup),
    );
    let result = cleanup.run_cleanup().await?;
    println!("Cleanup removed {} records", result.records_deleted);

    Ok(())
}

async fn print_chain<S>(
    service: &RefreshTokenService<S>,
    user: &str,
    family: &str,
) -> anyhow::Result<()>
where
    S: rk_core::repositories::RefreshTokenStore + ?Sized,
{
    let members = service.family_members(user, family).await?;
    println!("{}", serde_json::to_string_pretty(&members)?);
    Ok(())
}
