use std::net::{Ipv4Addr, SocketAddr};

use anyhow::anyhow;
use axum::{response::IntoResponse, Json};
use serde_json::json;
use shortener_sqlite::{SqlitePool, Storage};
use tower_server::Scheme;
use tracing::{error, info};

pub use ctx::ShortenerCtx;
pub use env_config::EnvConfig;

use access_token::TokenService;
use anonymous::AnonymousIdentity;

pub mod access_token;
pub mod anonymous;
pub mod authorize;
pub mod ctx;
pub mod db;
pub mod env_config;
pub mod error;
pub mod identity;
pub mod join;
pub mod link;
pub mod login;
pub mod profile;
pub mod usage;

mod openapi;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod tests;

#[derive(rust_embed::Embed)]
#[folder = "migrations"]
pub struct Migrations;

struct Init {
    ctx: ShortenerCtx,
    env_config: EnvConfig,
}

pub async fn serve() -> anyhow::Result<()> {
    let Init { ctx, env_config } = initialize().await?;

    let shutdown = tower_server::signal::termination_signal();

    let main_server = tower_server::Builder::new(SocketAddr::new(
        Ipv4Addr::new(0, 0, 0, 0).into(),
        env_config.server_port,
    ))
    .with_scheme(Scheme::Http)
    .with_graceful_shutdown(shutdown.clone())
    .bind()
    .await?;

    tokio::spawn(main_server.serve(openapi::router::router(ctx)));

    tokio::spawn(
        tower_server::Builder::new(SocketAddr::new(
            Ipv4Addr::new(0, 0, 0, 0).into(),
            env_config.health_port,
        ))
        .with_graceful_shutdown(shutdown.clone())
        .bind()
        .await?
        .serve(axum::Router::new().route(
            "/health/readiness",
            axum::routing::get(|| async { Json(json!({ "status": "UP" })).into_response() }),
        )),
    );

    info!(port = env_config.server_port, "serving");

    // App is fully running, wait for it to shut down
    shutdown.cancelled().await;

    Ok(())
}

/// Apply migrations, then exit
pub async fn migrate() -> anyhow::Result<()> {
    let env_config = EnvConfig::load()?;
    open_database(&env_config).await?;

    Ok(())
}

/// Issue an access token for an existing user with the configured secret
pub async fn issue_token(login: &str) -> anyhow::Result<String> {
    let env_config = EnvConfig::load()?;
    let tokens = TokenService::new(env_config.token_config()?);
    let db = open_database(&env_config).await?;

    let identity = db::user_db::find_identity_by_login(&db, login)
        .await?
        .ok_or_else(|| anyhow!("user `{login}` not found"))?;

    Ok(tokens.issue_token(&identity)?.token)
}

async fn initialize() -> anyhow::Result<Init> {
    let env_config = EnvConfig::load()?;

    info!("config: {env_config:#?}");

    let tokens = TokenService::new(env_config.token_config()?);
    let db = open_database(&env_config).await?;

    // Anonymous access is a core capability: no anonymous identity, no server.
    let anonymous = AnonymousIdentity::bootstrap(&db, &env_config.anon_user_login)
        .await
        .map_err(|err| {
            error!(?err, "failed to resolve anonymous identity");
            err
        })?;

    Ok(Init {
        ctx: ShortenerCtx::new(db, tokens, anonymous),
        env_config,
    })
}

async fn open_database(env_config: &EnvConfig) -> anyhow::Result<SqlitePool> {
    std::fs::create_dir_all(&env_config.data_dir)?;

    let pool = SqlitePool::new(
        Storage::File(env_config.db_path()),
        env_config.db_pool_size,
    )?;

    db::migrate::<Migrations>(&pool).await.map_err(|err| {
        error!(?err, "failed to migrate");
        err
    })?;

    Ok(pool)
}
