/*
 * Responsibility
 * - Logging + panic hook setup
 * - Config -> catalog store -> route layer -> request pipeline
 * - axum::serve() with peer addresses available to the rate limiter
 */
use std::{net::SocketAddr, panic, sync::Arc};

use anyhow::{Context, Result};
use axum::ServiceExt as _;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware::cors::OriginPolicy;
use crate::middleware::pipeline::{Pipeline, PipelineService};
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};
use crate::repos::store::FileSnapshotStore;
use crate::services::library::Library;

fn init_tracing() {
    // RUST_LOG wins when set, e.g.
    // RUST_LOG=info,library_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    let default_hook = panic::take_hook();

    // Log and defer to the default hook only. The process keeps running so the
    // pipeline's panic boundary can still answer the request with a 500.
    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook();

    tracing::info!(
        "starting library API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let addr = config.addr;
    let service = build_service(config).await;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(
        listener,
        service.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server terminated")?;

    Ok(())
}

async fn build_service(config: Config) -> PipelineService {
    let store = Arc::new(FileSnapshotStore::new(config.data_path));
    tracing::info!(path = %store.path().display(), "catalog snapshot file");
    let library = Arc::new(Library::open(store).await);

    pipeline_for(config.cors_origin, config.rate_limit).wrap(api::router(library))
}

fn pipeline_for(origin_policy: OriginPolicy, rate_limit: RateLimitConfig) -> Pipeline {
    Pipeline::new(origin_policy, RateLimiter::new(rate_limit))
}
