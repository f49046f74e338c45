// src/main.rs

use std::net::SocketAddr;

use commentable::{
    config::Config,
    controllers::CommentServices,
    create_router, db,
    models::{
        host::{HostRegistry, TableHost},
        post::Post,
    },
    state::AppState,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Console output plus a daily rolling file under `logs/`.
/// The returned guard flushes the file writer when dropped.
fn init_tracing(filter: &str) -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily("logs", "commentable.log"));

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let _log_guard = init_tracing(&config.rust_log);

    let pool = db::connect_with_retry(&config.database_url).await?;
    db::migrate(&pool).await?;
    tracing::info!("schema up to date");

    // Every kind a comment thread may hang off
    let hosts = HostRegistry::new().register(Post::KIND, TableHost::new(pool.clone(), "posts")?);
    tracing::info!(kinds = ?hosts.kinds().collect::<Vec<_>>(), "commentable hosts registered");

    let state = AppState {
        services: CommentServices::new(pool.clone(), config.comments.clone(), hosts),
        config: config.clone(),
        pool,
    };

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "comments service listening");

    axum::serve(listener, create_router(state)).await?;

    Ok(())
}
