use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stashd::config::Config;
use stashd::store::{RedisJobQueue, RedisSessionStore};
use stashd::worker::ThumbnailWorker;
use stashd::AppState;

#[derive(Parser, Debug)]
#[command(name = "stashd")]
#[command(author, version, about = "A small self-hosted file store", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "stashd.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API server
    Serve,
    /// Run the thumbnail worker process
    Worker,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting stashd v{}", env!("CARGO_PKG_VERSION"));

    let db = stashd::db::init(&config.database.path).await?;

    match cli.command {
        Command::Serve => serve(config, db).await,
        Command::Worker => worker(config, db).await,
    }
}

async fn serve(config: Config, db: stashd::DbPool) -> Result<()> {
    let sessions = Arc::new(RedisSessionStore::new(&config.redis.url)?);
    let queue = Arc::new(RedisJobQueue::new(&config.redis.url)?);

    tokio::fs::create_dir_all(&config.storage.folder_path).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, db, sessions, queue));
    let app = stashd::api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn worker(config: Config, db: stashd::DbPool) -> Result<()> {
    let queue = Arc::new(RedisJobQueue::new(&config.redis.url)?);
    let worker = ThumbnailWorker::new(db, queue);

    tokio::select! {
        _ = worker.run() => {}
        _ = shutdown_signal() => {}
    }

    tracing::info!("Worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
