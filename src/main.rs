use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};

use webhook_dispatcher::config::{Cli, Command, Settings};
use webhook_dispatcher::dispatch::DispatchTable;
use webhook_dispatcher::forward::Forwarder;
use webhook_dispatcher::metrics::{Metrics, REFRESH_INTERVAL};
use webhook_dispatcher::server::{self, AppState};
use webhook_dispatcher::storage::{DualStorage, RedisStorage, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(LevelFilter::Info)
        .parse_env("RUST_LOG")
        .init();

    match Cli::parse().command {
        Command::Server(settings) => run_server(settings).await,
    }
}

async fn run_server(settings: Settings) -> Result<()> {
    let log_requests = settings.log_requests();
    if log_requests {
        info!("Request logging enabled");
    }

    let dispatch = DispatchTable::load(&settings.config);
    let storage = open_storage(&settings).await?;

    let metrics = Arc::new(Metrics::default());
    let refresher = metrics.clone().spawn_refresher(storage.clone(), REFRESH_INTERVAL);

    let state = Arc::new(AppState {
        storage: storage.clone(),
        dispatch,
        forwarder: Forwarder::default(),
        metrics,
        log_requests,
    });

    let served = server::serve(settings.listen_addr(), state, shutdown_signal()).await;

    refresher.abort();
    if let Err(err) = storage.close().await {
        error!("Failed to close storage: {}", err);
    }
    served.context("webhook server failed")
}

async fn open_storage(settings: &Settings) -> Result<Arc<dyn Storage>> {
    let redis = RedisStorage::connect(&settings.redis)
        .await
        .with_context(|| format!("failed to connect to Redis at {}:6379", settings.redis))?;
    info!("Connected to Redis at {}:6379", settings.redis);

    let Some(path) = &settings.sqlite_path else {
        info!("Using Redis storage only");
        return Ok(Arc::new(redis));
    };

    let archive = SqliteStorage::open(path)
        .with_context(|| format!("failed to open SQLite archive {}", path.display()))?;
    info!("Opened SQLite archive at {}", path.display());
    info!("Using dual storage: Redis (primary) + SQLite (secondary)");
    Ok(Arc::new(DualStorage::new(Arc::new(redis), Arc::new(archive))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Cannot listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("Cannot listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
