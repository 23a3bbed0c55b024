// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use clap::Parser;
use dns_reconciler::config::store::{ConfigStore, FileKvStore};
use dns_reconciler::constants::{SERVER_BIND_ADDRESS, SERVER_PORT, TOKIO_WORKER_THREADS};
use dns_reconciler::trigger::{build_router, scheduler, AppState};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Reconciles cloud DNS records against mesh/VPN machine inventory.
#[derive(Parser, Debug)]
#[command(name = "dns-reconciler", version, about)]
struct Cli {
    /// Owner-id whose configuration document drives this process.
    #[arg(long, env = "DNS_RECONCILER_OWNER_ID")]
    owner_id: String,

    /// Directory the file-backed config store persists documents under.
    #[arg(long, env = "DNS_RECONCILER_CONFIG_DIR")]
    config_dir: PathBuf,

    /// Address the operator HTTP server binds to.
    #[arg(long, env = "DNS_RECONCILER_BIND_ADDRESS", default_value = SERVER_BIND_ADDRESS)]
    bind_address: String,

    /// Port the operator HTTP server listens on.
    #[arg(long, env = "DNS_RECONCILER_PORT", default_value_t = SERVER_PORT)]
    port: u16,

    /// Seconds between scheduled reconciliation ticks.
    #[arg(long, env = "DNS_RECONCILER_SCHEDULE_INTERVAL_SECS", default_value_t = dns_reconciler::constants::DEFAULT_SCHEDULE_INTERVAL_SECS)]
    schedule_interval_secs: u64,

    /// Emit logs as JSON instead of human-readable text.
    #[arg(long, env = "DNS_RECONCILER_LOG_JSON")]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    std::fs::create_dir_all(&cli.config_dir)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("dns-reconciler-worker")
        .enable_all()
        .build()?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_store = ConfigStore::new(FileKvStore::new(cli.config_dir.clone()));
    let state = AppState::new(config_store, cli.owner_id.clone());

    let scheduler_state = state.clone();
    let scheduler_owner = cli.owner_id.clone();
    tokio::spawn(async move {
        scheduler::run(scheduler_state, scheduler_owner, Duration::from_secs(cli.schedule_interval_secs)).await;
    });

    let router = build_router(state);
    let bind = format!("{}:{}", cli.bind_address, cli.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, owner_id = %cli.owner_id, "dns-reconciler listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
