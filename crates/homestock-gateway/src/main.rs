use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use homestock_core::config::HomestockConfig;
use homestock_scheduler::{run_sweep, SweepEngine};
use homestock_store::{db, CategoryManager, ConsumableManager, TaskManager};
use tokio::sync::watch;
use tracing::{info, warn};

mod app;
mod http;

const DEFAULT_LOG_FILTER: &str =
    "homestock_gateway=info,homestock_scheduler=info,homestock_store=info,tower_http=debug";

/// Household consumables and chores tracker.
#[derive(Parser, Debug)]
#[command(name = "homestock-gateway", version, about)]
struct Cli {
    /// Path to homestock.toml (defaults to ~/.homestock/homestock.toml).
    #[arg(long, env = "HOMESTOCK_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default)]
enum Command {
    /// Run the HTTP API and the background sweep (default).
    #[default]
    Serve,
    /// Run one decay sweep against the database and exit.
    Sweep,
}

/// One manager per table, each on its own connection to the same file.
struct Stores {
    categories: CategoryManager,
    consumables: Arc<ConsumableManager>,
    tasks: TaskManager,
}

impl Stores {
    fn open(config: &HomestockConfig) -> anyhow::Result<Self> {
        let path = &config.database.path;
        ensure_parent_dir(path);
        info!(path = %path, "opening SQLite database");

        Ok(Self {
            categories: CategoryManager::new(db::open(path)?),
            consumables: Arc::new(ConsumableManager::new(db::open(path)?)),
            tasks: TaskManager::new(db::open(path)?),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = HomestockConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        HomestockConfig::default()
    });

    let stores = Stores::open(&config)?;

    match cli.command.unwrap_or_default() {
        Command::Serve => serve(config, stores).await,
        Command::Sweep => {
            let report = run_sweep(stores.consumables.as_ref(), chrono::Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn serve(config: HomestockConfig, stores: Stores) -> anyhow::Result<()> {
    if config.seed.default_categories {
        let seeded = stores.categories.seed_defaults()?;
        if seeded > 0 {
            info!(count = seeded, "initial categories created");
        }
    }

    let addr: SocketAddr = config.listen_addr().parse()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    if config.sweep.enabled {
        let engine = SweepEngine::new(stores.consumables.clone(), &config.sweep);
        tokio::spawn(engine.run(shutdown_rx));
    } else {
        info!("background sweep disabled");
    }

    let state = Arc::new(app::AppState::new(
        stores.categories,
        stores.consumables,
        stores.tasks,
    ));
    let router = app::build_router(state);

    info!("Homestock gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // signal the sweep engine to stop
    let _ = shutdown_tx.send(true);
    info!("gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
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
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(dir = %parent.display(), error = %e, "could not create database directory");
        }
    }
}
