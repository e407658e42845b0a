use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use pulsewatch::db::services::{MemoryStore, MonitorStore, PgStore};
use pulsewatch::notifications::NotificationService;
use pulsewatch::prober::{Probe, Prober};
use pulsewatch::scheduler::Scheduler;
use pulsewatch::server::EngineConfig;
use pulsewatch::server::logging::init_logging;
use pulsewatch::version::VERSION;
use pulsewatch::web::{AppState, create_axum_router};

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn assemble<S>(
    store: Arc<S>,
    config: &EngineConfig,
    http_client: reqwest::Client,
) -> (Scheduler, Arc<AppState>)
where
    S: MonitorStore + 'static,
{
    let prober: Arc<dyn Probe> = Arc::new(Prober::with_http_client(http_client.clone()));
    let notifier = Arc::new(NotificationService::new(
        store.clone(),
        &config.notifications,
        http_client,
    ));
    let scheduler = Scheduler::new(
        store.clone(),
        prober,
        notifier,
        config.scheduler.clone(),
    );
    let app_state = Arc::new(AppState {
        scheduler: scheduler.clone(),
        services: store.clone(),
        results: store.clone(),
        alerts: store,
    });
    (scheduler, app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Logging needs the configured log directory, so configuration comes first.
    let config = match EngineConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };
    let _log_guard = init_logging(&config.log_dir);
    info!("Starting PulseWatch engine, version: {}", VERSION);

    let http_client = reqwest::Client::builder()
        .user_agent(format!("PulseWatch/{VERSION}"))
        .build()?;

    let (scheduler, app_state) = match config.database_url() {
        Some(database_url) => {
            let store = PgStore::connect(database_url, config.database_max_connections).await?;
            store.apply_schema().await?;
            info!("Connected to PostgreSQL.");
            assemble(Arc::new(store), &config, http_client)
        }
        None => {
            warn!(
                "DATABASE_URL is not set; using the in-memory store. History is lost on restart."
            );
            assemble(Arc::new(MemoryStore::new()), &config, http_client)
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "HTTP server listening.");
    axum::serve(listener, create_axum_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if shutdown_tx.send(true).is_err() {
        warn!("Scheduler already stopped.");
    }
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Scheduler task ended abnormally.");
    }
    info!("PulseWatch engine stopped.");
    Ok(())
}
