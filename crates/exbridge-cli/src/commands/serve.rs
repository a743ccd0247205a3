//! `serve`: watch the exchange file and serve its keys over HTTP

use crate::config::{FileConfig, Overrides, ServeSettings};
use crate::http;
use crate::subscriber::RouteLogSubscriber;
use clap::Args;
use exbridge_core::errors::BridgeError;
use exbridge_core::logging_facility::{self, Profile};
use exbridge_core::{ChangeNotifier, ExchangePoller, IngestPipeline, QueryInterface, SnapshotStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Directory the upstream process writes its exchange file into [default: ./exchange]
    #[arg(long)]
    pub exchange_dir: Option<PathBuf>,

    /// Name of the exchange file [default: ak-eep-out.json]
    #[arg(long)]
    pub file_name: Option<String>,

    /// HTTP port [default: 3000]
    #[arg(long)]
    pub port: Option<u16>,

    /// How often the exchange file is checked [default: 250]
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// TOML config file; flags take precedence over its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long)]
    pub json_logs: bool,
}

pub fn execute(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = ServeSettings::resolve(
        file,
        Overrides {
            exchange_dir: args.exchange_dir,
            file_name: args.file_name,
            poll_interval_ms: args.poll_interval_ms,
            port: args.port,
            json_logs: args.json_logs,
        },
    )?;

    logging_facility::init(if settings.json_logs {
        Profile::Production
    } else {
        Profile::Development
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(settings))
}

async fn run(settings: ServeSettings) -> Result<(), Box<dyn std::error::Error>> {
    if !settings.watch.exchange_dir.is_dir() {
        tracing::warn!(
            exchange_dir = %settings.watch.exchange_dir.display(),
            "exchange directory does not exist yet; waiting for it"
        );
    }

    let notifier = Arc::new(ChangeNotifier::new());
    notifier.subscribe(Arc::new(RouteLogSubscriber));
    let store = Arc::new(SnapshotStore::new(notifier));

    let pipeline = Arc::new(IngestPipeline::new(Arc::clone(&store)));
    let (feed, pipeline_handle) = pipeline.spawn();
    let poller = ExchangePoller::new(settings.watch.clone(), feed).spawn();

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BridgeError::Io {
            path: addr.to_string(),
            message: e.to_string(),
        })?;
    tracing::info!(addr = %addr, "exbridge listening");

    let served = axum::serve(listener, http::router(QueryInterface::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Dropping the poller's feed lets the pipeline drain and stop
    poller.abort();
    let _ = poller.await;
    pipeline_handle.shutdown().await;
    tracing::info!("exbridge stopped");

    if let Err(e) = served {
        return Err(BridgeError::Internal {
            message: format!("HTTP server failed: {}", e),
        }
        .into());
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
