use anyhow::Result;
use certainty_common::types::DEFAULT_WARNING_DAYS;
use certainty_notify::channels::email::EmailChannel;
use certainty_notify::channels::log::LogChannel;
use certainty_notify::queue::notification_queue;
use certainty_notify::{NotificationChannel, NotificationQueue};
use certainty_server::app;
use certainty_server::config::ServerConfig;
use certainty_server::monitor::classifier::classify;
use certainty_server::monitor::engine::RefreshEngine;
use certainty_server::monitor::inspector::{CertificateInspector, TlsInspector};
use certainty_server::monitor::scheduler::SweepScheduler;
use certainty_server::monitor::service::MonitorService;
use certainty_server::state::AppState;
use certainty_storage::{MonitorStore, SqliteMonitorStore};
use chrono::Utc;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const DISPATCHER_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  certainty-server [config.toml]      Start the server (default config/server.toml)");
    eprintln!("  certainty-server check <domain>     Inspect one domain and print its state");
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install default CryptoProvider: {e:?}"))?;

    certainty_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("certainty=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("check") => {
            let domain = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("Missing domain argument")
            })?;
            run_check(domain).await
        }
        Some("--help") | Some("-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

/// One-off inspection of a single domain; nothing is stored.
async fn run_check(domain: &str) -> Result<()> {
    let inspector = TlsInspector::new(Duration::from_secs(10))?;
    let facts = inspector.inspect(domain.trim()).await;
    let now = Utc::now();

    let state = classify(
        now,
        facts.as_ref().map(|f| f.not_before),
        facts.as_ref().map(|f| f.not_after),
        facts.as_ref().map(|f| f.serial.as_str()),
        DEFAULT_WARNING_DAYS,
    );

    println!("domain:     {domain}");
    println!("state:      {state}");
    if let Some(facts) = facts {
        println!("serial:     {}", facts.serial);
        println!("not_before: {}", facts.not_before.to_rfc3339());
        println!("not_after:  {}", facts.not_after.to_rfc3339());
        println!("days_left:  {}", (facts.not_after - now).num_days());
    }
    Ok(())
}

fn build_channels(config: &ServerConfig) -> Result<Vec<Box<dyn NotificationChannel>>> {
    match &config.smtp {
        Some(smtp) => {
            let channel: Box<dyn NotificationChannel> = Box::new(EmailChannel::new(smtp)?);
            tracing::info!(host = %smtp.host, port = smtp.port, "Email notifications enabled");
            Ok(vec![channel])
        }
        None => {
            tracing::warn!("No [smtp] section configured, notifications will only be logged");
            let channel: Box<dyn NotificationChannel> = Box::new(LogChannel);
            Ok(vec![channel])
        }
    }
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = ServerConfig::load(config_path)?;
    tracing::info!(config = config_path, "Loaded configuration");

    let store: Arc<dyn MonitorStore> =
        Arc::new(SqliteMonitorStore::new(Path::new(&config.data_dir))?);

    let (queue, dispatcher) =
        notification_queue(build_channels(&config)?, config.base_url.clone());
    let queue: Arc<dyn NotificationQueue> = Arc::new(queue);
    let dispatcher_handle = tokio::spawn(dispatcher.run());

    let inspector: Arc<dyn CertificateInspector> = Arc::new(TlsInspector::new(
        Duration::from_secs(config.sweep.connect_timeout_secs),
    )?);
    let engine = Arc::new(RefreshEngine::new(store.clone(), inspector, queue.clone()));
    let service = Arc::new(MonitorService::new(store.clone(), queue));

    let sweep_handle = if config.sweep.enabled {
        let scheduler = SweepScheduler::new(
            engine.clone(),
            store.clone(),
            config.sweep.tick_secs,
            config.sweep.min_recheck_secs,
            config.sweep.max_concurrent,
        );
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Sweep scheduler disabled");
        None
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let state = AppState {
        engine,
        service,
        config: Arc::new(config),
    };
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );

    tracing::info!(http = %http_addr, "Server started");

    if let Err(e) = http_server
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }
    tracing::info!("Shutting down gracefully");

    // The sweep task holds the last queue sender once the router is gone.
    if let Some(h) = sweep_handle {
        h.abort();
        let _ = h.await;
    }
    match tokio::time::timeout(DISPATCHER_DRAIN_TIMEOUT, dispatcher_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Notification dispatcher task failed"),
        Err(_) => tracing::warn!("Pending notifications not delivered before shutdown"),
    }
    tracing::info!("Server stopped");

    Ok(())
}
