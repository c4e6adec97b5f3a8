//! adengine Binary Entry Point
//!
//! Runs one ad engine against a remote feed: loads inventory, renders the
//! configured slots, keeps the rotation/reset/flush timers going, and
//! optionally serves the HTTP bridge for an external renderer.

use std::path::PathBuf;
use std::time::Duration;

use adengine::{
    ChannelRenderer, Engine, EngineService, LogRenderer, RenderEvent,
    config::{AppConfig, parse_duration},
    server,
};
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// adengine - embedded ad rotation engine
#[derive(Parser, Debug)]
#[command(name = "adengine", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, env = "ADENGINE_CONFIG")]
    config: Option<PathBuf>,

    /// Feed URL (overrides config file)
    #[arg(long, env = "ADENGINE_FEED_URL")]
    feed_url: Option<String>,

    /// Feed fetch timeout, e.g. "8s" (overrides config file)
    #[arg(long, env = "ADENGINE_FEED_TIMEOUT", value_parser = parse_duration)]
    feed_timeout: Option<Duration>,

    /// Number of ad slots (overrides config file)
    #[arg(long, env = "ADENGINE_SLOTS")]
    slots: Option<usize>,

    /// Storage path (overrides config file)
    #[arg(long, env = "ADENGINE_STORAGE_PATH")]
    storage_path: Option<PathBuf>,

    /// Serve the HTTP bridge (overrides config file)
    #[arg(long)]
    serve: bool,

    /// Server bind address (overrides config file)
    #[arg(long, env = "ADENGINE_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "ADENGINE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Treat every mounted ad as fully visible (headless demo)
    #[arg(long)]
    auto_visible: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,adengine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            AppConfig::read(path)?
        }
        None => AppConfig::default(),
    };

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(url) = cli.feed_url {
        config.feed.url = url;
    }
    if let Some(timeout) = cli.feed_timeout {
        config.feed.timeout = timeout;
    }
    if let Some(slots) = cli.slots {
        config.engine.slots = slots;
    }
    if let Some(path) = cli.storage_path {
        config.storage.path = Some(path);
    }
    if cli.serve {
        config.server.enabled = true;
    }
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!(
        feed = %config.feed.url,
        slots = config.engine.slots,
        storage = %config.storage.driver,
        sink = %config.sink.kind,
        "Starting adengine"
    );

    let storage = config.storage.builder().build().await;
    let sink = config.sink.build()?;
    let loader = config.feed.loader()?;
    let timers = config.timer_settings()?;

    let builder = Engine::builder()
        .settings(config.engine_settings())
        .storage(storage)
        .sink(sink);
    let engine = if cli.auto_visible {
        let (channel, mounts) = ChannelRenderer::new();
        let engine = builder.renderer((LogRenderer, channel)).build().await;
        tokio::spawn(report_mounts_visible(engine.clone(), mounts));
        engine
    } else {
        builder.renderer(LogRenderer).build().await
    };

    let rotation = engine.load_feed(&loader, &config.feed.url).await;
    engine.render_all().await;

    let service = EngineService::start(engine.clone(), &timers).await?;
    tracing::info!(rotation_secs = rotation, "Engine running, press Ctrl+C to shutdown");

    if config.server.enabled {
        let addr = config.server.socket_addr()?;
        server::serve(engine, addr, shutdown_signal()).await?;
    } else {
        shutdown_signal().await;
    }

    tracing::info!("Shutting down engine...");
    service.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Report every newly mounted placement as fully visible.
async fn report_mounts_visible(engine: Engine, mut mounts: UnboundedReceiver<RenderEvent>) {
    while let Some(event) = mounts.recv().await {
        if let RenderEvent::Mounted(placement) = event {
            engine.report_visibility(placement.id, 1.0).await;
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
