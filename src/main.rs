//! note-tweet-connector binary entrypoint.
//! Boots the webhook server and the metrics server, wires the shared content
//! tracker, and drains in-flight requests on SIGINT/SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use note_tweet_connector::api::VERSION;
use note_tweet_connector::config::{Credentials, LogFormat, ServerConfig};
use note_tweet_connector::metrics::Metrics;
use note_tweet_connector::tracker::SWEEP_INTERVAL;
use note_tweet_connector::{relay_from_credentials, router, AppState, ContentTracker};

fn init_tracing(cfg: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", cfg.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match cfg.log_format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer().compact()).init(),
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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
    tracing::info!("shutting down servers");
    cancel.cancel();
}

fn log_server_exit(res: Result<std::io::Result<()>, tokio::task::JoinError>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "server error"),
        Err(e) => tracing::error!(error = %e, "server task failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = ServerConfig::load_default()?;
    init_tracing(&cfg);

    let metrics = Metrics::init(VERSION).context("installing Prometheus recorder")?;

    let cancel = CancellationToken::new();
    let tracker = Arc::new(ContentTracker::new(cfg.tracker_ttl()));
    let sweeper = tracker
        .clone()
        .spawn_sweeper(SWEEP_INTERVAL, cancel.child_token());

    let (relay, secrets) = relay_from_credentials(Credentials::from_env(), tracker)
        .context("building outbound HTTP client")?;
    let state = AppState::new(Arc::new(relay), secrets, cfg.request_timeout());
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], cfg.metrics_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("binding {metrics_addr}"))?;

    tracing::info!(
        version = VERSION,
        %addr,
        %metrics_addr,
        tracker_ttl_secs = cfg.tracker_ttl_secs,
        log_level = %cfg.log_level,
        "starting server"
    );

    let metrics_cancel = cancel.clone();
    let metrics_server = tokio::spawn(async move {
        axum::serve(metrics_listener, metrics.router())
            .with_graceful_shutdown(async move { metrics_cancel.cancelled().await })
            .await
    });

    tokio::spawn(shutdown_signal(cancel.clone()));

    let serve_cancel = cancel.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_cancel.cancelled().await });
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        res = &mut server => {
            log_server_exit(res);
            cancel.cancel();
        }
        _ = cancel.cancelled() => {
            // In-flight requests get the grace period; anything slower is abandoned.
            match tokio::time::timeout(cfg.shutdown_timeout(), &mut server).await {
                Ok(res) => log_server_exit(res),
                Err(_) => {
                    tracing::warn!(
                        grace = ?cfg.shutdown_timeout(),
                        "shutdown grace period elapsed, abandoning in-flight requests"
                    );
                    server.abort();
                }
            }
        }
    }
    match tokio::time::timeout(cfg.shutdown_timeout(), metrics_server).await {
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "metrics server error"),
        Ok(Err(e)) => tracing::error!(error = %e, "metrics server task failed"),
        _ => {}
    }
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "tracker sweeper failed");
    }

    tracing::info!("server stopped gracefully");
    Ok(())
}
