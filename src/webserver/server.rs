/// Axum webserver lifecycle
///
/// Binds the listener, serves the router until `shutdown` is called, and
/// reports bind failures with a readable explanation.
use anyhow::{anyhow, Context};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::{
    arguments::is_privileged_port,
    config::ServerConfig,
    logger::{self, LogTag},
    webserver::{routes, state::AppState, ws::Hub},
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver
///
/// Blocks until `shutdown` is called or the server fails.
pub async fn start_server(hub: Arc<Hub>, config: &ServerConfig) -> anyhow::Result<()> {
    let listener = bind(config).await?;
    let addr = listener.local_addr()?;

    logger::info(
        LogTag::Webserver,
        &format!(
            "Listening on http://{} (websocket: {}, static root: {})",
            addr, config.ws_path, config.static_root
        ),
    );

    let notify = SHUTDOWN_NOTIFY.clone();
    let shutdown_signal = async move {
        notify.notified().await;
        logger::debug(LogTag::Webserver, "Received shutdown signal, stopping webserver");
    };

    serve(listener, AppState::new(hub, config.clone()), shutdown_signal).await?;

    logger::info(LogTag::Webserver, "Webserver stopped");
    Ok(())
}

/// Trigger webserver shutdown
///
/// A call made before the server starts waiting is not lost.
pub fn shutdown() {
    logger::debug(LogTag::Webserver, "Triggering webserver shutdown");
    SHUTDOWN_NOTIFY.notify_one();
}

/// Serve on an already bound listener until `shutdown_signal` resolves
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown_signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_app(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")
}

pub fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state)
}

async fn bind(config: &ServerConfig) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address()))?;

    TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => anyhow!(
            "Failed to bind to {}: Address already in use\n\
             \n\
             Another process (possibly another logcast) is listening on port {}.\n\
             Stop it or pick a different port with --port.",
            addr,
            config.port
        ),
        std::io::ErrorKind::PermissionDenied if is_privileged_port(config.port) => anyhow!(
            "Failed to bind to {}: Permission denied\n\
             \n\
             Port {} requires elevated privileges on this system.\n\
             Consider using a port above 1024 or running with appropriate permissions.",
            addr,
            config.port
        ),
        _ => anyhow!("Failed to bind to {}: {}", addr, e),
    })
}
